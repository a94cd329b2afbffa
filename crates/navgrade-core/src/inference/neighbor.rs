//! Neighbor-time inference over availability slots.
//!
//! A venue page lists bookable times as a row of buttons, only some of which
//! are scrolled into view. When the requested time is not bookable at all it
//! never appears; the agent has still checked it if it looked at the times on
//! both sides of the gap. [`SlotHistory`] collects every time seen over the
//! episode, and [`evaluate`] decides whether the requested time is resolved.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::canonical::time::ClockTime;
use crate::coverage::InferenceMode;

/// One bookable time listed on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilitySlot {
    pub time: ClockTime,
    /// Whether the slot was inside the viewport.
    pub visible: bool,
}

/// Parse the availability script output: a list of
/// `{time_24, is_visible}` objects. Entries with an unreadable time are
/// skipped. Returns `None` when the output is not a list at all.
pub fn parse_slots(value: &Value) -> Option<Vec<AvailabilitySlot>> {
    let entries = value.as_array()?;
    let mut slots: Vec<AvailabilitySlot> = entries
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let time = ClockTime::from_json(obj.get("time_24")?)?;
            let visible = obj.get("is_visible").map(truthy).unwrap_or(false);
            Some(AvailabilitySlot { time, visible })
        })
        .collect();
    slots.sort_by_key(|s| s.time);
    Some(slots)
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

/// Every time observed for one venue, date and party size across the episode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotHistory {
    observed: BTreeSet<ClockTime>,
    seen_visible: BTreeSet<ClockTime>,
}

impl SlotHistory {
    pub fn record(&mut self, slots: &[AvailabilitySlot]) {
        for slot in slots {
            self.observed.insert(slot.time);
            if slot.visible {
                self.seen_visible.insert(slot.time);
            }
        }
    }

    pub fn has_observed(&self, time: ClockTime) -> bool {
        self.observed.contains(&time)
    }

    pub fn seen_visible(&self, time: ClockTime) -> bool {
        self.seen_visible.contains(&time)
    }

    /// Nearest observed times strictly before and after `target`.
    pub fn neighbors(&self, target: ClockTime) -> (Option<ClockTime>, Option<ClockTime>) {
        let prev = self.observed.range(..target).next_back().copied();
        let next = self
            .observed
            .range(target..)
            .find(|t| **t != target)
            .copied();
        (prev, next)
    }
}

/// Outcome of one conditional check, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    GtTimeInUrl,
    GtTimeVisible,
    NeighborTimesSeen,
    BoundaryPreviousSeenViaNext,
    BoundaryNextSeenViaPrev,
    GtTimeOutsideAvailableRange,
    NoAvailableSlots,
    GtTimeMissing,
    GtTimeAvailableNotSeen,
    NoSlotsButWrongTime,
    NeighborsNotSeen(Vec<ClockTime>),
    BoundaryPreviousNotSeen(ClockTime),
    BoundaryNextNotSeen(ClockTime),
    /// The availability script failed; nothing is known this step.
    ExtractionFailed,
}

impl Condition {
    pub fn is_success(&self) -> bool {
        self.mode().is_some()
    }

    /// Inference mode for successful outcomes.
    pub fn mode(&self) -> Option<InferenceMode> {
        match self {
            Self::GtTimeInUrl | Self::GtTimeVisible | Self::NoAvailableSlots => {
                Some(InferenceMode::ConditionalOutcome)
            }
            Self::NeighborTimesSeen
            | Self::BoundaryPreviousSeenViaNext
            | Self::BoundaryNextSeenViaPrev
            | Self::GtTimeOutsideAvailableRange => Some(InferenceMode::NeighborInference),
            _ => None,
        }
    }

    /// Stable reason code.
    pub fn code(&self) -> String {
        let join = |ts: &[ClockTime]| {
            ts.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        match self {
            Self::GtTimeInUrl => "gt_time_in_url".into(),
            Self::GtTimeVisible => "gt_time_visible".into(),
            Self::NeighborTimesSeen => "neighbor_times_seen".into(),
            Self::BoundaryPreviousSeenViaNext => "boundary_previous_seen_via_next".into(),
            Self::BoundaryNextSeenViaPrev => "boundary_next_seen_via_prev".into(),
            Self::GtTimeOutsideAvailableRange => "gt_time_outside_available_range".into(),
            Self::NoAvailableSlots => "no_available_slots".into(),
            Self::GtTimeMissing => "gt_time_missing".into(),
            Self::GtTimeAvailableNotSeen => "gt_time_available_not_seen".into(),
            Self::NoSlotsButWrongTime => "no_slots_but_wrong_time".into(),
            Self::NeighborsNotSeen(ts) => format!("neighbors_not_seen:{}", join(ts)),
            Self::BoundaryPreviousNotSeen(t) => format!("boundary_previous_not_seen:{t}"),
            Self::BoundaryNextNotSeen(t) => format!("boundary_next_not_seen:{t}"),
            Self::ExtractionFailed => "availability_extraction_failed".into(),
        }
    }

    /// Human-readable description.
    pub fn describe(&self) -> String {
        match self {
            Self::GtTimeInUrl => "available slot matched by URL parameter".into(),
            Self::GtTimeVisible => "available slot visible on page".into(),
            Self::NeighborTimesSeen => {
                "unavailable slot inferred from visible neighboring times".into()
            }
            Self::BoundaryPreviousSeenViaNext => {
                "unavailable slot inferred before earliest visible availability".into()
            }
            Self::BoundaryNextSeenViaPrev => {
                "unavailable slot inferred after latest visible availability".into()
            }
            Self::GtTimeOutsideAvailableRange => {
                "unavailable slot outside listed availability range".into()
            }
            Self::NoAvailableSlots => {
                "unavailable slot inferred because page lists no availability".into()
            }
            Self::GtTimeMissing => "ground-truth time missing from configuration".into(),
            Self::GtTimeAvailableNotSeen => "available slot exists but was not observed".into(),
            Self::NoSlotsButWrongTime => {
                "URL time does not match ground truth and no availability data to verify".into()
            }
            Self::NeighborsNotSeen(ts) => format!(
                "unavailable slot needs adjacent times to be visible (missing neighbors: {})",
                ts.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            Self::BoundaryPreviousNotSeen(t) => format!(
                "unavailable slot earlier than visible range requires earliest time to be visible (missing: {t})"
            ),
            Self::BoundaryNextNotSeen(t) => format!(
                "unavailable slot later than visible range requires latest time to be visible (missing: {t})"
            ),
            Self::ExtractionFailed => "availability could not be read from the page".into(),
        }
    }
}

/// Decide whether the requested time `target` is resolved.
///
/// `current` is this step's slot list (`None` when extraction failed);
/// `history` must already include it.
pub fn evaluate(
    target: Option<ClockTime>,
    url_time: Option<ClockTime>,
    current: Option<&[AvailabilitySlot]>,
    history: &SlotHistory,
) -> Condition {
    let Some(target) = target else {
        return Condition::GtTimeMissing;
    };
    let Some(current) = current else {
        return Condition::ExtractionFailed;
    };

    if current.is_empty() {
        return match url_time {
            Some(t) if t != target => Condition::NoSlotsButWrongTime,
            _ => Condition::NoAvailableSlots,
        };
    }

    if history.has_observed(target) {
        if url_time == Some(target) {
            return Condition::GtTimeInUrl;
        }
        if history.seen_visible(target) {
            return Condition::GtTimeVisible;
        }
        return Condition::GtTimeAvailableNotSeen;
    }

    match history.neighbors(target) {
        (None, None) => Condition::GtTimeOutsideAvailableRange,
        (None, Some(next)) if history.seen_visible(next) => Condition::BoundaryPreviousSeenViaNext,
        (None, Some(next)) => Condition::BoundaryPreviousNotSeen(next),
        (Some(prev), None) if history.seen_visible(prev) => Condition::BoundaryNextSeenViaPrev,
        (Some(prev), None) => Condition::BoundaryNextNotSeen(prev),
        (Some(prev), Some(next)) => {
            let unseen: Vec<ClockTime> = [prev, next]
                .into_iter()
                .filter(|t| !history.seen_visible(*t))
                .collect();
            if unseen.is_empty() {
                Condition::NeighborTimesSeen
            } else {
                Condition::NeighborsNotSeen(unseen)
            }
        }
    }
}
