//! Availability snapshots read off a restaurant booking page, and the
//! multi-field queries they are matched against.

use std::sync::OnceLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::canonical::time::ClockTime;

/// One acceptable booking: every present field lists acceptable values, an
/// absent field accepts anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiCandidateQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<Vec<ClockTime>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_sizes: Option<Vec<u32>>,
}

fn non_empty<T>(v: &Option<Vec<T>>) -> Option<&[T]> {
    v.as_deref().filter(|s| !s.is_empty())
}

impl MultiCandidateQuery {
    pub fn names(&self) -> Option<&[String]> {
        non_empty(&self.restaurant_names)
    }

    pub fn dates(&self) -> Option<&[NaiveDate]> {
        non_empty(&self.dates)
    }

    pub fn times(&self) -> Option<&[ClockTime]> {
        non_empty(&self.times)
    }

    pub fn party_sizes(&self) -> Option<&[u32]> {
        non_empty(&self.party_sizes)
    }

    /// Case-insensitive membership of `name` in the acceptable names.
    /// `false` when the query names no restaurant.
    pub fn names_restaurant(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.names()
            .is_some_and(|names| names.iter().any(|n| n.to_lowercase() == name))
    }
}

/// One concrete slot: a single value (or wildcard) per dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotQuery<'a> {
    pub restaurant_name: Option<&'a str>,
    pub party_size: Option<u32>,
    pub date: Option<NaiveDate>,
    pub time: Option<ClockTime>,
}

/// What the booking-info script reports for one reservation widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoSnapshot {
    #[serde(default)]
    pub url: String,
    pub restaurant_name: String,
    pub party_size: u32,
    /// Free-text availability message.
    #[serde(default)]
    pub info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<ClockTime>,
    /// Start of an unavailable range (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<ClockTime>,
    /// End of an unavailable range (exclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<ClockTime>,
}

/// How a snapshot's message reads.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotKind {
    /// "No online availability within N hours": closed window around the
    /// snapshot's own date/time. `None` when the snapshot has no date/time.
    NoOnlineAvailability(Option<(NaiveDateTime, NaiveDateTime)>),
    /// "Unavailable" with explicit bounds: half-open `[start, end)`.
    UnavailableRange {
        start_date: NaiveDate,
        start_time: ClockTime,
        end_date: NaiveDate,
        end_time: ClockTime,
    },
    /// "Unavailable"/"unfortunately": negative at the snapshot's date/time only.
    Unavailable,
    /// A structural refusal (booking horizon, party size).
    Disqualifying,
    Available,
}

impl SnapshotKind {
    pub fn is_negative(&self) -> bool {
        !matches!(self, SnapshotKind::Available | SnapshotKind::Disqualifying)
    }
}

/// Result of testing a snapshot against a multi-candidate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotMatch {
    /// The page offers a slot this query accepts.
    Available,
    /// The page proves at least one accepted slot unavailable.
    Negative,
    NoMatch,
}

pub(crate) const HORIZON_MESSAGE: &str = "take online reservations that far in advance";
pub(crate) const PARTY_TOO_SMALL_MESSAGE: &str = "your party is too small";
pub(crate) const PARTY_TOO_LARGE_MESSAGE: &str = "your party is too large";

fn within_hours_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"within ([\d\.]+) hours").ok())
        .as_ref()
}

pub(crate) fn at(date: NaiveDate, time: ClockTime) -> NaiveDateTime {
    date.and_time(
        NaiveTime::from_num_seconds_from_midnight_opt(time.seconds(), 0).unwrap_or(NaiveTime::MIN),
    )
}

impl InfoSnapshot {
    fn message(&self) -> String {
        self.info.to_lowercase()
    }

    pub fn kind(&self) -> SnapshotKind {
        let msg = self.message();
        if [HORIZON_MESSAGE, PARTY_TOO_SMALL_MESSAGE, PARTY_TOO_LARGE_MESSAGE]
            .iter()
            .any(|m| msg.contains(m))
        {
            return SnapshotKind::Disqualifying;
        }
        if msg.contains("no online availability") {
            return SnapshotKind::NoOnlineAvailability(self.window());
        }
        if msg.contains("unavailable") {
            if let (Some(start_date), Some(start_time), Some(end_date), Some(end_time)) =
                (self.start_date, self.start_time, self.end_date, self.end_time)
            {
                return SnapshotKind::UnavailableRange {
                    start_date,
                    start_time,
                    end_date,
                    end_time,
                };
            }
        }
        if msg.contains("unavailable") || msg.contains("unfortunately") {
            return SnapshotKind::Unavailable;
        }
        SnapshotKind::Available
    }

    /// `[t - N h, t + N h]` for "within N hours"; the single instant `t`
    /// when no horizon is stated.
    fn window(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let base = at(self.date?, self.time?);
        let hours = within_hours_re()
            .and_then(|re| re.captures(&self.info))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok());
        match hours {
            Some(h) if h.is_finite() && h >= 0.0 => {
                let span = Duration::milliseconds((h.min(1.0e6) * 3_600_000.0) as i64);
                Some((
                    base.checked_sub_signed(span).unwrap_or(NaiveDateTime::MIN),
                    base.checked_add_signed(span).unwrap_or(NaiveDateTime::MAX),
                ))
            }
            _ => {
                tracing::debug!(info = %self.info, "no availability horizon in message");
                Some((base, base))
            }
        }
    }

    fn in_range(&self, kind: &SnapshotKind, date: NaiveDate, time: ClockTime) -> bool {
        let ts = at(date, time);
        match kind {
            SnapshotKind::NoOnlineAvailability(Some((lo, hi))) => *lo <= ts && ts <= *hi,
            SnapshotKind::UnavailableRange {
                start_date,
                start_time,
                end_date,
                end_time,
            } => at(*start_date, *start_time) <= ts && ts < at(*end_date, *end_time),
            _ => false,
        }
    }

    fn date_in_range(kind: &SnapshotKind, date: NaiveDate) -> bool {
        matches!(kind, SnapshotKind::UnavailableRange { start_date, end_date, .. }
            if *start_date <= date && date < *end_date)
    }

    fn time_in_range(kind: &SnapshotKind, time: ClockTime) -> bool {
        matches!(kind, SnapshotKind::UnavailableRange { start_time, end_time, .. }
            if *start_time <= time && time < *end_time)
    }

    /// Test this snapshot against a multi-candidate query.
    pub fn match_query(&self, query: &MultiCandidateQuery) -> SnapshotMatch {
        if query.names().is_some() && !query.names_restaurant(&self.restaurant_name) {
            return SnapshotMatch::NoMatch;
        }
        if let Some(sizes) = query.party_sizes() {
            if !sizes.contains(&self.party_size) {
                return SnapshotMatch::NoMatch;
            }
        }

        let dates = query.dates();
        let times = query.times();
        let date_ok = || dates.map_or(true, |d| self.date.is_some_and(|x| d.contains(&x)));
        let time_ok = || times.map_or(true, |t| self.time.is_some_and(|x| t.contains(&x)));

        let kind = self.kind();
        let negative = match &kind {
            SnapshotKind::NoOnlineAvailability(_) => match (dates, times) {
                (Some(ds), Some(ts)) => ds
                    .iter()
                    .any(|d| ts.iter().any(|t| self.in_range(&kind, *d, *t))),
                (Some(ds), None) => self.date.is_some_and(|x| ds.contains(&x)),
                (None, Some(ts)) => self.time.is_some_and(|x| ts.contains(&x)),
                (None, None) => false,
            },
            SnapshotKind::UnavailableRange { .. } => match (dates, times) {
                (Some(ds), Some(ts)) => ds
                    .iter()
                    .any(|d| ts.iter().any(|t| self.in_range(&kind, *d, *t))),
                (Some(ds), None) => ds.iter().any(|d| Self::date_in_range(&kind, *d)),
                (None, Some(ts)) => ts.iter().any(|t| Self::time_in_range(&kind, *t)),
                (None, None) => false,
            },
            SnapshotKind::Unavailable => date_ok() && time_ok(),
            SnapshotKind::Disqualifying => return SnapshotMatch::NoMatch,
            SnapshotKind::Available => {
                return if date_ok() && time_ok() {
                    SnapshotMatch::Available
                } else {
                    SnapshotMatch::NoMatch
                };
            }
        };
        if negative {
            SnapshotMatch::Negative
        } else {
            SnapshotMatch::NoMatch
        }
    }

    /// Whether this (negative) snapshot proves one concrete slot unavailable.
    pub fn proves_unavailable(&self, slot: &SlotQuery<'_>) -> bool {
        if let Some(name) = slot.restaurant_name {
            if self.restaurant_name.to_lowercase() != name.to_lowercase() {
                return false;
            }
        }
        if let Some(size) = slot.party_size {
            if self.party_size != size {
                return false;
            }
        }

        let kind = self.kind();
        match &kind {
            SnapshotKind::NoOnlineAvailability(_) => match (slot.date, slot.time) {
                (Some(d), Some(t)) => self.in_range(&kind, d, t),
                (Some(d), None) => self.date == Some(d),
                (None, Some(t)) => self.time == Some(t),
                (None, None) => false,
            },
            SnapshotKind::UnavailableRange { .. } => match (slot.date, slot.time) {
                (Some(d), Some(t)) => self.in_range(&kind, d, t),
                (Some(d), None) => Self::date_in_range(&kind, d),
                (None, Some(t)) => Self::time_in_range(&kind, t),
                (None, None) => false,
            },
            SnapshotKind::Unavailable => {
                slot.date.map_or(true, |d| self.date == Some(d))
                    && slot.time.map_or(true, |t| self.time == Some(t))
            }
            SnapshotKind::Available | SnapshotKind::Disqualifying => false,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_script_output() {
        let snap: InfoSnapshot = serde_json::from_value(json!({
            "url": "https://www.opentable.com/r/chez-tj",
            "restaurantName": "Chez TJ",
            "partySize": 2,
            "info": "Unfortunately, there is currently no availability",
            "date": "2025-06-30",
            "time": "19:00:00"
        }))
        .expect("snapshot");
        assert_eq!(snap.kind(), SnapshotKind::Unavailable);
        assert_eq!(snap.time, Some(t("19:00")));
    }

    #[test]
    fn test_available_direct_match() {
        let snap = snapshot("Chez TJ", 2, "2025-06-30", "19:00:00", "Select a time");
        let q = query(&["chez tj"], &["2025-06-30"], &["19:00:00"], &[2]);
        assert_eq!(snap.match_query(&q), SnapshotMatch::Available);

        let other_day = query(&["chez tj"], &["2025-07-01"], &[], &[]);
        assert_eq!(snap.match_query(&other_day), SnapshotMatch::NoMatch);
    }

    #[test]
    fn test_name_and_party_filters() {
        let snap = snapshot("Chez TJ", 4, "2025-06-30", "19:00:00", "Select a time");
        assert_eq!(
            snap.match_query(&query(&["other"], &[], &[], &[])),
            SnapshotMatch::NoMatch
        );
        assert_eq!(
            snap.match_query(&query(&[], &[], &[], &[2, 3])),
            SnapshotMatch::NoMatch
        );
    }

    #[test]
    fn test_no_online_availability_window() {
        let snap = snapshot(
            "Chez TJ",
            2,
            "2025-06-30",
            "19:00:00",
            "No online availability within 2.5 hours of your request",
        );
        let q = query(&["Chez TJ"], &["2025-06-30"], &["21:30:00"], &[]);
        assert_eq!(snap.match_query(&q), SnapshotMatch::Negative);
        let outside = query(&["Chez TJ"], &["2025-06-30"], &["21:45:00"], &[]);
        assert_eq!(snap.match_query(&outside), SnapshotMatch::NoMatch);
    }

    #[test]
    fn test_unavailable_range_is_half_open() {
        let mut snap = snapshot("Chez TJ", 2, "2025-06-30", "19:00:00", "Unavailable");
        snap.start_date = Some(d("2025-06-30"));
        snap.start_time = Some(t("18:00:00"));
        snap.end_date = Some(d("2025-06-30"));
        snap.end_time = Some(t("20:00:00"));
        assert!(matches!(snap.kind(), SnapshotKind::UnavailableRange { .. }));

        let inside = SlotQuery {
            restaurant_name: Some("chez tj"),
            party_size: Some(2),
            date: Some(d("2025-06-30")),
            time: Some(t("18:00:00")),
        };
        assert!(snap.proves_unavailable(&inside));
        let end = SlotQuery {
            time: Some(t("20:00:00")),
            ..inside.clone()
        };
        assert!(!snap.proves_unavailable(&end));
    }

    #[test]
    fn test_disqualifying_message_is_not_availability() {
        let snap = snapshot(
            "Chez TJ",
            2,
            "2025-09-01",
            "19:00:00",
            "We don't take online reservations that far in advance",
        );
        assert_eq!(snap.kind(), SnapshotKind::Disqualifying);
        assert_eq!(
            snap.match_query(&query(&["chez tj"], &["2025-09-01"], &[], &[])),
            SnapshotMatch::NoMatch
        );
    }
}
