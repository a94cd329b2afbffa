//! AND-of-OR coverage bookkeeping.
//!
//! A [`CoverageTracker`] holds one slot per requirement group. A slot starts
//! empty and, once filled with a [`Provenance`], stays filled until the owning
//! evaluator is reset.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::goal::GoalSpecification;
use crate::obs;

/// How a set of group flags turns into a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// `covered / max(groups, 1)`.
    Fractional,
    /// `1.0` iff every group is covered.
    AllOrNothing,
}

impl ScoringPolicy {
    pub fn score(self, covered: usize, total: usize) -> f64 {
        match self {
            ScoringPolicy::Fractional => covered as f64 / total.max(1) as f64,
            ScoringPolicy::AllOrNothing => {
                if total > 0 && covered == total {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// The kind of evidence that covered a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    /// The observation equals the alternative after canonicalization.
    DirectMatch,
    /// Equality on a reduced key set, allowed by a page condition.
    RelaxedMatch,
    /// A page-state outcome (target slot visible, no slots at all).
    ConditionalOutcome,
    /// Both neighbors of an unseen target time were seen visible.
    NeighborInference,
    /// A page message ruled the requested dimensions out.
    Disqualification,
    /// Every combination of the group's dimensions was proven unavailable.
    ExhaustiveClosure,
}

impl InferenceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            InferenceMode::DirectMatch => "direct_match",
            InferenceMode::RelaxedMatch => "relaxed_match",
            InferenceMode::ConditionalOutcome => "conditional_outcome",
            InferenceMode::NeighborInference => "neighbor_inference",
            InferenceMode::Disqualification => "disqualification",
            InferenceMode::ExhaustiveClosure => "exhaustive_closure",
        }
    }
}

impl fmt::Display for InferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a group is covered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Index of the alternative within its group.
    pub alternative: usize,
    /// Raw input (or canonical form) of the observation that produced it.
    pub observation: String,
    pub mode: InferenceMode,
    /// Free-form detail, e.g. a reason code.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl Provenance {
    pub fn new(alternative: usize, observation: impl Into<String>, mode: InferenceMode) -> Self {
        Self {
            alternative,
            observation: observation.into(),
            mode,
            detail: String::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Per-group covered flags with provenance. Monotone.
#[derive(Debug, Clone, Default)]
pub struct CoverageTracker {
    slots: Vec<Option<Provenance>>,
}

impl CoverageTracker {
    pub fn new(group_count: usize) -> Self {
        Self {
            slots: vec![None; group_count],
        }
    }

    pub fn group_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_covered(&self, group: usize) -> bool {
        matches!(self.slots.get(group), Some(Some(_)))
    }

    pub fn covered_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn all_covered(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn flags(&self) -> Vec<bool> {
        self.slots.iter().map(Option::is_some).collect()
    }

    /// Indices of groups that are still uncovered, ascending.
    pub fn uncovered(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn provenance(&self, group: usize) -> Option<&Provenance> {
        self.slots.get(group).and_then(Option::as_ref)
    }

    /// Mark `group` covered. Returns `false` if it was already covered (the
    /// first provenance is kept) or the index is out of range.
    pub fn mark(&mut self, group: usize, provenance: Provenance) -> bool {
        match self.slots.get_mut(group) {
            Some(slot @ None) => {
                obs::emit_group_covered(
                    group,
                    provenance.alternative,
                    provenance.mode,
                    &provenance.detail,
                );
                *slot = Some(provenance);
                true
            }
            _ => false,
        }
    }

    /// Test one observation against every uncovered group, trying
    /// alternatives in declared order. The first matching alternative covers
    /// its group. Returns the newly covered group indices.
    pub fn offer<A, F>(
        &mut self,
        goal: &GoalSpecification<A>,
        observation: &str,
        mode: InferenceMode,
        mut matches: F,
    ) -> Vec<usize>
    where
        F: FnMut(&A) -> bool,
    {
        let mut newly = Vec::new();
        for group in self.uncovered() {
            let Some(req) = goal.group(group) else {
                continue;
            };
            if let Some(alt) = req.alternatives().iter().position(&mut matches) {
                if self.mark(group, Provenance::new(alt, observation, mode)) {
                    newly.push(group);
                }
            }
        }
        newly
    }

    pub fn score(&self, policy: ScoringPolicy) -> f64 {
        policy.score(self.covered_count(), self.group_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal() -> GoalSpecification<&'static str> {
        GoalSpecification::new(vec![vec!["A", "B"], vec!["C"]]).expect("goal")
    }

    #[test]
    fn test_scoring_policies() {
        assert_eq!(ScoringPolicy::Fractional.score(1, 2), 0.5);
        assert_eq!(ScoringPolicy::Fractional.score(0, 0), 0.0);
        assert_eq!(ScoringPolicy::AllOrNothing.score(1, 2), 0.0);
        assert_eq!(ScoringPolicy::AllOrNothing.score(2, 2), 1.0);
        assert_eq!(ScoringPolicy::AllOrNothing.score(0, 0), 0.0);
    }

    #[test]
    fn test_offer_first_match_wins() {
        let goal = GoalSpecification::new(vec![vec!["x", "y"]]).expect("goal");
        let mut tracker = CoverageTracker::new(1);
        let newly = tracker.offer(&goal, "obs-1", InferenceMode::DirectMatch, |_| true);
        assert_eq!(newly, vec![0]);
        assert_eq!(tracker.provenance(0).map(|p| p.alternative), Some(0));
    }

    #[test]
    fn test_offer_skips_covered_groups() {
        let goal = goal();
        let mut tracker = CoverageTracker::new(2);
        tracker.offer(&goal, "b", InferenceMode::DirectMatch, |a| *a == "B");
        let newly = tracker.offer(&goal, "a", InferenceMode::DirectMatch, |a| *a == "A");
        assert!(newly.is_empty());
        // first provenance is kept
        assert_eq!(tracker.provenance(0).map(|p| p.observation.as_str()), Some("b"));
    }

    #[test]
    fn test_and_or_semantics() {
        let goal = goal();
        let mut tracker = CoverageTracker::new(2);
        tracker.offer(&goal, "a", InferenceMode::DirectMatch, |a| *a == "A");
        assert_eq!(tracker.score(ScoringPolicy::Fractional), 0.5);
        assert_eq!(tracker.score(ScoringPolicy::AllOrNothing), 0.0);

        tracker.offer(&goal, "c", InferenceMode::DirectMatch, |a| *a == "C");
        assert!(tracker.all_covered());
        assert_eq!(tracker.flags(), vec![true, true]);
        assert_eq!(tracker.score(ScoringPolicy::AllOrNothing), 1.0);
    }

    #[test]
    fn test_mark_is_monotone() {
        let mut tracker = CoverageTracker::new(1);
        assert!(tracker.mark(0, Provenance::new(0, "u1", InferenceMode::NeighborInference)));
        assert!(!tracker.mark(0, Provenance::new(1, "u2", InferenceMode::DirectMatch)));
        assert!(!tracker.mark(5, Provenance::new(0, "u3", InferenceMode::DirectMatch)));
        assert_eq!(
            tracker.provenance(0).map(|p| p.mode),
            Some(InferenceMode::NeighborInference)
        );
        assert!(tracker.uncovered().is_empty());
    }
}
