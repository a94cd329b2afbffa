//! Shared grader for evaluators whose evidence is the URL alone.
//!
//! A [`UrlRule`] turns a URL into a comparison key (canonical string,
//! parameter set, decoded payload). Each distinct URL is keyed once and
//! offered to the uncovered groups in arrival order.

use async_trait::async_trait;
use tracing::debug;

use crate::coverage::{CoverageTracker, InferenceMode, ScoringPolicy};
use crate::domain::error::Result;
use crate::domain::goal::GoalSpecification;
use crate::domain::result::{FinalResult, UrlMatchResult};
use crate::ledger::EvidenceLedger;
use crate::metric::{Grader, StepInputs};
use crate::obs;

/// Domain rule for a URL-only evaluator.
pub trait UrlRule: Send + Sync + 'static {
    type Key: PartialEq + Clone + std::fmt::Debug + Send + Sync + 'static;

    const NAME: &'static str;
    const POLICY: ScoringPolicy;
    /// What a group stands for, in the reasoning text ("required URLs").
    const NOUN: &'static str;

    /// Comparison key of an observed URL; `None` discards the observation.
    fn key(&self, url: &str) -> Option<Self::Key>;

    fn wrap(result: UrlMatchResult) -> FinalResult;
}

/// Ledger of keyed URLs plus per-group coverage.
#[derive(Debug)]
pub struct UrlMatchState<K> {
    pub ledger: EvidenceLedger<K>,
    pub coverage: CoverageTracker,
    /// URLs that produced no key; remembered so they are not retried.
    pub discarded: EvidenceLedger<()>,
}

pub struct UrlGrader<R: UrlRule> {
    rule: R,
    goal: GoalSpecification<R::Key>,
}

impl<R: UrlRule> UrlGrader<R> {
    pub fn new(rule: R, goal: GoalSpecification<R::Key>) -> Self {
        Self { rule, goal }
    }

    pub fn goal(&self) -> &GoalSpecification<R::Key> {
        &self.goal
    }
}

#[async_trait]
impl<R: UrlRule> Grader for UrlGrader<R> {
    type State = UrlMatchState<R::Key>;
    type Evidence = String;

    const NAME: &'static str = R::NAME;

    fn group_count(&self) -> usize {
        self.goal.group_count()
    }

    fn fresh_state(&self) -> Self::State {
        UrlMatchState {
            ledger: EvidenceLedger::new(),
            coverage: CoverageTracker::new(self.goal.group_count()),
            discarded: EvidenceLedger::new(),
        }
    }

    async fn observe(&self, inputs: StepInputs<'_>) -> Result<String> {
        Ok(inputs.url.to_string())
    }

    fn apply(&self, state: &mut Self::State, url: String) -> usize {
        if url.is_empty() || state.ledger.contains(&url) || state.discarded.contains(&url) {
            return 0;
        }
        let Some(key) = self.rule.key(&url) else {
            state.discarded.insert(url, ());
            return 0;
        };
        debug!(evaluator = R::NAME, url = %url, key = ?key, "keyed observation");
        let newly = state
            .coverage
            .offer(&self.goal, &url, InferenceMode::DirectMatch, |alt| *alt == key);
        state.ledger.insert(url.clone(), key);
        obs::emit_observation_ingested(R::NAME, &url, state.ledger.len());
        newly.len()
    }

    fn finalize(&self, state: &mut Self::State) -> FinalResult {
        let coverage = &state.coverage;
        let n_groups = coverage.group_count();
        let n_covered = coverage.covered_count();
        R::wrap(UrlMatchResult {
            score: coverage.score(R::POLICY),
            reasoning: format!("Covered {n_covered} out of {n_groups} {}", R::NOUN),
            n_groups,
            n_covered,
            is_group_covered: coverage.flags(),
            provenance: (0..n_groups)
                .map(|i| coverage.provenance(i).cloned())
                .collect(),
        })
    }
}
