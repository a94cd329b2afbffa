//! The evaluator state machine.
//!
//! ```text
//! CREATED ──reset()──▶ READY ──update()──▶ ACCUMULATING
//!                        ▲                      │
//!                        └────────reset()───────┘
//! ```
//!
//! [`MetricContract`] is the object-safe surface every evaluator exposes.
//! Domain logic lives in a [`Grader`]; [`Evaluator`] wraps any grader with
//! the shared guarantees:
//!
//! - updates are serialized per instance;
//! - an update first gathers all of its evidence (possibly slow page I/O)
//!   and only then applies it in one synchronous step, so a cancelled or
//!   timed-out update leaves the state untouched;
//! - a failed update is logged and counted, never propagated.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::error::Result;
use crate::domain::result::FinalResult;
use crate::metrics::METRICS;
use crate::obs;
use crate::page::PageHandle;

/// Everything one agent step offers as evidence.
#[derive(Clone, Copy)]
pub struct StepInputs<'a> {
    /// Current page URL; may be empty.
    pub url: &'a str,
    /// Live page, for evaluators that read page state.
    pub page: Option<&'a dyn PageHandle>,
    /// The agent's final free-text answer, if it gave one this step.
    ///
    /// Replay forwards it from the recorded trajectory. The built-in URL and
    /// page adapters grade navigation only and ignore it; it exists for
    /// graders that judge the answer text.
    pub answer: Option<&'a str>,
}

impl<'a> StepInputs<'a> {
    pub fn url(url: &'a str) -> Self {
        Self {
            url,
            page: None,
            answer: None,
        }
    }

    pub fn with_page(mut self, page: &'a dyn PageHandle) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_answer(mut self, answer: &'a str) -> Self {
        self.answer = Some(answer);
        self
    }
}

impl std::fmt::Debug for StepInputs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepInputs")
            .field("url", &self.url)
            .field("page", &self.page.is_some())
            .field("answer", &self.answer)
            .finish()
    }
}

/// Lifecycle phase of an evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Ready,
    Accumulating,
}

/// What one `update` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Evidence was applied; `newly_covered` groups became covered.
    Applied { newly_covered: usize },
    /// A reset happened while evidence was being gathered; it was dropped.
    Superseded,
    /// Observation failed; treated as "no new evidence".
    Failed,
}

/// Object-safe evaluator surface.
#[async_trait]
pub trait MetricContract: Send + Sync {
    /// Evaluator type name, as used in the `type` tag of its results.
    fn name(&self) -> &'static str;

    fn phase(&self) -> Phase;

    /// Drop all evidence and coverage. Idempotent.
    fn reset(&self);

    /// Ingest one step. Never fails; see [`StepOutcome`].
    async fn update(&self, inputs: StepInputs<'_>) -> StepOutcome;

    /// Current result. Safe to call repeatedly.
    fn compute(&self) -> FinalResult;
}

/// Domain logic behind an [`Evaluator`].
///
/// `observe` may do I/O but cannot see the state; `apply` sees the state but
/// cannot do I/O. This split is what makes an update all-or-nothing.
#[async_trait]
pub trait Grader: Send + Sync + 'static {
    type State: Send + 'static;
    type Evidence: Send + 'static;

    const NAME: &'static str;

    fn group_count(&self) -> usize;

    /// Empty state with every per-group slot pre-populated.
    fn fresh_state(&self) -> Self::State;

    /// Gather this step's evidence.
    async fn observe(&self, inputs: StepInputs<'_>) -> Result<Self::Evidence>;

    /// Fold evidence into the state. Returns the number of newly covered groups.
    fn apply(&self, state: &mut Self::State, evidence: Self::Evidence) -> usize;

    /// Build the result. May promote coverage (compute-time closure) but must
    /// be idempotent.
    fn finalize(&self, state: &mut Self::State) -> FinalResult;
}

struct Slot<S> {
    phase: Phase,
    epoch: u64,
    state: S,
}

/// A [`Grader`] wrapped in the shared state machine.
pub struct Evaluator<G: Grader> {
    grader: G,
    gate: tokio::sync::Mutex<()>,
    slot: Mutex<Slot<G::State>>,
}

impl<G: Grader> Evaluator<G> {
    pub fn new(grader: G) -> Self {
        let state = grader.fresh_state();
        Self {
            grader,
            gate: tokio::sync::Mutex::new(()),
            slot: Mutex::new(Slot {
                phase: Phase::Created,
                epoch: 0,
                state,
            }),
        }
    }

    pub fn grader(&self) -> &G {
        &self.grader
    }

    // State transitions never leave a half-applied state behind, so a
    // poisoned lock still holds a consistent value.
    fn lock(&self) -> MutexGuard<'_, Slot<G::State>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the current state (read-only).
    pub fn inspect<R>(&self, f: impl FnOnce(&G::State) -> R) -> R {
        f(&self.lock().state)
    }
}

#[async_trait]
impl<G: Grader> MetricContract for Evaluator<G> {
    fn name(&self) -> &'static str {
        G::NAME
    }

    fn phase(&self) -> Phase {
        self.lock().phase
    }

    fn reset(&self) {
        let fresh = self.grader.fresh_state();
        let mut slot = self.lock();
        slot.state = fresh;
        slot.epoch += 1;
        slot.phase = Phase::Ready;
        drop(slot);
        obs::emit_episode_reset(G::NAME, self.grader.group_count());
    }

    async fn update(&self, inputs: StepInputs<'_>) -> StepOutcome {
        let _turn = self.gate.lock().await;
        let epoch = self.lock().epoch;

        let evidence = match self.grader.observe(inputs).await {
            Ok(evidence) => evidence,
            Err(err) => {
                METRICS.inc_updates_failed();
                obs::emit_update_failed(G::NAME, inputs.url, &err);
                return StepOutcome::Failed;
            }
        };

        let mut slot = self.lock();
        if slot.epoch != epoch {
            return StepOutcome::Superseded;
        }
        let newly_covered = self.grader.apply(&mut slot.state, evidence);
        slot.phase = Phase::Accumulating;
        METRICS.inc_updates_applied();
        StepOutcome::Applied { newly_covered }
    }

    fn compute(&self) -> FinalResult {
        let result = self.grader.finalize(&mut self.lock().state);
        let (covered, total) = result.coverage_counts().unwrap_or((0, 0));
        obs::emit_result_computed(G::NAME, result.score(), covered, total);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::GradeError;
    use crate::domain::result::UrlMatchResult;
    use std::time::Duration;

    /// Covers group 0 when it sees "hit" (as url or answer); fails on "boom";
    /// "slow" takes a while.
    struct Toy;

    #[async_trait]
    impl Grader for Toy {
        type State = Vec<String>;
        type Evidence = String;
        const NAME: &'static str = "toy";

        fn group_count(&self) -> usize {
            1
        }

        fn fresh_state(&self) -> Self::State {
            Vec::new()
        }

        async fn observe(&self, inputs: StepInputs<'_>) -> Result<String> {
            if inputs.url == "boom" {
                return Err(GradeError::config("boom"));
            }
            if inputs.url == "slow" {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(inputs.answer.unwrap_or(inputs.url).to_string())
        }

        fn apply(&self, state: &mut Self::State, evidence: String) -> usize {
            let was = state.iter().any(|s| s == "hit");
            state.push(evidence);
            usize::from(!was && state.iter().any(|s| s == "hit"))
        }

        fn finalize(&self, state: &mut Self::State) -> FinalResult {
            let hit = state.iter().any(|s| s == "hit");
            FinalResult::CraigslistUrlMatch(UrlMatchResult {
                score: if hit { 1.0 } else { 0.0 },
                reasoning: String::new(),
                n_groups: 1,
                n_covered: usize::from(hit),
                is_group_covered: vec![hit],
                provenance: vec![None],
            })
        }
    }

    #[tokio::test]
    async fn test_answer_reaches_the_grader() {
        let ev = Evaluator::new(Toy);
        ev.reset();
        ev.update(StepInputs::url("https://example.com/")).await;
        assert_eq!(ev.compute().score(), 0.0);
        let outcome = ev
            .update(StepInputs::url("https://example.com/").with_answer("hit"))
            .await;
        assert_eq!(outcome, StepOutcome::Applied { newly_covered: 1 });
        assert_eq!(ev.compute().score(), 1.0);
    }

    #[tokio::test]
    async fn test_phases() {
        let ev = Evaluator::new(Toy);
        assert_eq!(ev.phase(), Phase::Created);
        ev.reset();
        assert_eq!(ev.phase(), Phase::Ready);
        ev.update(StepInputs::url("a")).await;
        assert_eq!(ev.phase(), Phase::Accumulating);
        ev.reset();
        assert_eq!(ev.phase(), Phase::Ready);
        assert_eq!(ev.inspect(|s| s.len()), 0);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_state() {
        let ev = Evaluator::new(Toy);
        ev.reset();
        assert_eq!(
            ev.update(StepInputs::url("hit")).await,
            StepOutcome::Applied { newly_covered: 1 }
        );
        assert_eq!(ev.update(StepInputs::url("boom")).await, StepOutcome::Failed);
        assert_eq!(ev.compute().score(), 1.0);
    }

    #[tokio::test]
    async fn test_compute_is_idempotent() {
        let ev = Evaluator::new(Toy);
        ev.reset();
        ev.update(StepInputs::url("hit")).await;
        assert_eq!(ev.compute(), ev.compute());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_update_leaves_state_unchanged() {
        let ev = Evaluator::new(Toy);
        ev.reset();
        ev.update(StepInputs::url("a")).await;
        let timed_out =
            tokio::time::timeout(Duration::from_secs(1), ev.update(StepInputs::url("slow"))).await;
        assert!(timed_out.is_err());
        assert_eq!(ev.inspect(|s| s.clone()), vec!["a".to_string()]);
        // the gate is released after cancellation
        ev.update(StepInputs::url("hit")).await;
        assert_eq!(ev.compute().score(), 1.0);
    }
}
