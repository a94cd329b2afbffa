//! Restaurant availability info-gathering.
//!
//! Each step the page is asked for the availability snapshots it currently
//! shows. A query is covered by an available slot that matches it, by a page
//! disclosure that rules it out entirely, or (at compute time) by negative
//! snapshots that together cover every slot it asks about.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::coverage::{CoverageTracker, InferenceMode, Provenance, ScoringPolicy};
use crate::domain::digest::canonical_json;
use crate::domain::error::{GradeError, Result};
use crate::domain::goal::GoalSpecification;
use crate::domain::result::{FinalResult, OpenTableResult};
use crate::inference::exhaustive::is_exhausted;
use crate::inference::{Disqualification, InfoSnapshot, MultiCandidateQuery, SnapshotMatch};
use crate::ledger::EvidenceLedger;
use crate::metric::{Evaluator, Grader, StepInputs};
use crate::metrics::METRICS;
use crate::obs;
use crate::scripts::{Script, ScriptRegistry, OPEN_TABLE_INFO};

pub const NAME: &str = "open_table_info_gathering";

#[derive(Debug, Default)]
pub struct OpenTableState {
    /// Snapshots keyed by their canonical JSON.
    pub ledger: EvidenceLedger<InfoSnapshot>,
    pub coverage: CoverageTracker,
}

pub struct OpenTableGrader {
    goal: GoalSpecification<MultiCandidateQuery>,
    info: Script,
}

impl OpenTableGrader {
    pub fn new(
        goal: GoalSpecification<MultiCandidateQuery>,
        scripts: &ScriptRegistry,
    ) -> Result<Self> {
        Ok(Self {
            goal,
            info: scripts.script(OPEN_TABLE_INFO)?.clone(),
        })
    }

    fn parse_snapshots(value: Value) -> Vec<(String, InfoSnapshot)> {
        let items = match value {
            Value::Array(items) => items,
            Value::Null => return Vec::new(),
            other => {
                METRICS.inc_observations_discarded();
                obs::emit_observation_discarded(NAME, &format!("expected a list, got {other}"));
                return Vec::new();
            }
        };
        items
            .into_iter()
            .filter_map(|item| {
                let key = canonical_json(&item).ok()?;
                match serde_json::from_value::<InfoSnapshot>(item) {
                    Ok(snapshot) => Some((key, snapshot)),
                    Err(err) => {
                        METRICS.inc_observations_discarded();
                        obs::emit_observation_discarded(NAME, &err);
                        None
                    }
                }
            })
            .collect()
    }

    fn apply_disqualification(
        &self,
        coverage: &mut CoverageTracker,
        disqualification: &Disqualification,
        observation: &str,
    ) -> usize {
        let mut newly = 0;
        for group in coverage.uncovered() {
            let Some(req) = self.goal.group(group) else {
                continue;
            };
            if let Some(alt) = req
                .alternatives()
                .iter()
                .position(|q| disqualification.rules_out(q))
            {
                let provenance =
                    Provenance::new(alt, observation, InferenceMode::Disqualification)
                        .with_detail(disqualification.code());
                if coverage.mark(group, provenance) {
                    newly += 1;
                }
            }
        }
        newly
    }
}

#[async_trait]
impl Grader for OpenTableGrader {
    type State = OpenTableState;
    type Evidence = Vec<(String, InfoSnapshot)>;

    const NAME: &'static str = NAME;

    fn group_count(&self) -> usize {
        self.goal.group_count()
    }

    fn fresh_state(&self) -> OpenTableState {
        OpenTableState {
            ledger: EvidenceLedger::new(),
            coverage: CoverageTracker::new(self.goal.group_count()),
        }
    }

    async fn observe(&self, inputs: StepInputs<'_>) -> Result<Self::Evidence> {
        let Some(page) = inputs.page else {
            return Ok(Vec::new());
        };
        let value = page
            .evaluate(&self.info)
            .await
            .map_err(GradeError::TransientObservation)?;
        Ok(Self::parse_snapshots(value))
    }

    fn apply(&self, state: &mut OpenTableState, evidence: Self::Evidence) -> usize {
        let mut newly = 0;
        for (key, snapshot) in evidence {
            if state.ledger.contains(&key) {
                continue;
            }
            debug!(restaurant = %snapshot.restaurant_name, info = %snapshot.info, "snapshot");

            for disqualification in Disqualification::from_snapshot(&snapshot) {
                newly += self.apply_disqualification(
                    &mut state.coverage,
                    &disqualification,
                    &snapshot.url,
                );
            }
            newly += state
                .coverage
                .offer(&self.goal, &snapshot.url, InferenceMode::DirectMatch, |q| {
                    snapshot.match_query(q) == SnapshotMatch::Available
                })
                .len();

            state.ledger.insert(key, snapshot);
            obs::emit_observation_ingested(NAME, "snapshot", state.ledger.len());
        }
        newly
    }

    fn finalize(&self, state: &mut OpenTableState) -> FinalResult {
        let negatives: Vec<&InfoSnapshot> = state
            .ledger
            .iter()
            .map(|(_, s)| s)
            .filter(|s| s.kind().is_negative())
            .collect();

        // a group closes only when every one of its alternatives is exhausted
        let mut promoted = Vec::new();
        for group in state.coverage.uncovered() {
            let Some(req) = self.goal.group(group) else {
                continue;
            };
            if req
                .alternatives()
                .iter()
                .all(|q| is_exhausted(q, negatives.iter().copied()))
            {
                promoted.push(group);
            }
        }
        let evidence_count = negatives.len();
        for group in promoted {
            let provenance = Provenance::new(0, "ledger", InferenceMode::ExhaustiveClosure)
                .with_detail(format!("{evidence_count} negative snapshots"));
            if state.coverage.mark(group, provenance) {
                METRICS.inc_closures_promoted();
                info!(group, "query exhausted by negative evidence");
            }
        }

        let coverage = &state.coverage;
        let n_queries = coverage.group_count();
        FinalResult::OpenTableInfoGathering(OpenTableResult {
            score: coverage.score(ScoringPolicy::Fractional),
            n_queries,
            n_covered: coverage.covered_count(),
            queries: self
                .goal
                .groups()
                .iter()
                .map(|g| g.alternatives().to_vec())
                .collect(),
            is_query_covered: coverage.flags(),
            provenance: (0..n_queries)
                .map(|i| coverage.provenance(i).cloned())
                .collect(),
        })
    }
}

pub type OpenTableInfoGathering = Evaluator<OpenTableGrader>;

pub fn build(
    queries: &[Vec<MultiCandidateQuery>],
    scripts: &ScriptRegistry,
) -> Result<OpenTableInfoGathering> {
    let goal = GoalSpecification::try_from_raw(queries.to_vec(), |q| {
        if q.names().is_none()
            && q.dates().is_none()
            && q.times().is_none()
            && q.party_sizes().is_none()
        {
            return Err(GradeError::config("query constrains nothing"));
        }
        Ok(q)
    })?;
    Ok(Evaluator::new(OpenTableGrader::new(goal, scripts)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::PageError;
    use crate::inference::snapshot::fixtures::query;
    use crate::metric::{MetricContract, StepOutcome};
    use crate::page::ScriptedPage;
    use serde_json::json;

    fn snap(name: &str, party: u32, date: &str, time: &str, info: &str) -> Value {
        json!({
            "url": format!("https://www.opentable.com/r/{}", name.to_lowercase()),
            "restaurantName": name,
            "partySize": party,
            "date": date,
            "time": time,
            "info": info,
        })
    }

    fn page(snapshots: Vec<Value>) -> ScriptedPage {
        ScriptedPage::new().with_output(OPEN_TABLE_INFO, Value::Array(snapshots))
    }

    fn evaluator(groups: Vec<Vec<MultiCandidateQuery>>) -> OpenTableInfoGathering {
        build(&groups, &ScriptRegistry::embedded()).expect("build")
    }

    #[tokio::test]
    async fn test_available_slot_covers() {
        let ev = evaluator(vec![vec![query(&["Lilia"], &["2025-07-01"], &["19:00"], &[2])]]);
        ev.reset();
        let p = page(vec![snap("Lilia", 2, "2025-07-01", "19:00", "Available")]);
        ev.update(StepInputs::url("https://www.opentable.com/r/lilia").with_page(&p))
            .await;
        assert_eq!(ev.compute().score(), 1.0);
    }

    #[tokio::test]
    async fn test_exhaustive_closure_only_at_compute() {
        let ev = evaluator(vec![vec![query(
            &["Lilia"],
            &["2025-07-01", "2025-07-02"],
            &["18:00", "19:00"],
            &[],
        )]]);
        ev.reset();
        let mut snapshots = Vec::new();
        for d in ["2025-07-01", "2025-07-02"] {
            for t in ["18:00", "19:00"] {
                snapshots.push(snap("Lilia", 2, d, t, "No online availability"));
            }
        }
        let p = page(snapshots);
        let outcome = ev
            .update(StepInputs::url("https://www.opentable.com/r/lilia").with_page(&p))
            .await;
        assert_eq!(outcome, StepOutcome::Applied { newly_covered: 0 });
        assert!(!ev.inspect(|s| s.coverage.is_covered(0)));

        let result = ev.compute();
        assert_eq!(result.score(), 1.0);
        let FinalResult::OpenTableInfoGathering(r) = result else {
            panic!("wrong result type");
        };
        let prov = r.provenance[0].as_ref().expect("provenance");
        assert_eq!(prov.mode, InferenceMode::ExhaustiveClosure);
        assert_eq!(ev.compute().score(), 1.0);
    }

    #[tokio::test]
    async fn test_partial_negatives_do_not_close() {
        let ev = evaluator(vec![vec![query(
            &["Lilia"],
            &["2025-07-01", "2025-07-02"],
            &["18:00"],
            &[],
        )]]);
        ev.reset();
        let p = page(vec![snap(
            "Lilia",
            2,
            "2025-07-01",
            "18:00",
            "No online availability",
        )]);
        ev.update(StepInputs::url("https://www.opentable.com/r/lilia").with_page(&p))
            .await;
        assert_eq!(ev.compute().score(), 0.0);
    }

    #[tokio::test]
    async fn test_disqualification_covers_other_alternatives() {
        let ev = evaluator(vec![
            vec![query(&["Lilia"], &["2025-09-01"], &[], &[])],
            vec![query(&["Lilia"], &["2025-07-01"], &["19:00"], &[2])],
        ]);
        ev.reset();
        let p = page(vec![snap(
            "Lilia",
            2,
            "2025-08-15",
            "19:00",
            "Lilia doesn't take online reservations that far in advance",
        )]);
        ev.update(StepInputs::url("https://www.opentable.com/r/lilia").with_page(&p))
            .await;
        let flags = ev.inspect(|s| s.coverage.flags());
        assert_eq!(flags, vec![true, false]);
        let prov = ev.inspect(|s| s.coverage.provenance(0).cloned()).expect("prov");
        assert_eq!(prov.mode, InferenceMode::Disqualification);
        assert_eq!(prov.detail, "booking_horizon_exceeded");
    }

    #[tokio::test]
    async fn test_bad_entries_discarded_and_duplicates_ignored() {
        let ev = evaluator(vec![vec![query(&["Lilia"], &[], &[], &[])]]);
        ev.reset();
        let good = snap("Carbone", 2, "2025-07-01", "19:00", "Unavailable");
        let p = page(vec![good.clone(), json!({"restaurantName": 7}), good]);
        ev.update(StepInputs::url("https://www.opentable.com/r/carbone").with_page(&p))
            .await;
        assert_eq!(ev.inspect(|s| s.ledger.len()), 1);
    }

    #[tokio::test]
    async fn test_page_failure_is_a_failed_step() {
        let ev = evaluator(vec![vec![query(&["Lilia"], &[], &[], &[])]]);
        ev.reset();
        let p = ScriptedPage::new().with_failure(OPEN_TABLE_INFO, PageError::Closed);
        let outcome = ev.update(StepInputs::url("https://x").with_page(&p)).await;
        assert_eq!(outcome, StepOutcome::Failed);
        assert_eq!(ev.compute().score(), 0.0);
    }

    #[test]
    fn test_unconstrained_query_rejected() {
        let groups = vec![vec![MultiCandidateQuery::default()]];
        assert!(build(&groups, &ScriptRegistry::embedded()).is_err());
    }
}
