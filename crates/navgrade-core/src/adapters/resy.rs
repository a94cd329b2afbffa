//! Reservation-venue navigation.
//!
//! A query is covered when the agent lands on the exact venue/date/party/time
//! URL, when the venue shows no online availability for the requested date,
//! or when the time can be resolved from the availability list the page
//! exposes (the slot itself, or its visible neighbours).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::canonical::resy::{canonicalize, url_time, ResyMatchKeys, DOMAIN};
use crate::canonical::time::ClockTime;
use crate::canonical::{parse_query, raw_query};
use crate::coverage::{CoverageTracker, InferenceMode, Provenance, ScoringPolicy};
use crate::domain::error::{GradeError, Result};
use crate::domain::goal::GoalSpecification;
use crate::domain::result::{FinalResult, ResyCoverage, ResyResult};
use crate::inference::neighbor::{evaluate, parse_slots};
use crate::inference::{AvailabilitySlot, SlotHistory};
use crate::metric::{Evaluator, Grader, StepInputs};
use crate::obs;
use crate::page::PageHandle;
use crate::scripts::{Script, ScriptRegistry, RESY_AVAILABILITY, RESY_NO_AVAILABILITY};

pub const NAME: &str = "resy_url_match";

/// One acceptable venue URL, pre-canonicalized under every key set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResyTarget {
    pub url: String,
    strict: String,
    relaxed: String,
    base: String,
    time: Option<ClockTime>,
}

impl ResyTarget {
    pub fn parse(url: &str) -> Result<Self> {
        let strict = canonicalize(url, ResyMatchKeys::Strict);
        if strict.is_empty() {
            return Err(GradeError::config("empty ground-truth URL"));
        }
        if !strict.contains(DOMAIN) {
            return Err(GradeError::config(format!("not a {DOMAIN} URL: {url}")));
        }
        Ok(Self {
            url: url.to_string(),
            strict,
            relaxed: canonicalize(url, ResyMatchKeys::Relaxed),
            base: canonicalize(url, ResyMatchKeys::WithoutTime),
            time: url_time(url),
        })
    }

    pub fn time(&self) -> Option<ClockTime> {
        self.time
    }
}

/// What one step showed.
#[derive(Debug, Clone, Default)]
pub struct ResyEvidence {
    pub url: String,
    /// The page announced no online availability for the date.
    pub no_availability: bool,
    /// Slot list; `None` when it could not be read.
    pub slots: Option<Vec<AvailabilitySlot>>,
}

#[derive(Debug, Default)]
pub struct ResyState {
    pub steps: usize,
    pub coverage: CoverageTracker,
    pub details: Vec<Option<ResyCoverage>>,
    /// Slot history per venue/date/party, across the whole episode.
    pub histories: BTreeMap<String, SlotHistory>,
}

/// How an alternative was resolved.
struct Hit {
    mode: InferenceMode,
    reason_code: String,
    detail: String,
}

pub struct ResyGrader {
    goal: GoalSpecification<ResyTarget>,
    no_availability: Script,
    availability: Script,
}

impl ResyGrader {
    pub fn new(goal: GoalSpecification<ResyTarget>, scripts: &ScriptRegistry) -> Result<Self> {
        Ok(Self {
            goal,
            no_availability: scripts.script(RESY_NO_AVAILABILITY)?.clone(),
            availability: scripts.script(RESY_AVAILABILITY)?.clone(),
        })
    }

    async fn read_no_availability(&self, page: &dyn PageHandle, url: &str) -> bool {
        match page.evaluate(&self.no_availability).await {
            Ok(Value::Bool(b)) => b,
            Ok(other) => {
                debug!(url = %url, value = %other, "non-boolean availability banner result");
                false
            }
            Err(err) => {
                warn!(url = %url, error = %err, "could not read availability banner");
                false
            }
        }
    }

    async fn read_slots(&self, page: &dyn PageHandle, url: &str) -> Option<Vec<AvailabilitySlot>> {
        match page.evaluate(&self.availability).await {
            Ok(value) => parse_slots(&value),
            Err(err) => {
                warn!(url = %url, error = %err, "could not read availability slots");
                None
            }
        }
    }

    fn cover(state: &mut ResyState, group: usize, alternative: usize, url: &str, hit: Hit) -> bool {
        let provenance =
            Provenance::new(alternative, url, hit.mode).with_detail(hit.reason_code.clone());
        if !state.coverage.mark(group, provenance) {
            return false;
        }
        if let Some(slot) = state.details.get_mut(group) {
            *slot = Some(ResyCoverage {
                alternative,
                mode: hit.mode,
                reason_code: hit.reason_code,
                detail: hit.detail,
            });
        }
        true
    }
}

#[async_trait]
impl Grader for ResyGrader {
    type State = ResyState;
    type Evidence = ResyEvidence;

    const NAME: &'static str = NAME;

    fn group_count(&self) -> usize {
        self.goal.group_count()
    }

    fn fresh_state(&self) -> ResyState {
        ResyState {
            coverage: CoverageTracker::new(self.goal.group_count()),
            steps: 0,
            details: vec![None; self.goal.group_count()],
            histories: BTreeMap::new(),
        }
    }

    async fn observe(&self, inputs: StepInputs<'_>) -> Result<ResyEvidence> {
        let mut evidence = ResyEvidence {
            url: inputs.url.to_string(),
            ..ResyEvidence::default()
        };
        let on_venue = inputs.url.contains(DOMAIN) && inputs.url.contains("/venues/");
        if let (true, Some(page)) = (on_venue, inputs.page) {
            evidence.no_availability = self.read_no_availability(page, inputs.url).await;
            evidence.slots = self.read_slots(page, inputs.url).await;
        }
        Ok(evidence)
    }

    fn apply(&self, state: &mut ResyState, evidence: ResyEvidence) -> usize {
        let url = evidence.url.as_str();
        if url.is_empty() {
            return 0;
        }
        let strict = canonicalize(url, ResyMatchKeys::Strict);
        let relaxed = canonicalize(url, ResyMatchKeys::Relaxed);
        let base = canonicalize(url, ResyMatchKeys::WithoutTime);
        state.steps += 1;
        obs::emit_observation_ingested(NAME, &strict, state.steps);

        if let Some(slots) = &evidence.slots {
            state.histories.entry(base.clone()).or_default().record(slots);
        }
        let empty = SlotHistory::default();
        let history = state.histories.get(&base).unwrap_or(&empty).clone();
        let in_url = url_time(url);
        // conditional checks need the party size pinned down by the URL
        let seats_known = parse_query(raw_query(url)).contains_key("seats");

        let mut newly = 0;
        for group in state.coverage.uncovered() {
            let Some(req) = self.goal.group(group) else {
                continue;
            };
            for (j, alt) in req.alternatives().iter().enumerate() {
                let hit = if alt.strict == strict {
                    Some(Hit {
                        mode: InferenceMode::DirectMatch,
                        reason_code: "strict_url_match".to_string(),
                        detail: format!("visited {}", alt.strict),
                    })
                } else if evidence.no_availability && alt.relaxed == relaxed {
                    Some(Hit {
                        mode: InferenceMode::RelaxedMatch,
                        reason_code: "relaxed_url_match".to_string(),
                        detail: format!("no online availability on {relaxed}"),
                    })
                } else if seats_known && alt.base == base {
                    let condition =
                        evaluate(alt.time, in_url, evidence.slots.as_deref(), &history);
                    debug!(group, alternative = j, condition = %condition.code(), "conditional check");
                    condition
                        .mode()
                        .filter(|_| condition.is_success())
                        .map(|mode| Hit {
                            mode,
                            reason_code: condition.code(),
                            detail: condition.describe(),
                        })
                } else {
                    None
                };
                if let Some(hit) = hit {
                    if Self::cover(state, group, j, url, hit) {
                        newly += 1;
                    }
                    break;
                }
            }
        }
        newly
    }

    fn finalize(&self, state: &mut ResyState) -> FinalResult {
        let n_queries = state.coverage.group_count();
        FinalResult::ResyUrlMatch(ResyResult {
            score: state.coverage.score(ScoringPolicy::AllOrNothing),
            n_queries,
            n_covered: state.coverage.covered_count(),
            is_query_covered: state.coverage.flags(),
            coverage: state.details.clone(),
        })
    }
}

pub type ResyUrlMatch = Evaluator<ResyGrader>;

pub fn build(queries: &[Vec<String>], scripts: &ScriptRegistry) -> Result<ResyUrlMatch> {
    let goal = GoalSpecification::try_from_raw(queries.to_vec(), |url| ResyTarget::parse(&url))?;
    Ok(Evaluator::new(ResyGrader::new(goal, scripts)?))
}
