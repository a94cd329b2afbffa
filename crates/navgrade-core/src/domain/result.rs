//! Final results, one shape per evaluator, plus the crashed placeholder.
//!
//! Results serialize with a `type` discriminator so a stored result can be
//! read back without knowing which evaluator produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coverage::{InferenceMode, Provenance};
use crate::inference::MultiCandidateQuery;

/// Result of the URL- and payload-equality evaluators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlMatchResult {
    pub score: f64,
    pub reasoning: String,
    pub n_groups: usize,
    pub n_covered: usize,
    pub is_group_covered: Vec<bool>,
    #[serde(default)]
    pub provenance: Vec<Option<Provenance>>,
}

/// How one reservation query was covered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyCoverage {
    pub alternative: usize,
    pub mode: InferenceMode,
    pub reason_code: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResyResult {
    pub score: f64,
    pub n_queries: usize,
    pub n_covered: usize,
    pub is_query_covered: Vec<bool>,
    pub coverage: Vec<Option<ResyCoverage>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTableResult {
    pub score: f64,
    pub n_queries: usize,
    pub n_covered: usize,
    pub queries: Vec<Vec<MultiCandidateQuery>>,
    pub is_query_covered: Vec<bool>,
    #[serde(default)]
    pub provenance: Vec<Option<Provenance>>,
}

/// Placeholder for an episode that could not be graded at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashedResult {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub exception: Option<String>,
}

/// Snapshot returned by `compute()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FinalResult {
    CraigslistUrlMatch(UrlMatchResult),
    ApartmentsUrlMatch(UrlMatchResult),
    GoogleFlightsSearchMatch(UrlMatchResult),
    ResyUrlMatch(ResyResult),
    OpenTableInfoGathering(OpenTableResult),
    Crashed(CrashedResult),
}

impl FinalResult {
    pub fn crashed(exception: impl Into<String>) -> Self {
        FinalResult::Crashed(CrashedResult {
            score: 0.0,
            exception: Some(exception.into()),
        })
    }

    pub fn score(&self) -> f64 {
        match self {
            FinalResult::CraigslistUrlMatch(r)
            | FinalResult::ApartmentsUrlMatch(r)
            | FinalResult::GoogleFlightsSearchMatch(r) => r.score,
            FinalResult::ResyUrlMatch(r) => r.score,
            FinalResult::OpenTableInfoGathering(r) => r.score,
            FinalResult::Crashed(r) => r.score,
        }
    }

    /// The `type` discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            FinalResult::CraigslistUrlMatch(_) => "craigslist_url_match",
            FinalResult::ApartmentsUrlMatch(_) => "apartments_url_match",
            FinalResult::GoogleFlightsSearchMatch(_) => "google_flights_search_match",
            FinalResult::ResyUrlMatch(_) => "resy_url_match",
            FinalResult::OpenTableInfoGathering(_) => "open_table_info_gathering",
            FinalResult::Crashed(_) => "crashed",
        }
    }

    pub fn is_crashed(&self) -> bool {
        matches!(self, FinalResult::Crashed(_))
    }

    /// `(covered, total)` groups, when the result tracks groups.
    pub fn coverage_counts(&self) -> Option<(usize, usize)> {
        match self {
            FinalResult::CraigslistUrlMatch(r)
            | FinalResult::ApartmentsUrlMatch(r)
            | FinalResult::GoogleFlightsSearchMatch(r) => Some((r.n_covered, r.n_groups)),
            FinalResult::ResyUrlMatch(r) => Some((r.n_covered, r.n_queries)),
            FinalResult::OpenTableInfoGathering(r) => Some((r.n_covered, r.n_queries)),
            FinalResult::Crashed(_) => None,
        }
    }
}

/// On-disk form of a result: the result itself plus the task id and the
/// digest of the goal it was graded against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedResult {
    pub task_id: String,
    pub goal_digest: String,
    pub recorded_at: DateTime<Utc>,
    pub result: FinalResult,
}

impl PersistedResult {
    pub fn new(
        task_id: impl Into<String>,
        goal_digest: impl Into<String>,
        result: FinalResult,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            goal_digest: goal_digest.into(),
            recorded_at: Utc::now(),
            result,
        }
    }
}
