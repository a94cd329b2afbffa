//! Task configuration and the closed set of evaluator configurations.

use serde::{Deserialize, Serialize};

use crate::domain::digest::compute_digest;
use crate::domain::error::Result;
use crate::inference::MultiCandidateQuery;
use crate::payload::FlightInfoSpec;

fn default_location() -> String {
    "San Francisco, CA, United States".to_string()
}

fn default_timezone() -> String {
    "America/Los_Angeles".to_string()
}

/// Who the agent acts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Unix seconds at which relative dates in the task were resolved.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Default for UserMetadata {
    fn default() -> Self {
        Self {
            location: default_location(),
            timezone: default_timezone(),
            timestamp: None,
        }
    }
}

/// One URL or a list of URLs, all equally acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Evaluator selection, resolved when the task is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "evaluator", rename_all = "snake_case")]
pub enum EvaluatorConfig {
    /// Query-parameter-set equality; groups × alternatives of URLs.
    CraigslistUrlMatch { gt_urls: Vec<Vec<String>> },
    /// Canonical URL equality; a single group.
    ApartmentsUrlMatch { gt_url: OneOrMany },
    /// Decoded search equality; every entry is its own group.
    GoogleFlightsSearchMatch { gt_info: Vec<FlightInfoSpec> },
    /// Venue URLs with conditional time resolution.
    ResyUrlMatch { queries: Vec<Vec<String>> },
    /// Availability information gathering.
    OpenTableInfoGathering {
        queries: Vec<Vec<MultiCandidateQuery>>,
    },
}

impl EvaluatorConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            EvaluatorConfig::CraigslistUrlMatch { .. } => "craigslist_url_match",
            EvaluatorConfig::ApartmentsUrlMatch { .. } => "apartments_url_match",
            EvaluatorConfig::GoogleFlightsSearchMatch { .. } => "google_flights_search_match",
            EvaluatorConfig::ResyUrlMatch { .. } => "resy_url_match",
            EvaluatorConfig::OpenTableInfoGathering { .. } => "open_table_info_gathering",
        }
    }

    /// SHA-256 of the canonical JSON form; identifies the goal for resume.
    pub fn digest(&self) -> Result<String> {
        compute_digest(self)
    }
}

/// Everything needed to start one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Natural-language instruction given to the agent.
    pub task: String,
    /// Start page.
    pub url: String,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    pub eval_config: EvaluatorConfig,
}
