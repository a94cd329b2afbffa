//! NavGrade Core Library
//!
//! Incremental grading of web-agent trajectories against declarative
//! AND-of-OR goals. Evaluators ingest one agent step at a time through
//! [`MetricContract`] and produce a reproducible [`FinalResult`].

pub mod adapters;
pub mod batch;
pub mod canonical;
pub mod coverage;
pub mod domain;
pub mod inference;
pub mod ledger;
pub mod metric;
pub mod metrics;
pub mod obs;
pub mod page;
pub mod payload;
pub mod replay;
pub mod scripts;
pub mod settings;
pub mod store;

pub use domain::{
    CrashedResult, DecodeError, EvaluatorConfig, FinalResult, GoalSpecification, GradeError,
    OneOrMany, OpenTableResult, PageError, PersistedResult, RequirementGroup, Result,
    ResyCoverage, ResyResult, TaskConfig, UrlMatchResult, UserMetadata,
};

pub use adapters::build as build_evaluator;
pub use batch::{load_manifest, BatchItem, BatchReport, BatchRunner, DomainSummary, EpisodeReport};
pub use coverage::{CoverageTracker, InferenceMode, Provenance, ScoringPolicy};
pub use ledger::EvidenceLedger;
pub use metric::{Evaluator, Grader, MetricContract, Phase, StepInputs, StepOutcome};
pub use page::{PageHandle, ScriptedPage};
pub use payload::{decode_search_url, FlightInfoSpec, FlightQuery};
pub use replay::{replay_episode, RecordedStep, ReplaySummary, Trajectory};
pub use scripts::{Script, ScriptRegistry};
pub use settings::GraderSettings;
pub use store::ResultStore;

pub use metrics::METRICS;
pub use obs::{
    emit_episode_reset, emit_group_covered, emit_observation_discarded,
    emit_observation_ingested, emit_result_computed, emit_update_failed, episode_span,
    init_tracing,
};

/// NavGrade version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
