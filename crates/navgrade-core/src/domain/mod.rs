//! Domain models for NavGrade.
//!
//! Canonical definitions for the core entities:
//! - `GoalSpecification`: immutable AND-of-OR requirement groups
//! - `TaskConfig` / `EvaluatorConfig`: what an episode is graded against
//! - `FinalResult`: the per-evaluator result snapshot
//! - `GradeError`: the error taxonomy

pub mod digest;
pub mod error;
pub mod goal;
pub mod result;
pub mod task;

// Re-export main types and errors
pub use error::{DecodeError, GradeError, PageError, Result};
pub use goal::{GoalSpecification, RequirementGroup};
pub use result::{
    CrashedResult, FinalResult, OpenTableResult, PersistedResult, ResyCoverage, ResyResult,
    UrlMatchResult,
};
pub use task::{EvaluatorConfig, OneOrMany, TaskConfig, UserMetadata};
