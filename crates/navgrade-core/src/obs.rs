//! Structured observability hooks for the grading lifecycle.
//!
//! This module provides:
//! - Episode-scoped tracing spans via [`episode_span`]
//! - Emission functions for key lifecycle events: reset, ingest, coverage,
//!   failed update, computed result
//!
//! Events are emitted at `info!` level except failures (`warn!`).
//! Filtering follows `RUST_LOG`; otherwise [`init_tracing`] keeps grader
//! events at the requested level and everything else at `warn`.

use tracing::{info, warn, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::coverage::InferenceMode;

/// Filter used when `RUST_LOG` is unset: grader crates at `level`,
/// dependencies at `warn`.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    format!("warn,navgrade_core={level},navgrade={level}")
}

/// Install the global subscriber. Only the first call in a process takes
/// effect.
///
/// JSON lines carry the enclosing `navgrade.episode` span, so every event
/// of a batch run can be attributed to its task id.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}

/// Span tagged with the task id, for the whole grading of one episode.
///
/// # Example
///
/// ```ignore
/// use tracing::Instrument;
/// replay_episode(&*evaluator, &trajectory, None)
///     .instrument(episode_span("navi_bench/resy/0"))
///     .await;
/// ```
pub fn episode_span(task_id: &str) -> tracing::Span {
    tracing::info_span!("navgrade.episode", task_id = %task_id)
}

/// Emit event: an evaluator's ledger and coverage were (re)initialised.
pub fn emit_episode_reset(evaluator: &str, groups: usize) {
    info!(event = "episode.reset", evaluator = %evaluator, groups = groups);
}

/// Emit event: a new observation entered the evidence ledger.
pub fn emit_observation_ingested(evaluator: &str, key: &str, ledger_len: usize) {
    info!(
        event = "observation.ingested",
        evaluator = %evaluator,
        key = %key,
        ledger_len = ledger_len,
    );
}

/// Emit event: a requirement group became covered.
pub fn emit_group_covered(group: usize, alternative: usize, mode: InferenceMode, detail: &str) {
    info!(
        event = "group.covered",
        group = group,
        alternative = alternative,
        mode = %mode,
        detail = %detail,
    );
}

/// Emit event: one observation was dropped (e.g. undecodable payload).
pub fn emit_observation_discarded(evaluator: &str, error: &dyn std::fmt::Display) {
    warn!(event = "observation.discarded", evaluator = %evaluator, error = %error);
}

/// Emit event: an update failed and was treated as "no new evidence".
pub fn emit_update_failed(evaluator: &str, url: &str, error: &dyn std::fmt::Display) {
    warn!(event = "update.failed", evaluator = %evaluator, url = %url, error = %error);
}

/// Emit event: a result snapshot was computed.
pub fn emit_result_computed(evaluator: &str, score: f64, covered: usize, total: usize) {
    info!(
        event = "result.computed",
        evaluator = %evaluator,
        score = score,
        covered = covered,
        total = total,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_span_create() {
        let span = episode_span("navi_bench/craigslist/0");
        let _guard = span.enter();
        emit_episode_reset("craigslist_url_match", 2);
    }

    #[test]
    fn test_default_directives_scope_grader_crates() {
        let directives = default_directives(Level::DEBUG);
        assert_eq!(directives, "warn,navgrade_core=debug,navgrade=debug");
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
