//! Offline replay of recorded trajectories.
//!
//! A trajectory is a JSONL file, one [`RecordedStep`] per line: the URL the
//! agent was on, what each extraction script returned on that page, and the
//! final answer if the agent gave one. Replaying feeds the steps through the
//! same [`MetricContract`] a live run uses, with a [`ScriptedPage`] standing
//! in for the browser.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::domain::result::FinalResult;
use crate::metric::{MetricContract, StepInputs, StepOutcome};
use crate::page::ScriptedPage;

/// One agent step as recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedStep {
    #[serde(default)]
    pub url: String,
    /// Script id → value it returned on this page.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub page_outputs: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl RecordedStep {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_output(mut self, script_id: impl Into<String>, value: Value) -> Self {
        self.page_outputs.insert(script_id.into(), value);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub steps: Vec<RecordedStep>,
}

impl Trajectory {
    pub fn new(steps: Vec<RecordedStep>) -> Self {
        Self { steps }
    }

    /// Parse JSONL. Blank lines are skipped; a malformed line is an error
    /// naming its line number.
    pub fn from_jsonl(raw: &str) -> Result<Self> {
        let steps = raw
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<RecordedStep>(line)
                    .with_context(|| format!("trajectory line {}", i + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read trajectory {}", path.display()))?;
        Self::from_jsonl(&raw).with_context(|| format!("parse trajectory {}", path.display()))
    }

    pub fn to_jsonl(&self) -> Result<String> {
        let mut out = String::new();
        for step in &self.steps {
            out.push_str(&serde_json::to_string(step).context("serialize step")?);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Per-episode replay counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub steps: usize,
    pub applied: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub newly_covered: usize,
}

/// Reset `evaluator`, feed every step, and compute.
///
/// Each `update` is wrapped in `timeout` when one is given; a timed-out step
/// contributes nothing.
#[instrument(skip_all, fields(evaluator = evaluator.name(), steps = trajectory.len()))]
pub async fn replay_episode(
    evaluator: &dyn MetricContract,
    trajectory: &Trajectory,
    timeout: Option<Duration>,
) -> (FinalResult, ReplaySummary) {
    evaluator.reset();
    let mut summary = ReplaySummary::default();

    for (i, step) in trajectory.steps.iter().enumerate() {
        summary.steps += 1;
        let page = ScriptedPage::from_outputs(step.page_outputs.clone());
        let mut inputs = StepInputs::url(&step.url).with_page(&page);
        if let Some(answer) = step.answer.as_deref() {
            inputs = inputs.with_answer(answer);
        }

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, evaluator.update(inputs)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(step = i, url = %step.url, "update timed out");
                    summary.timed_out += 1;
                    continue;
                }
            },
            None => evaluator.update(inputs).await,
        };
        match outcome {
            StepOutcome::Applied { newly_covered } => {
                summary.applied += 1;
                summary.newly_covered += newly_covered;
            }
            StepOutcome::Failed => summary.failed += 1,
            StepOutcome::Superseded => {}
        }
    }

    (evaluator.compute(), summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::craigslist;
    use serde_json::json;

    const GT: &str = "https://sfbay.craigslist.org/search/apa?min_bedrooms=2";

    #[test]
    fn test_jsonl_round_trip_and_blank_lines() {
        let traj = Trajectory::new(vec![
            RecordedStep::url("https://a"),
            RecordedStep::url("https://b").with_output("open_table_info", json!([])),
        ]);
        let raw = traj.to_jsonl().expect("serialize");
        let padded = format!("\n{raw}\n\n");
        assert_eq!(Trajectory::from_jsonl(&padded).expect("parse"), traj);
    }

    #[test]
    fn test_bad_line_is_reported() {
        let err = Trajectory::from_jsonl("{\"url\": \"a\"}\nnot json\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[tokio::test]
    async fn test_replay_counts_and_scores() {
        let ev = craigslist::build(&[vec![GT.to_string()]]).expect("build");
        let traj = Trajectory::new(vec![
            RecordedStep::url(""),
            RecordedStep::url("https://sfbay.craigslist.org/"),
            RecordedStep::url(GT),
            RecordedStep::url(GT),
        ]);
        let (result, summary) = replay_episode(&ev, &traj, None).await;
        assert_eq!(result.score(), 1.0);
        assert_eq!(summary.steps, 4);
        assert_eq!(summary.applied, 4);
        assert_eq!(summary.newly_covered, 1);
    }

    #[tokio::test]
    async fn test_replay_is_deterministic() {
        let ev = craigslist::build(&[vec![GT.to_string()]]).expect("build");
        let traj = Trajectory::new(vec![RecordedStep::url(GT)]);
        let (first, _) = replay_episode(&ev, &traj, None).await;
        let (second, _) = replay_episode(&ev, &traj, None).await;
        assert_eq!(first, second);
    }
}
