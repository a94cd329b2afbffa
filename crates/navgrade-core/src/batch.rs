//! Batch grading of many recorded episodes.
//!
//! Episodes run concurrently up to `GraderSettings::concurrency`; each owns
//! its evaluator, so nothing mutable is shared between them. Every `update`
//! is wrapped in the configured timeout. With a [`ResultStore`] attached,
//! finished episodes are persisted and skipped on the next run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::adapters;
use crate::domain::result::FinalResult;
use crate::domain::task::TaskConfig;
use crate::metrics::METRICS;
use crate::obs;
use crate::replay::{replay_episode, ReplaySummary, Trajectory};
use crate::scripts::ScriptRegistry;
use crate::settings::GraderSettings;
use crate::store::ResultStore;

/// One line of a batch manifest. `trajectory` is resolved against the
/// manifest's directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub task_id: String,
    pub task: TaskConfig,
    pub trajectory: PathBuf,
}

/// A task ready to grade.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub task_id: String,
    pub task: TaskConfig,
    pub trajectory: Trajectory,
}

/// Read a JSONL manifest and every trajectory it names.
pub fn load_manifest(path: &Path) -> Result<Vec<BatchItem>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read manifest {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let entry: ManifestEntry = serde_json::from_str(line)
                .with_context(|| format!("manifest {} line {}", path.display(), i + 1))?;
            let trajectory = Trajectory::load(&base.join(&entry.trajectory))?;
            Ok(BatchItem {
                task_id: entry.task_id,
                task: entry.task,
                trajectory,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeReport {
    pub task_id: String,
    pub evaluator: String,
    pub result: FinalResult,
    /// Taken from the store instead of regraded.
    pub resumed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay: Option<ReplaySummary>,
}

/// Score summary for one evaluator type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomainSummary {
    pub count: usize,
    pub mean_score: f64,
    pub crashed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub episodes: Vec<EpisodeReport>,
    pub by_domain: BTreeMap<String, DomainSummary>,
}

impl BatchReport {
    fn new(run_id: Uuid, mut episodes: Vec<EpisodeReport>) -> Self {
        episodes.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        Self {
            run_id,
            by_domain: summarize(&episodes),
            episodes,
        }
    }

    pub fn mean_score(&self) -> f64 {
        if self.episodes.is_empty() {
            return 0.0;
        }
        self.episodes.iter().map(|e| e.result.score()).sum::<f64>() / self.episodes.len() as f64
    }
}

/// Per-evaluator count, mean score and crash count.
pub fn summarize(episodes: &[EpisodeReport]) -> BTreeMap<String, DomainSummary> {
    let mut sums: BTreeMap<String, (DomainSummary, f64)> = BTreeMap::new();
    for episode in episodes {
        let (summary, total) = sums.entry(episode.evaluator.clone()).or_default();
        summary.count += 1;
        *total += episode.result.score();
        if episode.result.is_crashed() {
            summary.crashed += 1;
        }
    }
    sums.into_iter()
        .map(|(domain, (mut summary, total))| {
            summary.mean_score = total / summary.count.max(1) as f64;
            (domain, summary)
        })
        .collect()
}

pub struct BatchRunner {
    settings: GraderSettings,
    scripts: ScriptRegistry,
    store: Option<ResultStore>,
}

impl BatchRunner {
    pub fn new(settings: GraderSettings, scripts: ScriptRegistry) -> Self {
        Self {
            settings,
            scripts,
            store: None,
        }
    }

    /// Persist results under `store` and resume from it.
    pub fn with_store(mut self, store: ResultStore) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn run(&self, items: Vec<BatchItem>) -> BatchReport {
        let run_id = Uuid::new_v4();
        info!(%run_id, episodes = items.len(), concurrency = self.settings.concurrency, "batch started");

        let episodes: Vec<EpisodeReport> = stream::iter(items)
            .map(|item| {
                let span = obs::episode_span(&item.task_id);
                self.grade(item).instrument(span)
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let report = BatchReport::new(run_id, episodes);
        METRICS.flush();
        info!(%run_id, mean_score = report.mean_score(), "batch finished");
        report
    }

    async fn grade(&self, item: BatchItem) -> EpisodeReport {
        let digest = item.task.eval_config.digest();
        self.grade_with_digest(item, digest).await
    }

    async fn grade_with_digest(
        &self,
        item: BatchItem,
        digest: crate::domain::error::Result<String>,
    ) -> EpisodeReport {
        let evaluator_kind = item.task.eval_config.kind().to_string();
        let digest = match digest {
            Ok(digest) => digest,
            Err(err) => {
                // without a digest the result can be neither resumed nor stored
                warn!(task_id = %item.task_id, error = %err, "cannot digest evaluator config");
                return EpisodeReport {
                    task_id: item.task_id,
                    evaluator: evaluator_kind,
                    result: FinalResult::crashed(err.to_string()),
                    resumed: false,
                    replay: None,
                };
            }
        };

        if let Some(store) = &self.store {
            match store.resume(&item.task_id, &digest) {
                Ok(Some(result)) => {
                    return EpisodeReport {
                        task_id: item.task_id,
                        evaluator: evaluator_kind,
                        result,
                        resumed: true,
                        replay: None,
                    };
                }
                Ok(None) => {}
                Err(err) => warn!(task_id = %item.task_id, error = %err, "ignoring stored result"),
            }
        }

        let (result, replay) = match adapters::build(&item.task.eval_config, &self.scripts) {
            Ok(evaluator) => {
                let (result, summary) = replay_episode(
                    evaluator.as_ref(),
                    &item.trajectory,
                    Some(self.settings.update_timeout()),
                )
                .await;
                (result, Some(summary))
            }
            Err(err) => {
                warn!(task_id = %item.task_id, error = %err, "episode aborted");
                (FinalResult::crashed(err.to_string()), None)
            }
        };

        if let Some(store) = &self.store {
            if let Err(err) = store.save(&item.task_id, &digest, &result) {
                warn!(task_id = %item.task_id, error = %format!("{err:#}"), "could not persist result");
            }
        }

        EpisodeReport {
            task_id: item.task_id,
            evaluator: evaluator_kind,
            result,
            resumed: false,
            replay,
        }
    }
}
