//! On-disk results, one directory per task: `<root>/<dir>/result.json`,
//! where `<dir>` is the task id made path-safe plus a short digest of the raw
//! id, so distinct ids never share a file.
//!
//! A stored result is reused on resume only when it was produced for the
//! same goal, i.e. its `goal_digest` equals the digest of the current
//! evaluator config.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::domain::result::{FinalResult, PersistedResult};

const RESULT_FILE: &str = "result.json";

#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn result_path(&self, task_id: &str) -> PathBuf {
        self.root.join(dir_name(task_id)).join(RESULT_FILE)
    }

    /// Write a result, replacing any previous one for `task_id`.
    pub fn save(&self, task_id: &str, goal_digest: &str, result: &FinalResult) -> Result<PathBuf> {
        let path = self.result_path(task_id);
        let dir = path.parent().unwrap_or(self.root.as_path());
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let persisted = PersistedResult::new(task_id, goal_digest, result.clone());
        let content =
            serde_json::to_string_pretty(&persisted).context("serialize persisted result")?;
        // temp file in the same directory, then rename over the old result
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        tmp.write_all(content.as_bytes())
            .with_context(|| format!("write {}", tmp.path().display()))?;
        tmp.persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("rename to {}", path.display()))?;
        debug!(task_id, path = %path.display(), "result saved");
        Ok(path)
    }

    pub fn load(&self, task_id: &str) -> Result<Option<PersistedResult>> {
        let path = self.result_path(task_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw =
            std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let persisted: PersistedResult = serde_json::from_str(&raw)
            .with_context(|| format!("parse stored result {}", path.display()))?;
        if persisted.task_id != task_id {
            warn!(task_id, stored = %persisted.task_id, "stored result belongs to another task");
            return Ok(None);
        }
        Ok(Some(persisted))
    }

    /// Every stored result under the root, ordered by task id.
    pub fn list(&self) -> Result<Vec<PersistedResult>> {
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("read results directory {}", self.root.display()))?;
        let mut out = Vec::new();
        for entry in entries {
            let path = entry?.path().join(RESULT_FILE);
            if !path.is_file() {
                continue;
            }
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            let persisted: PersistedResult = serde_json::from_str(&raw)
                .with_context(|| format!("parse stored result {}", path.display()))?;
            out.push(persisted);
        }
        out.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        Ok(out)
    }

    /// The stored result for `task_id`, if there is one for this exact goal.
    pub fn resume(&self, task_id: &str, goal_digest: &str) -> Result<Option<FinalResult>> {
        match self.load(task_id)? {
            Some(stored) if stored.goal_digest == goal_digest => {
                info!(task_id, "resuming from stored result");
                Ok(Some(stored.result))
            }
            Some(_) => {
                info!(task_id, "stored result is for a different goal; regrading");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// Task ids become directory names; keep them to one path component.
fn sanitize(task_id: &str) -> String {
    task_id
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

/// `sanitize(task_id)` plus the first 12 hex digits of its SHA-256.
fn dir_name(task_id: &str) -> String {
    let digest = hex::encode(Sha256::digest(task_id.as_bytes()));
    let short = &digest[..12];
    match sanitize(task_id) {
        readable if readable.is_empty() => short.to_string(),
        readable => format!("{readable}-{short}"),
    }
}
