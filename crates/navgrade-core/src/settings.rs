//! Runtime settings, loadable from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) is valid.
//! The CLI layers its flags on top of whatever is loaded here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_concurrency() -> usize {
    20
}

fn default_update_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraderSettings {
    /// Upper bound on episodes graded at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Caller-side timeout around each `update`.
    #[serde(default = "default_update_timeout_ms")]
    pub update_timeout_ms: u64,
    /// Directory whose `<id>.js` files replace the embedded extraction scripts.
    #[serde(default)]
    pub scripts_dir: Option<PathBuf>,
    #[serde(default)]
    pub log_json: bool,
}

impl Default for GraderSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            update_timeout_ms: default_update_timeout_ms(),
            scripts_dir: None,
            log_json: false,
        }
    }
}

impl GraderSettings {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings: Self = toml::from_str(raw).context("parse grader settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read settings {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("load settings {}", path.display()))
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn update_timeout(&self) -> Duration {
        Duration::from_millis(self.update_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.update_timeout_ms == 0 {
            anyhow::bail!("update_timeout_ms must be positive");
        }
        Ok(())
    }
}
