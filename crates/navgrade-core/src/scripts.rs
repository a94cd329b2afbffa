//! Page extraction scripts.
//!
//! Scripts are compiled into the binary and may be replaced, once at start-up,
//! by files named `<id>.js` in an override directory. After that the registry
//! is read-only and shared by every evaluator.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::domain::error::{GradeError, Result};

/// Returns `true` when the venue page says the day has no online availability.
pub const RESY_NO_AVAILABILITY: &str = "resy_no_availability";
/// Returns `[{time_24, is_visible}]` for every listed slot.
pub const RESY_AVAILABILITY: &str = "resy_availability";
/// Returns one snapshot per reservation widget on a booking page.
pub const OPEN_TABLE_INFO: &str = "open_table_info";

const EMBEDDED: &[(&str, &str)] = &[
    (
        RESY_NO_AVAILABILITY,
        include_str!("../scripts/resy_no_availability.js"),
    ),
    (
        RESY_AVAILABILITY,
        include_str!("../scripts/resy_availability.js"),
    ),
    (OPEN_TABLE_INFO, include_str!("../scripts/open_table_info.js")),
];

/// A named script. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    id: Arc<str>,
    source: Arc<str>,
}

impl Script {
    pub fn new(id: &str, source: &str) -> Self {
        Self {
            id: Arc::from(id),
            source: Arc::from(source),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone)]
pub struct ScriptRegistry {
    scripts: BTreeMap<String, Script>,
}

impl ScriptRegistry {
    /// The scripts shipped with the crate.
    pub fn embedded() -> Self {
        Self {
            scripts: EMBEDDED
                .iter()
                .map(|(id, src)| (id.to_string(), Script::new(id, src)))
                .collect(),
        }
    }

    /// Embedded scripts, each replaced by `<dir>/<id>.js` when that file exists.
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(GradeError::config(format!(
                "scripts directory does not exist: {}",
                dir.display()
            )));
        }
        let mut registry = Self::embedded();
        for (id, script) in registry.scripts.iter_mut() {
            let path = dir.join(format!("{id}.js"));
            if path.is_file() {
                let source = std::fs::read_to_string(&path)?;
                info!(script = %id, path = %path.display(), "loaded script override");
                *script = Script::new(id, &source);
            }
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Script> {
        self.scripts.get(id)
    }

    /// Like [`ScriptRegistry::get`], but a missing script is a configuration error.
    pub fn script(&self, id: &str) -> Result<&Script> {
        self.get(id)
            .ok_or_else(|| GradeError::config(format!("unknown extraction script: {id}")))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }
}

static GLOBAL: OnceLock<ScriptRegistry> = OnceLock::new();

/// Initialise the process-wide registry. Only the first call has any effect;
/// later calls return the registry already installed.
pub fn init_global(overrides: Option<&Path>) -> Result<&'static ScriptRegistry> {
    if let Some(existing) = GLOBAL.get() {
        return Ok(existing);
    }
    let registry = match overrides {
        Some(dir) => ScriptRegistry::with_overrides(dir)?,
        None => ScriptRegistry::embedded(),
    };
    Ok(GLOBAL.get_or_init(|| registry))
}
