//! Live-page capability.
//!
//! Evaluators never talk to a browser directly; they receive something that
//! can run an extraction script and hand back JSON. [`ScriptedPage`] is the
//! in-memory implementation used for offline replay and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::error::PageError;
use crate::scripts::Script;

/// Runs a script against the current page state.
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn evaluate(&self, script: &Script) -> Result<Value, PageError>;
}

/// Page double answering from a fixed table keyed by script id.
#[derive(Debug, Default)]
pub struct ScriptedPage {
    outputs: HashMap<String, Result<Value, PageError>>,
    calls: AtomicUsize,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `script_id` with `value`.
    pub fn with_output(mut self, script_id: impl Into<String>, value: Value) -> Self {
        self.outputs.insert(script_id.into(), Ok(value));
        self
    }

    /// Fail `script_id` with `error`.
    pub fn with_failure(mut self, script_id: impl Into<String>, error: PageError) -> Self {
        self.outputs.insert(script_id.into(), Err(error));
        self
    }

    /// Build from recorded outputs.
    pub fn from_outputs(outputs: HashMap<String, Value>) -> Self {
        Self {
            outputs: outputs.into_iter().map(|(k, v)| (k, Ok(v))).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `evaluate` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PageHandle for ScriptedPage {
    async fn evaluate(&self, script: &Script) -> Result<Value, PageError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match self.outputs.get(script.id()) {
            Some(out) => out.clone(),
            None => Err(PageError::NoRecording(script.id().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripts::{ScriptRegistry, RESY_AVAILABILITY, RESY_NO_AVAILABILITY};
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_page_answers_by_id() {
        let registry = ScriptRegistry::embedded();
        let page = ScriptedPage::new()
            .with_output(RESY_NO_AVAILABILITY, json!(true))
            .with_failure(RESY_AVAILABILITY, PageError::Closed);

        let no_avail = registry.script(RESY_NO_AVAILABILITY).expect("script");
        let avail = registry.script(RESY_AVAILABILITY).expect("script");
        assert_eq!(page.evaluate(no_avail).await, Ok(json!(true)));
        assert_eq!(page.evaluate(avail).await, Err(PageError::Closed));
        assert_eq!(page.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_recording() {
        let registry = ScriptRegistry::embedded();
        let page = ScriptedPage::new();
        let script = registry.script(RESY_AVAILABILITY).expect("script");
        assert!(matches!(
            page.evaluate(script).await,
            Err(PageError::NoRecording(_))
        ));
    }
}
