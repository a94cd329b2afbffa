//! Evidence ledger: every distinct observation seen in an episode.
//!
//! Entries are keyed by the raw input that produced them (usually the URL),
//! so the same input is never processed twice. The ledger only grows; entries
//! are dropped only by an explicit episode reset.

use std::collections::HashMap;

/// Insertion-ordered, append-only map from raw input to observation.
#[derive(Debug, Clone)]
pub struct EvidenceLedger<O> {
    entries: Vec<(String, O)>,
    index: HashMap<String, usize>,
}

impl<O> Default for EvidenceLedger<O> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<O> EvidenceLedger<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation. Returns `false` (and keeps the existing entry)
    /// when `raw` was already recorded.
    pub fn insert(&mut self, raw: impl Into<String>, observation: O) -> bool {
        let raw = raw.into();
        if self.index.contains_key(&raw) {
            return false;
        }
        self.index.insert(raw.clone(), self.entries.len());
        self.entries.push((raw, observation));
        true
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.index.contains_key(raw)
    }

    pub fn get(&self, raw: &str) -> Option<&O> {
        self.index.get(raw).map(|&i| &self.entries[i].1)
    }

    /// Entries in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &O)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
