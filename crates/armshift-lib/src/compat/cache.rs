//! Per-run memoization of workload architecture verdicts

use dashmap::DashMap;

/// Concurrency-safe map from workload cache key to ARM64 verdict
///
/// Readers never block each other; a writer locks only the shard it
/// inserts into. Entries are never invalidated, so one cache should live
/// for a single probing session.
#[derive(Debug, Default)]
pub struct ArchCache {
    entries: DashMap<String, bool>,
}

impl ArchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &str) -> Option<bool> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    /// Last writer wins
    pub fn store(&self, key: impl Into<String>, supported: bool) {
        self.entries.insert(key.into(), supported);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
