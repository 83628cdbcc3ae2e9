//! ARM64 compatibility checks across many workloads
//!
//! The [`ProbeCoordinator`] fans workloads out over a bounded pool of tasks,
//! consults the [`ArchCache`] first and retries registry rate limits with
//! jittered delays.

mod cache;
mod coordinator;


pub use cache::ArchCache;
pub use coordinator::{ProbeCoordinator, ProbeOutcome, ProbeTarget};

use serde::{Deserialize, Serialize};

/// Tuning for the probe fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Workload probes allowed past the admission gate at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Upper bound (exclusive) of the random delay before a rate-limit retry
    #[serde(default = "default_rate_limit_jitter_ms")]
    pub rate_limit_jitter_ms: u64,

    /// Registries reached over plain HTTP
    #[serde(default)]
    pub insecure_registries: Vec<String>,
}

fn default_max_concurrent() -> usize {
    7
}

fn default_rate_limit_jitter_ms() -> u64 {
    800
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            rate_limit_jitter_ms: default_rate_limit_jitter_ms(),
            insecure_registries: Vec::new(),
        }
    }
}
