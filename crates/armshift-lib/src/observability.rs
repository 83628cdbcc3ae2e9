//! Observability for probing and patching
//!
//! Provides:
//! - Prometheus metrics (probe outcomes and latency, cache hits, rate-limit retries, patch results)
//! - Structured event logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for registry probe latency (in seconds)
const PROBE_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

static GLOBAL_METRICS: OnceLock<MigratorMetricsInner> = OnceLock::new();

struct MigratorMetricsInner {
    probe_results: IntCounterVec,
    probe_latency_seconds: Histogram,
    cache_hits: IntCounter,
    rate_limit_retries: IntCounter,
    patch_results: IntCounterVec,
    patch_attempts: IntCounter,
}

impl MigratorMetricsInner {
    fn new() -> Self {
        Self {
            probe_results: register_int_counter_vec!(
                "armshift_probe_results_total",
                "Workload probes by outcome",
                &["result"]
            )
            .expect("Failed to register probe_results"),

            probe_latency_seconds: register_histogram!(
                "armshift_probe_latency_seconds",
                "Time spent probing the images of one workload",
                PROBE_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register probe_latency_seconds"),

            cache_hits: register_int_counter!(
                "armshift_cache_hits_total",
                "Workload probes answered from the architecture cache"
            )
            .expect("Failed to register cache_hits"),

            rate_limit_retries: register_int_counter!(
                "armshift_rate_limit_retries_total",
                "Workload probes retried after a registry rate limit"
            )
            .expect("Failed to register rate_limit_retries"),

            patch_results: register_int_counter_vec!(
                "armshift_patch_results_total",
                "Workload patches by outcome",
                &["result"]
            )
            .expect("Failed to register patch_results"),

            patch_attempts: register_int_counter!(
                "armshift_patch_attempts_total",
                "Merge patch write attempts against the cluster"
            )
            .expect("Failed to register patch_attempts"),
        }
    }
}

/// Handle to the process-wide metrics; clones share the same series
#[derive(Clone)]
pub struct MigratorMetrics {
    _private: (),
}

impl Default for MigratorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MigratorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MigratorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MigratorMetricsInner {
        GLOBAL_METRICS.get_or_init(MigratorMetricsInner::new)
    }

    /// Count a finished workload probe (`supported`, `unsupported`, `failed`, `abandoned`)
    pub fn inc_probe(&self, result: &str) {
        self.inner()
            .probe_results
            .with_label_values(&[result])
            .inc();
    }

    pub fn observe_probe_latency(&self, duration_secs: f64) {
        self.inner().probe_latency_seconds.observe(duration_secs);
    }

    pub fn inc_cache_hit(&self) {
        self.inner().cache_hits.inc();
    }

    pub fn inc_rate_limit_retry(&self) {
        self.inner().rate_limit_retries.inc();
    }

    /// Count a finished workload patch (`patched`, `unchanged`, `failed`)
    pub fn inc_patch(&self, result: &str) {
        self.inner()
            .patch_results
            .with_label_values(&[result])
            .inc();
    }

    pub fn inc_patch_attempt(&self) {
        self.inner().patch_attempts.inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Structured logger for probe and patch events
///
/// Every event carries the cluster context it was produced against.
#[derive(Debug, Clone)]
pub struct EventLogger {
    context: String,
}

impl EventLogger {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn log_cache_hit(&self, workload: &str, supported: bool) {
        debug!(
            event = "arch_cache_hit",
            context = %self.context,
            workload = %workload,
            supported = supported,
            "Architecture verdict served from cache"
        );
    }

    pub fn log_probe_result(&self, workload: &str, result: &str, images: usize, elapsed_ms: u64) {
        info!(
            event = "workload_probed",
            context = %self.context,
            workload = %workload,
            result = %result,
            images = images,
            elapsed_ms = elapsed_ms,
            "Probed workload images"
        );
    }

    pub fn log_probe_failed(&self, workload: &str, image: &str, error: &str) {
        warn!(
            event = "workload_probe_failed",
            context = %self.context,
            workload = %workload,
            image = %image,
            error = %error,
            "Failed to probe workload image"
        );
    }

    pub fn log_rate_limited(&self, workload: &str, image: &str, delay_ms: u64) {
        warn!(
            event = "registry_rate_limited",
            context = %self.context,
            workload = %workload,
            image = %image,
            delay_ms = delay_ms,
            "Registry rate limited, retrying workload probe"
        );
    }

    pub fn log_probe_abandoned(&self, workload: &str) {
        warn!(
            event = "workload_probe_abandoned",
            context = %self.context,
            workload = %workload,
            "Probe deadline passed, verdict unknown"
        );
    }

    pub fn log_constraint_skipped(&self, workload: &str, directive: &str, reason: &str) {
        info!(
            event = "constraint_skipped",
            context = %self.context,
            workload = %workload,
            directive = %directive,
            reason = %reason,
            "Constraint already in desired state"
        );
    }

    pub fn log_patch_unchanged(&self, workload: &str, directive: &str) {
        info!(
            event = "patch_unchanged",
            context = %self.context,
            workload = %workload,
            directive = %directive,
            "Workload already in desired state, no write"
        );
    }

    pub fn log_patch_retry(&self, workload: &str, attempt: u32, max_attempts: u32, error: &str) {
        warn!(
            event = "patch_retry",
            context = %self.context,
            workload = %workload,
            attempt = attempt,
            max_attempts = max_attempts,
            error = %error,
            "Patch attempt failed"
        );
    }

    pub fn log_patch_applied(&self, workload: &str, directive: &str, attempts: u32) {
        info!(
            event = "patch_applied",
            context = %self.context,
            workload = %workload,
            directive = %directive,
            attempts = attempts,
            "Patched workload"
        );
    }

    pub fn log_patch_failed(&self, workload: &str, directive: &str, error: &str) {
        warn!(
            event = "patch_failed",
            context = %self.context,
            workload = %workload,
            directive = %directive,
            error = %error,
            "Failed to patch workload"
        );
    }

    pub fn log_batch_complete(&self, directive: &str, patched: usize, unchanged: usize, failed: usize) {
        info!(
            event = "batch_complete",
            context = %self.context,
            directive = %directive,
            patched = patched,
            unchanged = unchanged,
            failed = failed,
            "Batch finished"
        );
    }

    pub fn log_priority_unresolved(&self, workload: &str, error: &str) {
        warn!(
            event = "priority_unresolved",
            context = %self.context,
            workload = %workload,
            error = %error,
            "Could not resolve workload priority, using 0"
        );
    }
}
