//! Bounded fan-out of workload probes

use super::{ArchCache, CoordinatorConfig};
use crate::error::ProbeError;
use crate::models::{Workload, WorkloadKey};
use crate::observability::{EventLogger, MigratorMetrics};
use crate::registry::ImageProbe;
use futures::future::join_all;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout_at;

/// What to probe for one workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub key: WorkloadKey,
    pub images: Vec<String>,
}

impl From<&Workload> for ProbeTarget {
    fn from(workload: &Workload) -> Self {
        Self {
            key: workload.key.clone(),
            images: workload.images.clone(),
        }
    }
}

/// Verdict for one workload
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    Supported,
    Unsupported,
    /// An image failed to probe; the verdict is unknown
    Failed(ProbeError),
    /// Still running when the deadline passed; the verdict is unknown
    Abandoned,
}

impl ProbeOutcome {
    fn from_verdict(supported: bool) -> Self {
        if supported {
            ProbeOutcome::Supported
        } else {
            ProbeOutcome::Unsupported
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Supported => "supported",
            ProbeOutcome::Unsupported => "unsupported",
            ProbeOutcome::Failed(_) => "failed",
            ProbeOutcome::Abandoned => "abandoned",
        }
    }

    /// `None` when the probe did not produce a verdict
    pub fn verdict(&self) -> Option<bool> {
        match self {
            ProbeOutcome::Supported => Some(true),
            ProbeOutcome::Unsupported => Some(false),
            ProbeOutcome::Failed(_) | ProbeOutcome::Abandoned => None,
        }
    }
}

struct Shared {
    probe: Arc<dyn ImageProbe>,
    cache: Arc<ArchCache>,
    gate: Arc<Semaphore>,
    jitter_ms: u64,
    metrics: MigratorMetrics,
    logger: EventLogger,
}

/// Fans workload probes out over at most `max_concurrent` tasks
pub struct ProbeCoordinator {
    shared: Arc<Shared>,
}

impl ProbeCoordinator {
    pub fn new(
        probe: Arc<dyn ImageProbe>,
        cache: Arc<ArchCache>,
        config: &CoordinatorConfig,
        logger: EventLogger,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                probe,
                cache,
                gate: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
                jitter_ms: config.rate_limit_jitter_ms,
                metrics: MigratorMetrics::new(),
                logger,
            }),
        }
    }

    pub fn cache(&self) -> &Arc<ArchCache> {
        &self.shared.cache
    }

    /// Probe every target; outcomes line up with `targets`
    pub async fn probe_all(&self, targets: Vec<ProbeTarget>) -> Vec<ProbeOutcome> {
        self.probe_all_until(targets, None).await
    }

    /// Like [`probe_all`](Self::probe_all), abandoning probes still running after `deadline`
    pub async fn probe_all_until(
        &self,
        targets: Vec<ProbeTarget>,
        deadline: Option<Duration>,
    ) -> Vec<ProbeOutcome> {
        let deadline = deadline.map(|d| tokio::time::Instant::now() + d);

        let handles: Vec<_> = targets
            .into_iter()
            .map(|target| {
                let shared = self.shared.clone();
                let label = target.key.to_string();
                let handle = tokio::spawn(async move { shared.probe_workload(target).await });
                (label, handle)
            })
            .collect();

        let shared = &self.shared;
        let waits = handles.into_iter().map(|(label, mut handle)| async move {
            let joined = match deadline {
                Some(at) => match timeout_at(at, &mut handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        handle.abort();
                        shared.metrics.inc_probe("abandoned");
                        shared.logger.log_probe_abandoned(&label);
                        return ProbeOutcome::Abandoned;
                    }
                },
                None => handle.await,
            };

            joined.unwrap_or_else(|e| {
                shared
                    .logger
                    .log_probe_failed(&label, "", &format!("probe task failed: {}", e));
                ProbeOutcome::Abandoned
            })
        });

        join_all(waits).await
    }
}

impl Shared {
    async fn probe_workload(&self, target: ProbeTarget) -> ProbeOutcome {
        let cache_key = target.key.cache_key();
        let label = target.key.to_string();

        if let Some(supported) = self.cache.lookup(&cache_key) {
            self.metrics.inc_cache_hit();
            self.logger.log_cache_hit(&label, supported);
            return ProbeOutcome::from_verdict(supported);
        }

        let Ok(_permit) = self.gate.clone().acquire_owned().await else {
            return ProbeOutcome::Abandoned;
        };

        let started = Instant::now();
        loop {
            match self.probe_images(&target.images).await {
                Ok(supported) => {
                    self.cache.store(cache_key, supported);
                    let outcome = ProbeOutcome::from_verdict(supported);
                    let elapsed = started.elapsed();
                    self.metrics.observe_probe_latency(elapsed.as_secs_f64());
                    self.metrics.inc_probe(outcome.as_str());
                    self.logger.log_probe_result(
                        &label,
                        outcome.as_str(),
                        target.images.len(),
                        elapsed.as_millis() as u64,
                    );
                    return outcome;
                }
                Err(err) if err.is_rate_limited() => {
                    let delay_ms = jitter_delay_ms(self.jitter_ms);
                    self.metrics.inc_rate_limit_retry();
                    self.logger.log_rate_limited(&label, err.image(), delay_ms);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(err) => {
                    self.metrics.inc_probe("failed");
                    self.logger
                        .log_probe_failed(&label, err.image(), &err.to_string());
                    return ProbeOutcome::Failed(err);
                }
            }
        }
    }

    /// Distinct images in order; the first error or unsupported image decides
    async fn probe_images(&self, images: &[String]) -> Result<bool, ProbeError> {
        let mut seen = HashSet::new();
        for image in images {
            if !seen.insert(image.as_str()) {
                continue;
            }
            if !self.probe.probe(image).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn jitter_delay_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    rand::rng().random_range(0..max_ms)
}
