//! Applies constraint directives to live workloads

use super::merge::{create_merge_patch, is_empty_patch};
use super::RetryPolicy;
use crate::cluster::WorkloadStore;
use crate::constraints::{plan, BatchDirective, MarkerSet, SchedulingConstraints, Skip};
use crate::error::{ClusterError, PatchError};
use crate::models::WorkloadKey;
use crate::observability::{EventLogger, MigratorMetrics};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Result of one workload in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PatchStatus {
    Patched { attempts: u32 },
    /// Desired state equals the live object; nothing was written
    Unchanged,
    Failed { error: String },
}

impl PatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchStatus::Patched { .. } => "patched",
            PatchStatus::Unchanged => "unchanged",
            PatchStatus::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkloadReport {
    pub key: WorkloadKey,
    pub status: PatchStatus,
    /// Concerns that were already in the desired state
    pub skipped: Vec<Skip>,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub directive: BatchDirective,
    pub workloads: Vec<WorkloadReport>,
}

impl BatchReport {
    fn count(&self, status: &str) -> usize {
        self.workloads
            .iter()
            .filter(|w| w.status.as_str() == status)
            .count()
    }

    pub fn patched(&self) -> usize {
        self.count("patched")
    }

    pub fn unchanged(&self) -> usize {
        self.count("unchanged")
    }

    pub fn failed(&self) -> usize {
        self.count("failed")
    }
}

/// Computes and persists minimal merge patches, one workload at a time
pub struct PatchApplier {
    store: Arc<dyn WorkloadStore>,
    policy: RetryPolicy,
    markers: MarkerSet,
    logger: EventLogger,
    metrics: MigratorMetrics,
}

impl PatchApplier {
    pub fn new(
        store: Arc<dyn WorkloadStore>,
        policy: RetryPolicy,
        markers: MarkerSet,
        logger: EventLogger,
    ) -> Self {
        Self {
            store,
            policy,
            markers,
            logger,
            metrics: MigratorMetrics::new(),
        }
    }

    /// Write the merge patch between `original` and `desired`, retrying every error
    pub async fn apply(
        &self,
        original: &Value,
        desired: &Value,
        key: &WorkloadKey,
    ) -> Result<PatchStatus, PatchError> {
        let patch = create_merge_patch(original, desired);
        if is_empty_patch(&patch) {
            return Ok(PatchStatus::Unchanged);
        }

        let label = key.to_string();
        let (result, attempts) = self
            .policy
            .run(
                |_| {
                    self.metrics.inc_patch_attempt();
                    self.store.patch(key, &patch)
                },
                |attempt, err: &ClusterError| {
                    self.logger.log_patch_retry(
                        &label,
                        attempt,
                        self.policy.max_attempts,
                        &err.to_string(),
                    )
                },
            )
            .await;

        result
            .map(|_| PatchStatus::Patched { attempts })
            .map_err(|source| PatchError::Write {
                kind: key.kind,
                attempts,
                source,
            })
    }

    /// Apply `directive` to each workload in order; failures do not stop the batch
    pub async fn run(&self, directive: BatchDirective, keys: &[WorkloadKey]) -> BatchReport {
        let mut workloads = Vec::with_capacity(keys.len());

        for key in keys {
            let report = self.patch_one(directive, key).await;
            let label = key.to_string();
            match &report.status {
                PatchStatus::Patched { attempts } => {
                    self.logger
                        .log_patch_applied(&label, directive.name(), *attempts)
                }
                PatchStatus::Unchanged => self.logger.log_patch_unchanged(&label, directive.name()),
                PatchStatus::Failed { error } => {
                    self.logger.log_patch_failed(&label, directive.name(), error)
                }
            }
            self.metrics.inc_patch(report.status.as_str());
            workloads.push(report);
        }

        let report = BatchReport {
            directive,
            workloads,
        };
        self.logger.log_batch_complete(
            directive.name(),
            report.patched(),
            report.unchanged(),
            report.failed(),
        );
        report
    }

    async fn patch_one(&self, directive: BatchDirective, key: &WorkloadKey) -> WorkloadReport {
        let mut skipped = Vec::new();
        let status = match self.prepare_and_apply(directive, key, &mut skipped).await {
            Ok(status) => status,
            Err(err) => PatchStatus::Failed {
                error: err.to_string(),
            },
        };
        WorkloadReport {
            key: key.clone(),
            status,
            skipped,
        }
    }

    async fn prepare_and_apply(
        &self,
        directive: BatchDirective,
        key: &WorkloadKey,
        skipped: &mut Vec<Skip>,
    ) -> Result<PatchStatus, PatchError> {
        let live = self
            .store
            .get(key)
            .await
            .map_err(|source| PatchError::Read {
                kind: key.kind,
                source,
            })?;

        let current = live
            .pod_spec()
            .map(SchedulingConstraints::from_pod_spec)
            .unwrap_or_default();
        let planned = plan(directive, &current, &self.markers);

        let label = key.to_string();
        for skip in &planned.skipped {
            self.logger
                .log_constraint_skipped(&label, skip.directive.name(), skip.describe());
        }
        skipped.extend(planned.skipped.iter().copied());

        if planned.is_noop(&current) {
            return Ok(PatchStatus::Unchanged);
        }

        let encode = |source| PatchError::Encode {
            kind: key.kind,
            source,
        };
        let original = live.to_json().map_err(encode)?;
        let mut desired = live;
        planned.desired.write_to(desired.pod_spec_mut(), &current);
        let desired = desired.to_json().map_err(encode)?;

        self.apply(&original, &desired, key).await
    }
}
