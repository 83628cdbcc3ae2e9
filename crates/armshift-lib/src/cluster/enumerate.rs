//! Workload enumeration

use super::WorkloadStore;
use crate::constraints::MarkerSet;
use crate::error::ClusterError;
use crate::models::{Workload, WorkloadKind, WorkloadResource};
use crate::observability::EventLogger;
use futures::stream::{self, StreamExt};

/// Pod priority lookups in flight against the API server at once
pub const PRIORITY_LOOKUP_CONCURRENCY: usize = 8;

/// List Deployments and StatefulSets sorted by namespace, kind and name
///
/// Positions in the returned list are the workload IDs the operator selects
/// from. Priority lookups that fail are logged and count as 0.
pub async fn list_workloads(
    store: &dyn WorkloadStore,
    namespace: Option<&str>,
    markers: &MarkerSet,
    logger: &EventLogger,
) -> Result<Vec<Workload>, ClusterError> {
    let mut resources = Vec::new();
    for kind in WorkloadKind::ALL {
        resources.extend(store.list(kind, namespace).await?);
    }

    let priorities: Vec<i32> = stream::iter(&resources)
        .map(|resource| resolve_priority(store, resource, logger))
        .buffered(PRIORITY_LOOKUP_CONCURRENCY)
        .collect()
        .await;

    let mut workloads: Vec<Workload> = resources
        .into_iter()
        .zip(priorities)
        .map(|(resource, priority)| Workload::from_resource(resource, markers, priority))
        .collect();

    workloads.sort_by(|a, b| {
        (a.namespace(), a.kind(), a.name()).cmp(&(b.namespace(), b.kind(), b.name()))
    });
    Ok(workloads)
}

async fn resolve_priority(
    store: &dyn WorkloadStore,
    resource: &WorkloadResource,
    logger: &EventLogger,
) -> i32 {
    let key = resource.key();
    match store.pod_priority(&key.namespace, &key.name).await {
        Ok(priority) => priority.unwrap_or(0),
        Err(err) => {
            logger.log_priority_unresolved(&key.to_string(), &err.to_string());
            0
        }
    }
}
