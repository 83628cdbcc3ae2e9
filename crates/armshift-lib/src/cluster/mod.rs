//! Cluster access for workload enumeration and mutation

mod enumerate;
mod kube_store;

pub use enumerate::list_workloads;
pub use kube_store::KubeWorkloadStore;

use crate::error::ClusterError;
use crate::models::{WorkloadKey, WorkloadKind, WorkloadResource};
use async_trait::async_trait;
use serde_json::Value;

/// Read and write access to Deployments and StatefulSets
#[async_trait]
pub trait WorkloadStore: Send + Sync {
    /// List workloads of one kind, across all namespaces when `namespace` is `None`
    async fn list(
        &self,
        kind: WorkloadKind,
        namespace: Option<&str>,
    ) -> Result<Vec<WorkloadResource>, ClusterError>;

    /// Fetch the live object
    async fn get(&self, key: &WorkloadKey) -> Result<WorkloadResource, ClusterError>;

    /// Apply an RFC 7386 merge patch
    async fn patch(&self, key: &WorkloadKey, patch: &Value) -> Result<(), ClusterError>;

    /// Priority value of the pods labelled `app=<app>`, if they name a priority class
    async fn pod_priority(&self, namespace: &str, app: &str) -> Result<Option<i32>, ClusterError>;
}
