//! Core data models for workload migration

use crate::constraints::{MarkerSet, SchedulingConstraints};
use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{PodSpec, PodTemplateSpec};
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workload kinds that can be migrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 2] = [WorkloadKind::Deployment, WorkloadKind::StatefulSet];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a workload within a cluster snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadKey {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    pub fn new(kind: WorkloadKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key used by the architecture cache
    pub fn cache_key(&self) -> String {
        format!("{}:{}:{}", self.kind, self.name, self.namespace)
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Live Kubernetes object backing a workload
#[derive(Debug, Clone, PartialEq)]
pub enum WorkloadResource {
    Deployment(Deployment),
    StatefulSet(StatefulSet),
}

impl WorkloadResource {
    pub fn kind(&self) -> WorkloadKind {
        match self {
            WorkloadResource::Deployment(_) => WorkloadKind::Deployment,
            WorkloadResource::StatefulSet(_) => WorkloadKind::StatefulSet,
        }
    }

    pub fn key(&self) -> WorkloadKey {
        let (namespace, name) = match self {
            WorkloadResource::Deployment(d) => (d.namespace(), d.name_any()),
            WorkloadResource::StatefulSet(s) => (s.namespace(), s.name_any()),
        };
        WorkloadKey::new(self.kind(), namespace.unwrap_or_default(), name)
    }

    fn template(&self) -> Option<&PodTemplateSpec> {
        match self {
            WorkloadResource::Deployment(d) => d.spec.as_ref().map(|s| &s.template),
            WorkloadResource::StatefulSet(s) => s.spec.as_ref().map(|s| &s.template),
        }
    }

    /// Pod spec of the workload template, if the object carries one
    pub fn pod_spec(&self) -> Option<&PodSpec> {
        self.template().and_then(|t| t.spec.as_ref())
    }

    /// Mutable pod spec, creating empty intermediate structs when absent
    pub fn pod_spec_mut(&mut self) -> &mut PodSpec {
        let template = match self {
            WorkloadResource::Deployment(d) => {
                &mut d.spec.get_or_insert_with(Default::default).template
            }
            WorkloadResource::StatefulSet(s) => {
                &mut s.spec.get_or_insert_with(Default::default).template
            }
        };
        template.spec.get_or_insert_with(Default::default)
    }

    /// Container images followed by init container images, in declaration order
    pub fn images(&self) -> Vec<String> {
        let Some(spec) = self.pod_spec() else {
            return Vec::new();
        };

        spec.containers
            .iter()
            .chain(spec.init_containers.iter().flatten())
            .filter_map(|c| c.image.clone())
            .collect()
    }

    /// JSON document used as the base of merge patches
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            WorkloadResource::Deployment(d) => serde_json::to_value(d),
            WorkloadResource::StatefulSet(s) => serde_json::to_value(s),
        }
    }

    /// Declared replicas; the API server defaults a missing value to 1
    pub fn spec_replicas(&self) -> i32 {
        let replicas = match self {
            WorkloadResource::Deployment(d) => d.spec.as_ref().and_then(|s| s.replicas),
            WorkloadResource::StatefulSet(s) => s.spec.as_ref().and_then(|s| s.replicas),
        };
        replicas.unwrap_or(1)
    }

    pub fn available_replicas(&self) -> i32 {
        match self {
            WorkloadResource::Deployment(d) => d
                .status
                .as_ref()
                .and_then(|s| s.available_replicas)
                .unwrap_or(0),
            WorkloadResource::StatefulSet(s) => s
                .status
                .as_ref()
                .and_then(|s| s.ready_replicas)
                .unwrap_or(0),
        }
    }

    /// Rollout readiness derived from the object status
    pub fn is_ready(&self) -> bool {
        match self {
            WorkloadResource::Deployment(d) => deployment_is_ready(d),
            WorkloadResource::StatefulSet(s) => statefulset_is_ready(s),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let meta = match self {
            WorkloadResource::Deployment(d) => &d.metadata,
            WorkloadResource::StatefulSet(s) => &s.metadata,
        };
        meta.creation_timestamp.as_ref().map(|t| t.0)
    }
}

fn deployment_is_ready(deployment: &Deployment) -> bool {
    let Some(status) = deployment.status.as_ref() else {
        return false;
    };
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);

    let conditions = status.conditions.as_deref().unwrap_or_default();
    if conditions.is_empty() {
        return false;
    }

    let mut progressing = false;
    let mut available = false;
    let mut replica_failure = false;
    for condition in conditions {
        let is_true = condition.status == "True";
        match condition.type_.as_str() {
            "Progressing" => {
                if is_true && condition.reason.as_deref() == Some("NewReplicaSetAvailable") {
                    progressing = true;
                }
            }
            "Available" => available |= is_true,
            "ReplicaFailure" => replica_failure |= is_true,
            _ => {}
        }
    }

    status.observed_generation == deployment.metadata.generation
        && status.replicas.unwrap_or(0) == desired
        && status.ready_replicas.unwrap_or(0) == desired
        && status.available_replicas.unwrap_or(0) == desired
        && (progressing || available)
        && !replica_failure
}

fn statefulset_is_ready(sts: &StatefulSet) -> bool {
    let Some(status) = sts.status.as_ref() else {
        return false;
    };
    let desired = sts.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);

    status.observed_generation == sts.metadata.generation
        && status.replicas == desired
        && status.ready_replicas.unwrap_or(0) == desired
        && status.current_replicas.unwrap_or(0) == desired
}

/// A deployable unit under consideration, built fresh on every enumeration
#[derive(Debug, Clone)]
pub struct Workload {
    pub key: WorkloadKey,
    pub replicas: i32,
    pub available: i32,
    pub ready: bool,
    pub priority: i32,
    pub images: Vec<String>,
    /// Migration node selector and toleration are both present
    pub migration_applied: bool,
    /// ARM64 preference or toleration is present
    pub arm_patched: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub resource: WorkloadResource,
}

impl Workload {
    pub fn from_resource(resource: WorkloadResource, markers: &MarkerSet, priority: i32) -> Self {
        let constraints = resource
            .pod_spec()
            .map(SchedulingConstraints::from_pod_spec)
            .unwrap_or_default();

        Self {
            key: resource.key(),
            replicas: resource.spec_replicas(),
            available: resource.available_replicas(),
            ready: resource.is_ready(),
            priority,
            images: resource.images(),
            migration_applied: constraints.migration_applied(markers),
            arm_patched: constraints.arm_patched(markers),
            created_at: resource.created_at(),
            resource,
        }
    }

    pub fn kind(&self) -> WorkloadKind {
        self.key.kind
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use k8s_openapi::api::apps::v1::{DeploymentCondition, DeploymentStatus, StatefulSetStatus};
    use k8s_openapi::api::core::v1::Container;

    #[test]
    fn test_cache_key_format() {
        let key = WorkloadKey::new(WorkloadKind::StatefulSet, "db", "postgres");
        assert_eq!(key.cache_key(), "StatefulSet:postgres:db");
        assert_eq!(key.to_string(), "StatefulSet db/postgres");
    }

    #[test]
    fn test_images_include_init_containers_in_order() {
        let mut resource = deployment("default", "web", &["nginx:1.25", "sidecar:2"]);
        resource.pod_spec_mut().init_containers = Some(vec![Container {
            name: "init".to_string(),
            image: Some("busybox:1.36".to_string()),
            ..Default::default()
        }]);

        assert_eq!(
            resource.images(),
            vec!["nginx:1.25", "sidecar:2", "busybox:1.36"]
        );
    }

    #[test]
    fn test_pod_spec_mut_creates_missing_spec() {
        let mut resource = WorkloadResource::StatefulSet(StatefulSet::default());
        assert!(resource.pod_spec().is_none());
        resource.pod_spec_mut().node_selector = Some(Default::default());
        assert!(resource.pod_spec().is_some());
    }

    #[test]
    fn test_deployment_readiness() {
        let mut resource = deployment("default", "web", &["nginx"]);
        assert!(!resource.is_ready());

        if let WorkloadResource::Deployment(d) = &mut resource {
            d.metadata.generation = Some(4);
            d.status = Some(DeploymentStatus {
                observed_generation: Some(4),
                replicas: Some(3),
                ready_replicas: Some(3),
                available_replicas: Some(3),
                conditions: Some(vec![DeploymentCondition {
                    type_: "Available".to_string(),
                    status: "True".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            });
        }
        assert!(resource.is_ready());
        assert_eq!(resource.available_replicas(), 3);

        if let WorkloadResource::Deployment(d) = &mut resource {
            if let Some(conditions) = d.status.as_mut().and_then(|s| s.conditions.as_mut()) {
                conditions.push(DeploymentCondition {
                    type_: "ReplicaFailure".to_string(),
                    status: "True".to_string(),
                    ..Default::default()
                });
            }
        }
        assert!(!resource.is_ready());
    }

    #[test]
    fn test_statefulset_readiness() {
        let mut resource = statefulset("db", "postgres", &["postgres:16"]);
        if let WorkloadResource::StatefulSet(s) = &mut resource {
            s.metadata.generation = Some(1);
            s.status = Some(StatefulSetStatus {
                observed_generation: Some(1),
                replicas: 2,
                ready_replicas: Some(2),
                current_replicas: Some(1),
                ..Default::default()
            });
        }
        assert!(!resource.is_ready());
        assert_eq!(resource.available_replicas(), 2);

        if let WorkloadResource::StatefulSet(s) = &mut resource {
            if let Some(status) = s.status.as_mut() {
                status.current_replicas = Some(2);
            }
        }
        assert!(resource.is_ready());
    }

    #[test]
    fn test_workload_from_resource() {
        let w = workload(deployment("shop", "cart", &["cart:1"]));
        assert_eq!(w.key, WorkloadKey::new(WorkloadKind::Deployment, "shop", "cart"));
        assert_eq!(w.replicas, 3);
        assert_eq!(w.images, vec!["cart:1"]);
        assert!(!w.migration_applied);
        assert!(!w.arm_patched);
    }
}
