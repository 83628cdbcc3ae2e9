//! Kubernetes API implementation of [`WorkloadStore`]

use super::WorkloadStore;
use crate::error::ClusterError;
use crate::models::{WorkloadKey, WorkloadKind, WorkloadResource};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::scheduling::v1::PriorityClass;
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use tracing::debug;

/// Workload store talking to the cluster of a kube [`Client`]
#[derive(Clone)]
pub struct KubeWorkloadStore {
    client: Client,
}

impl KubeWorkloadStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

async fn list_all<K>(api: Api<K>) -> Result<Vec<K>, ClusterError>
where
    K: kube::Resource + Clone + DeserializeOwned + Debug,
{
    Ok(api.list(&ListParams::default()).await?.items)
}

fn read_error(err: kube::Error, key: &WorkloadKey) -> ClusterError {
    match err {
        kube::Error::Api(response) if response.code == 404 => ClusterError::NotFound {
            key: key.to_string(),
        },
        other => ClusterError::Api(other),
    }
}

#[async_trait]
impl WorkloadStore for KubeWorkloadStore {
    async fn list(
        &self,
        kind: WorkloadKind,
        namespace: Option<&str>,
    ) -> Result<Vec<WorkloadResource>, ClusterError> {
        let resources = match kind {
            WorkloadKind::Deployment => list_all(self.api::<Deployment>(namespace))
                .await?
                .into_iter()
                .map(WorkloadResource::Deployment)
                .collect(),
            WorkloadKind::StatefulSet => list_all(self.api::<StatefulSet>(namespace))
                .await?
                .into_iter()
                .map(WorkloadResource::StatefulSet)
                .collect(),
        };
        Ok(resources)
    }

    async fn get(&self, key: &WorkloadKey) -> Result<WorkloadResource, ClusterError> {
        let namespace = Some(key.namespace.as_str());
        let resource = match key.kind {
            WorkloadKind::Deployment => self
                .api::<Deployment>(namespace)
                .get(&key.name)
                .await
                .map(WorkloadResource::Deployment),
            WorkloadKind::StatefulSet => self
                .api::<StatefulSet>(namespace)
                .get(&key.name)
                .await
                .map(WorkloadResource::StatefulSet),
        };
        resource.map_err(|e| read_error(e, key))
    }

    async fn patch(&self, key: &WorkloadKey, patch: &Value) -> Result<(), ClusterError> {
        let namespace = Some(key.namespace.as_str());
        let params = PatchParams::default();
        match key.kind {
            WorkloadKind::Deployment => {
                self.api::<Deployment>(namespace)
                    .patch(&key.name, &params, &Patch::Merge(patch))
                    .await?;
            }
            WorkloadKind::StatefulSet => {
                self.api::<StatefulSet>(namespace)
                    .patch(&key.name, &params, &Patch::Merge(patch))
                    .await?;
            }
        }
        Ok(())
    }

    async fn pod_priority(&self, namespace: &str, app: &str) -> Result<Option<i32>, ClusterError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let selector = format!("app={}", app);
        let list = pods.list(&ListParams::default().labels(&selector)).await?;

        let Some(class_name) = list
            .items
            .first()
            .and_then(|pod| pod.spec.as_ref())
            .and_then(|spec| spec.priority_class_name.clone())
        else {
            debug!(namespace = %namespace, app = %app, "No pod priority class found");
            return Ok(None);
        };

        let classes: Api<PriorityClass> = Api::all(self.client.clone());
        let class = classes.get(&class_name).await?;
        Ok(Some(class.value))
    }
}
