//! Kubernetes client construction

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use std::path::PathBuf;

/// A connected cluster client and the context it was built from
pub struct ClusterClient {
    pub client: Client,
    pub context: String,
}

impl ClusterClient {
    /// Connect using an explicit kubeconfig and context, or the inferred defaults
    pub async fn connect(kubeconfig: Option<&str>, context: Option<&str>) -> Result<Self> {
        let kubeconfig = match kubeconfig {
            Some(path) => Kubeconfig::read_from(PathBuf::from(path))
                .with_context(|| format!("Failed to read kubeconfig {}", path))?,
            None => match Kubeconfig::read() {
                Ok(config) => config,
                Err(_) => {
                    let client = Client::try_default()
                        .await
                        .context("Failed to create Kubernetes client")?;
                    return Ok(Self {
                        client,
                        context: "in-cluster".to_string(),
                    });
                }
            },
        };

        let context_name = context
            .map(str::to_string)
            .or_else(|| kubeconfig.current_context.clone())
            .unwrap_or_else(|| "default".to_string());

        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .context("Failed to load kubeconfig")?;
        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;

        Ok(Self {
            client,
            context: context_name,
        })
    }
}
