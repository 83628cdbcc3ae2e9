//! Subcommand implementations

pub mod interactive;
pub mod list;
pub mod patch;

use crate::config::Config;
use crate::output::OutputFormat;
use anyhow::{Context, Result};
use armshift_lib::cluster::{list_workloads, WorkloadStore};
use armshift_lib::registry::{DockerConfigKeychain, OciTransport, RegistryProbe};
use armshift_lib::{ArchCache, EventLogger, PatchApplier, ProbeCoordinator, Workload};
use std::io::{BufRead, Write};
use std::sync::Arc;

/// State shared by every command of one invocation
pub struct Session {
    pub store: Arc<dyn WorkloadStore>,
    pub config: Config,
    pub logger: EventLogger,
    pub format: OutputFormat,
    /// Architecture verdicts reused for the rest of the invocation
    pub cache: Arc<ArchCache>,
}

impl Session {
    pub fn new(
        store: Arc<dyn WorkloadStore>,
        config: Config,
        logger: EventLogger,
        format: OutputFormat,
    ) -> Self {
        Self {
            store,
            config,
            logger,
            format,
            cache: Arc::new(ArchCache::new()),
        }
    }

    /// Explicit namespace flag, else the configured default, else all namespaces
    pub fn namespace<'a>(&'a self, flag: Option<&'a str>) -> Option<&'a str> {
        flag.or(self.config.default_namespace.as_deref())
            .filter(|ns| !ns.is_empty())
    }

    pub async fn workloads(&self, namespace: Option<&str>) -> Result<Vec<Workload>> {
        list_workloads(
            self.store.as_ref(),
            namespace,
            &self.config.markers,
            &self.logger,
        )
        .await
        .context("Failed to list workloads")
    }

    pub fn coordinator(&self) -> Result<ProbeCoordinator> {
        let keychain =
            DockerConfigKeychain::load_default().context("Failed to load Docker credentials")?;
        let transport = OciTransport::new(&self.config.probe.insecure_registries);
        let probe = RegistryProbe::new(Arc::new(transport), Arc::new(keychain));

        Ok(ProbeCoordinator::new(
            Arc::new(probe),
            self.cache.clone(),
            &self.config.probe,
            self.logger.clone(),
        ))
    }

    pub fn applier(&self) -> PatchApplier {
        PatchApplier::new(
            self.store.clone(),
            self.config.retry,
            self.config.markers.clone(),
            self.logger.clone(),
        )
    }
}

/// Read one trimmed line; `None` once the input is closed
pub fn read_answer(reader: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Print `prompt` and read one line from stdin; `None` at end of input
pub fn prompt_line(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout().flush().context("Failed to flush stdout")?;
    read_answer(&mut std::io::stdin().lock())
}

/// Like [`prompt_line`], treating end of input as an empty answer
pub fn prompt(prompt: &str) -> Result<String> {
    Ok(prompt_line(prompt)?.unwrap_or_default())
}
