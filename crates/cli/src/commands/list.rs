//! Workload listing

use super::Session;
use crate::output::{print_info, print_workloads};
use anyhow::Result;
use armshift_lib::compat::ProbeTarget;
use armshift_lib::{ProbeOutcome, Workload};
use std::time::Duration;

/// Probe ARM64 support for every workload, in list order
pub async fn probe_workloads(
    session: &Session,
    workloads: &[Workload],
    timeout: Option<Duration>,
) -> Result<Vec<ProbeOutcome>> {
    let coordinator = session.coordinator()?;
    let targets = workloads.iter().map(ProbeTarget::from).collect();
    Ok(coordinator.probe_all_until(targets, timeout).await)
}

/// List workloads, optionally probing their images for ARM64 support
pub async fn list_workloads(
    session: &Session,
    namespace: Option<&str>,
    check_arm: bool,
    probe_timeout: Option<u64>,
) -> Result<()> {
    let workloads = session.workloads(session.namespace(namespace)).await?;

    let outcomes = if check_arm && !workloads.is_empty() {
        if session.format == crate::output::OutputFormat::Table {
            print_info(&format!(
                "Checking ARM64 image support for {} workloads...",
                workloads.len()
            ));
        }
        let timeout = probe_timeout.map(Duration::from_secs);
        Some(probe_workloads(session, &workloads, timeout).await?)
    } else {
        None
    };

    print_workloads(&workloads, outcomes.as_deref(), session.format)
}
