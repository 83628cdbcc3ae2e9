//! Batch scheduling changes: migrate, rollback, ARM patch and ARM rollback

use super::{prompt, Session};
use crate::output::{print_batch_report, print_info, print_warning, OutputFormat};
use anyhow::Result;
use armshift_lib::selection::{check_confirmation, parse_selection, CONFIRM_WORD};
use armshift_lib::{BatchDirective, BatchReport, Workload, WorkloadKey};
use colored::Colorize;

/// Resolve `selection` against the listed workloads
pub fn select<'a>(workloads: &'a [Workload], selection: &str) -> Result<Vec<&'a Workload>> {
    let ids = parse_selection(selection, workloads.len())?;
    Ok(ids.into_iter().map(|id| &workloads[id]).collect())
}

/// Ask the operator to type the confirmation word
pub fn confirm(directive: BatchDirective, selected: &[&Workload]) -> Result<()> {
    println!(
        "{} will change {} workloads:",
        directive.to_string().bold(),
        selected.len()
    );
    for w in selected {
        println!("  {} {}/{}", w.kind(), w.namespace().cyan(), w.name());
    }
    let answer = prompt(&format!("Type '{}' to continue: ", CONFIRM_WORD))?;
    check_confirmation(&answer)?;
    Ok(())
}

/// Run a directive over `selected` and print the per-workload results
pub async fn apply(
    session: &Session,
    directive: BatchDirective,
    selected: &[&Workload],
) -> Result<BatchReport> {
    let keys: Vec<WorkloadKey> = selected.iter().map(|w| w.key.clone()).collect();
    let report = session.applier().run(directive, &keys).await;
    print_batch_report(&report, session.format)?;
    Ok(report)
}

/// One-shot batch: list, select, confirm, apply
pub async fn run_batch(
    session: &Session,
    directive: BatchDirective,
    selection: &str,
    namespace: Option<&str>,
    yes: bool,
) -> Result<()> {
    let workloads = session.workloads(session.namespace(namespace)).await?;
    if workloads.is_empty() {
        print_warning("No workloads found");
        return Ok(());
    }

    // Selection and confirmation errors abort before anything is written
    let selected = select(&workloads, selection)?;
    if !yes {
        confirm(directive, &selected)?;
    } else if session.format == OutputFormat::Table {
        print_info(&format!("{} {} workloads", directive, selected.len()));
    }

    let report = apply(session, directive, &selected).await?;
    if report.failed() > 0 {
        anyhow::bail!(
            "{} of {} workloads failed to {}",
            report.failed(),
            report.workloads.len(),
            directive
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use armshift_lib::SelectionError;

    fn listed() -> Vec<Workload> {
        serde_json::from_value::<Vec<k8s_openapi::api::apps::v1::Deployment>>(serde_json::json!([
            {"metadata": {"name": "api", "namespace": "shop"}, "spec": {"selector": {}, "template": {"spec": {"containers": [{"name": "api", "image": "nginx"}]}}}},
            {"metadata": {"name": "cart", "namespace": "shop"}, "spec": {"selector": {}, "template": {"spec": {"containers": [{"name": "cart", "image": "redis"}]}}}},
            {"metadata": {"name": "web", "namespace": "shop"}, "spec": {"selector": {}, "template": {"spec": {"containers": [{"name": "web", "image": "httpd"}]}}}}
        ]))
        .unwrap()
        .into_iter()
        .map(|d| {
            Workload::from_resource(
                armshift_lib::WorkloadResource::Deployment(d),
                &armshift_lib::MarkerSet::default(),
                0,
            )
        })
        .collect()
    }

    #[test]
    fn test_select_range_and_list() {
        let workloads = listed();
        let selected = select(&workloads, "2,0-1").unwrap();
        let names: Vec<&str> = selected.iter().map(|w| w.name()).collect();
        assert_eq!(names, vec!["api", "cart", "web"]);
    }

    #[test]
    fn test_select_rejects_out_of_range() {
        let workloads = listed();
        let err = select(&workloads, "3").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SelectionError>(),
            Some(SelectionError::OutOfRange { id: 3, available: 3 })
        ));
    }
}
