//! Output formatting utilities

use armshift_lib::constraints::Skip;
use armshift_lib::{BatchDirective, BatchReport, PatchStatus, ProbeOutcome, Workload, WorkloadReport};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn from_config(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| Self::from_str(v, true).ok())
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Row for the workload table
#[derive(Tabled)]
struct WorkloadRow {
    #[tabled(rename = "ID")]
    id: usize,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Replicas")]
    replicas: i32,
    #[tabled(rename = "Available")]
    available: i32,
    #[tabled(rename = "Ready")]
    ready: String,
    #[tabled(rename = "Migrated")]
    migrated: String,
    #[tabled(rename = "ARM Patched")]
    arm_patched: String,
    #[tabled(rename = "Priority")]
    priority: i32,
    #[tabled(rename = "Age")]
    age: String,
}

/// Row for the workload table with ARM64 support
#[derive(Tabled)]
struct ArmWorkloadRow {
    #[tabled(inline)]
    base: WorkloadRow,
    #[tabled(rename = "ARM64")]
    arm64: String,
}

/// JSON shape of a listed workload
#[derive(Serialize)]
struct WorkloadEntry<'a> {
    id: usize,
    namespace: &'a str,
    kind: &'a str,
    name: &'a str,
    replicas: i32,
    available: i32,
    ready: bool,
    migrated: bool,
    arm_patched: bool,
    priority: i32,
    images: &'a [String],
    created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    arm64: Option<&'static str>,
}

/// Format an age like `kubectl get` does
pub fn format_age(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created) = created else {
        return "-".to_string();
    };
    let secs = (now - created).num_seconds().max(0);
    match secs {
        s if s < 120 => format!("{}s", s),
        s if s < 3600 * 2 => format!("{}m", s / 60),
        s if s < 86400 * 2 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86400),
    }
}

/// Color a yes/no flag
pub fn color_bool(value: bool) -> String {
    if value {
        "true".green().to_string()
    } else {
        "false".red().to_string()
    }
}

/// Display label of a probe outcome; failures are unknown, never false
pub fn arm64_label(outcome: &ProbeOutcome) -> &'static str {
    match outcome.verdict() {
        Some(true) => "true",
        Some(false) => "false",
        None => "unknown",
    }
}

fn color_arm64(outcome: &ProbeOutcome) -> String {
    match outcome.verdict() {
        Some(value) => color_bool(value),
        None => "unknown".yellow().to_string(),
    }
}

fn row(id: usize, w: &Workload, now: DateTime<Utc>) -> WorkloadRow {
    WorkloadRow {
        id,
        namespace: w.namespace().to_string(),
        kind: w.kind().to_string(),
        name: w.name().to_string(),
        replicas: w.replicas,
        available: w.available,
        ready: color_bool(w.ready),
        migrated: color_bool(w.migration_applied),
        arm_patched: color_bool(w.arm_patched),
        priority: w.priority,
        age: format_age(w.created_at, now),
    }
}

/// Print the workload list; `outcomes` lines up with `workloads` when ARM64 support was probed
pub fn print_workloads(
    workloads: &[Workload],
    outcomes: Option<&[ProbeOutcome]>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let entries: Vec<WorkloadEntry> = workloads
                .iter()
                .enumerate()
                .map(|(id, w)| WorkloadEntry {
                    id,
                    namespace: w.namespace(),
                    kind: w.kind().as_str(),
                    name: w.name(),
                    replicas: w.replicas,
                    available: w.available,
                    ready: w.ready,
                    migrated: w.migration_applied,
                    arm_patched: w.arm_patched,
                    priority: w.priority,
                    images: &w.images,
                    created_at: w.created_at,
                    arm64: outcomes.and_then(|o| o.get(id)).map(arm64_label),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Table => {
            if workloads.is_empty() {
                print_warning("No workloads found");
                return Ok(());
            }

            let now = Utc::now();
            let table = match outcomes {
                Some(outcomes) => {
                    let rows: Vec<ArmWorkloadRow> = workloads
                        .iter()
                        .zip(outcomes)
                        .enumerate()
                        .map(|(id, (w, outcome))| ArmWorkloadRow {
                            base: row(id, w, now),
                            arm64: color_arm64(outcome),
                        })
                        .collect();
                    tabled::Table::new(rows)
                        .with(tabled::settings::Style::rounded())
                        .to_string()
                }
                None => {
                    let rows: Vec<WorkloadRow> = workloads
                        .iter()
                        .enumerate()
                        .map(|(id, w)| row(id, w, now))
                        .collect();
                    tabled::Table::new(rows)
                        .with(tabled::settings::Style::rounded())
                        .to_string()
                }
            };
            println!("{}", table);
            println!("\nTotal: {} workloads", workloads.len());
        }
    }
    Ok(())
}

/// JSON shape of one batch result
#[derive(Serialize)]
struct ReportEntry<'a> {
    namespace: &'a str,
    kind: &'a str,
    name: &'a str,
    #[serde(flatten)]
    status: &'a PatchStatus,
    skipped: Vec<&'static str>,
}

fn skip_line(report: &WorkloadReport, skip: &Skip) -> String {
    format!(
        "{} {}/{} {}",
        report.key.kind,
        report.key.namespace,
        report.key.name,
        skip.describe()
    )
}

/// Result line for one workload, naming it by kind and namespace/name
fn status_line(directive: BatchDirective, report: &WorkloadReport) -> String {
    let key = &report.key;
    match &report.status {
        PatchStatus::Patched { .. } => format!(
            "{} {}/{} {} succeeded",
            key.kind, key.namespace, key.name, directive
        ),
        PatchStatus::Unchanged => format!(
            "{} {}/{} already in desired state",
            key.kind, key.namespace, key.name
        ),
        PatchStatus::Failed { error } => format!(
            "{} {}/{} {} failed: {}",
            key.kind, key.namespace, key.name, directive, error
        ),
    }
}

/// Print per-workload result lines for a batch
pub fn print_batch_report(report: &BatchReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let entries: Vec<ReportEntry> = report
                .workloads
                .iter()
                .map(|w| ReportEntry {
                    namespace: &w.key.namespace,
                    kind: w.key.kind.as_str(),
                    name: &w.key.name,
                    status: &w.status,
                    skipped: w.skipped.iter().map(Skip::describe).collect(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Table => {
            for w in &report.workloads {
                for skip in &w.skipped {
                    print_info(&skip_line(w, skip));
                }
                let line = status_line(report.directive, w);
                match &w.status {
                    PatchStatus::Patched { .. } => print_success(&line),
                    PatchStatus::Unchanged => print_info(&line),
                    PatchStatus::Failed { .. } => print_error(&line),
                }
            }
            println!(
                "\n{} patched, {} unchanged, {} failed",
                report.patched(),
                report.unchanged(),
                report.failed()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_age() {
        let now = Utc::now();
        assert_eq!(format_age(None, now), "-");
        assert_eq!(format_age(Some(now - Duration::seconds(42)), now), "42s");
        assert_eq!(format_age(Some(now - Duration::minutes(30)), now), "30m");
        assert_eq!(format_age(Some(now - Duration::hours(5)), now), "5h");
        assert_eq!(format_age(Some(now - Duration::days(12)), now), "12d");
    }

    #[test]
    fn test_arm64_label_never_conflates_unknown() {
        assert_eq!(arm64_label(&ProbeOutcome::Supported), "true");
        assert_eq!(arm64_label(&ProbeOutcome::Unsupported), "false");
        assert_eq!(arm64_label(&ProbeOutcome::Abandoned), "unknown");
    }

    #[test]
    fn test_status_lines_name_the_namespace() {
        use armshift_lib::{WorkloadKey, WorkloadKind};

        let line = |namespace: &str, status: PatchStatus| {
            status_line(
                BatchDirective::Migrate,
                &WorkloadReport {
                    key: WorkloadKey::new(WorkloadKind::Deployment, namespace, "api"),
                    status,
                    skipped: Vec::new(),
                },
            )
        };

        let shop = line("shop", PatchStatus::Patched { attempts: 1 });
        let billing = line("billing", PatchStatus::Patched { attempts: 1 });
        assert_eq!(shop, "Deployment shop/api migrate succeeded");
        assert_ne!(shop, billing);
        assert_eq!(
            line("shop", PatchStatus::Unchanged),
            "Deployment shop/api already in desired state"
        );
        assert_eq!(
            line(
                "billing",
                PatchStatus::Failed {
                    error: "conflict".to_string()
                }
            ),
            "Deployment billing/api migrate failed: conflict"
        );
    }

    #[test]
    fn test_output_format_from_config() {
        assert_eq!(OutputFormat::from_config(Some("json")), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_config(Some("TABLE")), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_config(Some("yaml")), None);
        assert_eq!(OutputFormat::from_config(None), None);
    }
}
