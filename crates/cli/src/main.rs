//! armshift CLI
//!
//! Lists Deployments and StatefulSets, probes their images for ARM64
//! support and moves selected workloads onto ARM64 capacity.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use armshift_lib::cluster::KubeWorkloadStore;
use armshift_lib::{BatchDirective, EventLogger, MigratorMetrics};
use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::{interactive, list, patch, Session};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Move Kubernetes workloads onto ARM64 nodes
#[derive(Parser)]
#[command(name = "armshift")]
#[command(author, version, about = "Move Kubernetes workloads onto ARM64 nodes", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (uses default if not specified)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Output format (defaults to the configured format, then table)
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Write Prometheus metrics to this file on exit
    #[arg(long, global = true)]
    pub metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Workload IDs from `armshift list`, e.g. `3`, `0,2` or `1-4`
    pub selection: String,

    /// Filter by namespace (lists all namespaces if not specified)
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List Deployments and StatefulSets
    List {
        /// Filter by namespace (lists all namespaces if not specified)
        #[arg(long, short)]
        namespace: Option<String>,

        /// Probe registries for ARM64 image support
        #[arg(long)]
        check_arm: bool,

        /// Give up on probes still running after this many seconds
        #[arg(long, requires = "check_arm")]
        probe_timeout: Option<u64>,
    },

    /// Add the migration toleration and node selector
    Migrate(BatchArgs),

    /// Remove the migration toleration and node selector
    Rollback(BatchArgs),

    /// Add a soft ARM64 node preference and the arm64 toleration
    ArmPatch(BatchArgs),

    /// Remove the ARM64 node preference and the arm64 toleration
    ArmRollback(BatchArgs),

    /// Menu-driven session
    Interactive {
        /// Filter by namespace (lists all namespaces if not specified)
        #[arg(long, short)]
        namespace: Option<String>,
    },
}

fn init_tracing(verbose: bool, log_format: LogFormat) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let registry = tracing_subscriber::registry().with(filter);

    match log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn batch(session: &Session, directive: BatchDirective, args: BatchArgs) -> Result<()> {
    patch::run_batch(
        session,
        directive,
        &args.selection,
        args.namespace.as_deref(),
        args.yes,
    )
    .await
}

async fn dispatch(session: &Session, command: Commands) -> Result<()> {
    match command {
        Commands::List {
            namespace,
            check_arm,
            probe_timeout,
        } => list::list_workloads(session, namespace.as_deref(), check_arm, probe_timeout).await,
        Commands::Migrate(args) => batch(session, BatchDirective::Migrate, args).await,
        Commands::Rollback(args) => batch(session, BatchDirective::RollbackMigrate, args).await,
        Commands::ArmPatch(args) => batch(session, BatchDirective::ArmPatch, args).await,
        Commands::ArmRollback(args) => batch(session, BatchDirective::RollbackArmPatch, args).await,
        Commands::Interactive { namespace } => {
            interactive::run(session, namespace.as_deref()).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let config = config::Config::load()?;
    let format = cli
        .format
        .or_else(|| output::OutputFormat::from_config(config.default_format.as_deref()))
        .unwrap_or_default();

    let cluster = client::ClusterClient::connect(cli.kubeconfig.as_deref(), cli.context.as_deref())
        .await?;
    tracing::debug!(event = "cluster_connected", context = %cluster.context, "Connected to cluster");
    let logger = EventLogger::new(cluster.context.clone());
    let store = Arc::new(KubeWorkloadStore::new(cluster.client));
    let session = Session::new(store, config, logger, format);

    let result = dispatch(&session, cli.command).await;

    if let Some(path) = &cli.metrics_out {
        let text = MigratorMetrics::new()
            .encode_text()
            .context("Failed to encode metrics")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    result
}
