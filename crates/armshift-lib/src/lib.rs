//! Library for moving Kubernetes workloads onto ARM64 capacity
//!
//! This crate provides the core functionality for:
//! - Probing container registries for ARM64 image support
//! - Caching and fanning out workload probes with bounded concurrency
//! - Computing scheduling constraint changes (affinity, tolerations, selectors)
//! - Applying minimal merge patches with retry
//! - Workload enumeration and observability

pub mod cluster;
pub mod compat;
pub mod constraints;
pub mod error;
pub mod models;
pub mod observability;
pub mod patch;
pub mod registry;
pub mod selection;

pub use compat::{ArchCache, CoordinatorConfig, ProbeCoordinator, ProbeOutcome};
pub use constraints::{BatchDirective, ConstraintDirective, MarkerSet, SchedulingConstraints};
pub use error::{
    ClusterError, CredentialError, FetchErrorKind, PatchError, ProbeError, SelectionError,
    TransportError,
};
pub use models::*;
pub use observability::{EventLogger, MigratorMetrics};
pub use patch::{BatchReport, PatchApplier, PatchStatus, RetryPolicy, WorkloadReport};
