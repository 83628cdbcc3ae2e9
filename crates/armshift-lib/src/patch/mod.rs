//! Minimal merge patches with write retry

mod applier;
pub mod merge;
mod retry;

#[cfg(test)]
mod tests;

pub use applier::{BatchReport, PatchApplier, PatchStatus, WorkloadReport};
pub use retry::RetryPolicy;
