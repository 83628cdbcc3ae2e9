//! Error types for the probe and patch pipelines

use crate::models::WorkloadKind;
use std::fmt;
use thiserror::Error;

/// Classification of a failed registry request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The registry throttled the request (HTTP 429 / TOOMANYREQUESTS)
    RateLimited,
    /// Credentials were missing, rejected, or could not be resolved
    Unauthorized,
    /// The repository, tag or blob does not exist
    NotFound,
    /// Connection-level failure
    Network,
    /// The registry answered with something we could not interpret
    Malformed,
    Other,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::RateLimited => "rate limited",
            FetchErrorKind::Unauthorized => "unauthorized",
            FetchErrorKind::NotFound => "not found",
            FetchErrorKind::Network => "network error",
            FetchErrorKind::Malformed => "malformed response",
            FetchErrorKind::Other => "registry error",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a registry transport
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == FetchErrorKind::RateLimited
    }
}

/// Failure while resolving registry credentials
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("credential helper docker-credential-{helper} failed for {server}: {reason}")]
    Helper {
        helper: String,
        server: String,
        reason: String,
    },

    #[error("failed to read docker config {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("malformed auth entry for {server}: {reason}")]
    MalformedAuth { server: String, reason: String },
}

/// Failure while classifying a single image
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("failed to parse image reference {image}: {reason}")]
    InvalidReference { image: String, reason: String },

    #[error("registry rate limited {image}: {source}")]
    RateLimited {
        image: String,
        source: TransportError,
    },

    #[error("failed to fetch image descriptor for {image}: {source}")]
    Fetch {
        image: String,
        source: TransportError,
    },

    #[error("failed to read index manifest for {image}: {reason}")]
    IndexRead { image: String, reason: String },

    #[error("failed to read image config for {image}: {reason}")]
    ConfigRead { image: String, reason: String },
}

impl ProbeError {
    /// Whether the coordinator should retry the workload probe
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProbeError::RateLimited { .. })
    }

    /// Image reference the failure originated from
    pub fn image(&self) -> &str {
        match self {
            ProbeError::InvalidReference { image, .. }
            | ProbeError::RateLimited { image, .. }
            | ProbeError::Fetch { image, .. }
            | ProbeError::IndexRead { image, .. }
            | ProbeError::ConfigRead { image, .. } => image,
        }
    }

    /// Wrap a transport failure, lifting rate limits into their own variant
    pub fn from_transport(image: &str, source: TransportError) -> Self {
        if source.is_rate_limited() {
            ProbeError::RateLimited {
                image: image.to_string(),
                source,
            }
        } else {
            ProbeError::Fetch {
                image: image.to_string(),
                source,
            }
        }
    }
}

/// Failure talking to the Kubernetes API
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("{key} not found")]
    NotFound { key: String },

    #[error("kubernetes api request failed: {0}")]
    Api(#[from] kube::Error),

    #[error("{0}")]
    Other(String),
}

/// Failure mutating a single workload
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("get {kind}: {source}")]
    Read {
        kind: WorkloadKind,
        source: ClusterError,
    },

    #[error("failed to build patch for {kind}: {source}")]
    Encode {
        kind: WorkloadKind,
        source: serde_json::Error,
    },

    #[error("failed to patch {kind} after {attempts} attempts: {source}")]
    Write {
        kind: WorkloadKind,
        attempts: u32,
        source: ClusterError,
    },
}

/// Invalid operator selection; aborts the whole batch before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("input nothing")]
    Empty,

    #[error("error converting workload id '{0}' to int")]
    InvalidId(String),

    #[error("invalid workload id range '{0}'")]
    InvalidRange(String),

    #[error("wrong workload id '{id}', only {available} workloads are listed")]
    OutOfRange { id: usize, available: usize },

    #[error("confirm failed")]
    NotConfirmed,
}
