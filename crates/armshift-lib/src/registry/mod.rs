//! Registry access for architecture probing
//!
//! [`RegistryProbe`] resolves credentials, fetches the top-level descriptor of
//! an image and decides whether the image runs on linux/arm64. The network is
//! reached only through [`RegistryTransport`], so tests can substitute it.

pub mod credentials;
pub mod manifest;
mod oci;


pub use credentials::{AnonymousResolver, CredentialResolver, DockerConfigKeychain};
pub use oci::OciTransport;

use crate::constraints::ARM64;
use crate::error::{FetchErrorKind, ProbeError, TransportError};
use async_trait::async_trait;
use manifest::{Descriptor, DescriptorError};
use oci_client::secrets::RegistryAuth;
use oci_client::Reference;
use std::sync::Arc;
use tracing::debug;

/// Raw document access to a container registry
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Fetch the top-level manifest document for `reference`
    async fn fetch_manifest(
        &self,
        reference: &Reference,
        auth: &RegistryAuth,
    ) -> Result<Vec<u8>, TransportError>;

    /// Fetch a blob of the repository named by `reference`
    async fn fetch_blob(&self, reference: &Reference, digest: &str)
        -> Result<Vec<u8>, TransportError>;
}

/// Classifies a single image reference
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn probe(&self, image: &str) -> Result<bool, ProbeError>;
}

/// Parse an image reference, normalizing Docker Hub short names
pub fn parse_reference(image: &str) -> Result<Reference, ProbeError> {
    image
        .parse::<Reference>()
        .map_err(|e| ProbeError::InvalidReference {
            image: image.to_string(),
            reason: e.to_string(),
        })
}

/// ARM64 probe backed by a registry transport and a credential chain
pub struct RegistryProbe {
    transport: Arc<dyn RegistryTransport>,
    credentials: Arc<dyn CredentialResolver>,
}

impl RegistryProbe {
    pub fn new(
        transport: Arc<dyn RegistryTransport>,
        credentials: Arc<dyn CredentialResolver>,
    ) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    async fn config_supports(
        &self,
        image: &str,
        reference: &Reference,
        digest: &str,
    ) -> Result<bool, ProbeError> {
        let blob = self
            .transport
            .fetch_blob(reference, digest)
            .await
            .map_err(|e| {
                if e.is_rate_limited() {
                    ProbeError::from_transport(image, e)
                } else {
                    ProbeError::ConfigRead {
                        image: image.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let config = manifest::parse_config(&blob).map_err(|reason| ProbeError::ConfigRead {
            image: image.to_string(),
            reason,
        })?;

        debug!(image = %image, architecture = %config.architecture, "Read image config");
        Ok(config.architecture == ARM64)
    }
}

#[async_trait]
impl ImageProbe for RegistryProbe {
    async fn probe(&self, image: &str) -> Result<bool, ProbeError> {
        let reference = parse_reference(image)?;

        let auth = self.credentials.resolve(&reference).await.map_err(|e| {
            ProbeError::from_transport(
                image,
                TransportError::new(FetchErrorKind::Unauthorized, e.to_string()),
            )
        })?;

        let body = self
            .transport
            .fetch_manifest(&reference, &auth)
            .await
            .map_err(|e| ProbeError::from_transport(image, e))?;

        let descriptor = manifest::parse_descriptor(&body).map_err(|e| match e {
            DescriptorError::Unrecognized(reason) => ProbeError::Fetch {
                image: image.to_string(),
                source: TransportError::new(FetchErrorKind::Malformed, reason),
            },
            DescriptorError::Index(reason) => ProbeError::IndexRead {
                image: image.to_string(),
                reason,
            },
            DescriptorError::Image(reason) => ProbeError::ConfigRead {
                image: image.to_string(),
                reason,
            },
        })?;

        match descriptor {
            Descriptor::Index(index) => Ok(index.supports(ARM64)),
            Descriptor::Legacy(legacy) => Ok(legacy.architecture == ARM64),
            Descriptor::Image(manifest) => {
                self.config_supports(image, &reference, &manifest.config.digest)
                    .await
            }
        }
    }
}
