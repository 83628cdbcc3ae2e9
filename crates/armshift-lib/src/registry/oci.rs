//! Registry transport over the OCI distribution API

use super::manifest::ACCEPTED_MANIFEST_TYPES;
use super::RegistryTransport;
use crate::error::{FetchErrorKind, TransportError};
use async_trait::async_trait;
use oci_client::client::{ClientConfig, ClientProtocol};
use oci_client::errors::{OciDistributionError, OciErrorCode};
use oci_client::manifest::OciDescriptor;
use oci_client::secrets::RegistryAuth;
use oci_client::{Client, Reference};
use reqwest::header::ACCEPT;
use tracing::debug;

/// [`RegistryTransport`] backed by `oci_client`
///
/// `oci_client` decodes every 4xx body as a JSON error envelope, so a
/// rate-limit or not-found answer with a plain-text body loses its status.
/// Such failures are re-requested with `reqwest` to recover the status code.
#[derive(Clone)]
pub struct OciTransport {
    client: Client,
    http: reqwest::Client,
    protocol: ClientProtocol,
}

impl OciTransport {
    /// HTTPS everywhere except the listed `host[:port]` entries
    pub fn new(insecure_registries: &[String]) -> Self {
        let protocol = if insecure_registries.is_empty() {
            ClientProtocol::Https
        } else {
            ClientProtocol::HttpsExcept(insecure_registries.to_vec())
        };
        Self::with_protocol(protocol)
    }

    pub fn with_protocol(protocol: ClientProtocol) -> Self {
        let config = ClientConfig {
            protocol: protocol.clone(),
            ..Default::default()
        };
        Self {
            client: Client::new(config),
            http: reqwest::Client::new(),
            protocol,
        }
    }

    fn scheme(&self, registry: &str) -> &'static str {
        match &self.protocol {
            ClientProtocol::Http => "http",
            ClientProtocol::Https => "https",
            ClientProtocol::HttpsExcept(hosts) if hosts.iter().any(|h| h == registry) => "http",
            ClientProtocol::HttpsExcept(_) => "https",
        }
    }

    fn endpoint(&self, reference: &Reference, kind: &str, target: &str) -> String {
        let registry = reference.resolve_registry();
        format!(
            "{}://{}/v2/{}/{}/{}",
            self.scheme(registry),
            registry,
            reference.repository(),
            kind,
            target
        )
    }

    /// Keep a typed classification, or recover one from the HTTP status
    async fn classify(
        &self,
        err: OciDistributionError,
        url: &str,
        auth: Option<&RegistryAuth>,
    ) -> TransportError {
        let classified = classify_error(err);
        if classified.kind != FetchErrorKind::Other {
            return classified;
        }

        let mut request = self.http.get(url).header(ACCEPT, ACCEPTED_MANIFEST_TYPES.join(", "));
        if let Some(RegistryAuth::Basic(user, password)) = auth {
            request = request.basic_auth(user, Some(password));
        }
        match request.send().await {
            Ok(response) => match status_kind(response.status().as_u16()) {
                Some(kind) => {
                    debug!(url = %url, status = %response.status(), "Recovered registry status");
                    TransportError::new(kind, classified.message)
                }
                None => classified,
            },
            Err(_) => classified,
        }
    }
}

#[async_trait]
impl RegistryTransport for OciTransport {
    async fn fetch_manifest(
        &self,
        reference: &Reference,
        auth: &RegistryAuth,
    ) -> Result<Vec<u8>, TransportError> {
        match self
            .client
            .pull_manifest_raw(reference, auth, ACCEPTED_MANIFEST_TYPES)
            .await
        {
            Ok((body, _digest)) => Ok(body.to_vec()),
            Err(err) => {
                let target = reference
                    .digest()
                    .or_else(|| reference.tag())
                    .unwrap_or("latest");
                let url = self.endpoint(reference, "manifests", target);
                Err(self.classify(err, &url, Some(auth)).await)
            }
        }
    }

    async fn fetch_blob(
        &self,
        reference: &Reference,
        digest: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let descriptor = OciDescriptor {
            digest: digest.to_string(),
            ..Default::default()
        };
        let mut out = Vec::new();
        match self.client.pull_blob(reference, &descriptor, &mut out).await {
            Ok(()) => Ok(out),
            Err(err) => {
                let url = self.endpoint(reference, "blobs", digest);
                Err(self.classify(err, &url, None).await)
            }
        }
    }
}

fn status_kind(status: u16) -> Option<FetchErrorKind> {
    match status {
        429 => Some(FetchErrorKind::RateLimited),
        401 | 403 => Some(FetchErrorKind::Unauthorized),
        404 => Some(FetchErrorKind::NotFound),
        _ => None,
    }
}

/// Map a distribution error onto a typed fetch kind
pub(crate) fn classify_error(err: OciDistributionError) -> TransportError {
    let kind = match &err {
        OciDistributionError::RegistryError { envelope, .. } => {
            let codes: Vec<&OciErrorCode> = envelope.errors.iter().map(|e| &e.code).collect();
            if codes
                .iter()
                .any(|c| matches!(c, OciErrorCode::Toomanyrequests))
            {
                FetchErrorKind::RateLimited
            } else if codes
                .iter()
                .any(|c| matches!(c, OciErrorCode::Unauthorized | OciErrorCode::Denied))
            {
                FetchErrorKind::Unauthorized
            } else if codes.iter().any(|c| {
                matches!(
                    c,
                    OciErrorCode::ManifestUnknown
                        | OciErrorCode::BlobUnknown
                        | OciErrorCode::NameUnknown
                )
            }) {
                FetchErrorKind::NotFound
            } else {
                FetchErrorKind::Other
            }
        }
        OciDistributionError::ServerError { code, .. } => {
            status_kind(*code).unwrap_or(FetchErrorKind::Other)
        }
        OciDistributionError::UnauthorizedError { .. }
        | OciDistributionError::AuthenticationFailure(_) => FetchErrorKind::Unauthorized,
        OciDistributionError::ImageManifestNotFoundError(_) => FetchErrorKind::NotFound,
        OciDistributionError::RequestError(e) => match e.status() {
            Some(status) => status_kind(status.as_u16()).unwrap_or(FetchErrorKind::Other),
            None => FetchErrorKind::Network,
        },
        OciDistributionError::ManifestParsingError(_) => FetchErrorKind::Malformed,
        _ => FetchErrorKind::Other,
    };
    TransportError::new(kind, err.to_string())
}
