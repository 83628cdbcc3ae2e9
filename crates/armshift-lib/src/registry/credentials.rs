//! Registry credential chain
//!
//! Resolution order for a registry host: per-registry credential helper,
//! global credential store, static `auths` entry, anonymous.

use crate::error::CredentialError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use oci_client::secrets::RegistryAuth;
use oci_client::Reference;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

const DOCKER_HUB: &str = "docker.io";
const DOCKER_HUB_SERVER_URL: &str = "https://index.docker.io/v1/";
const DOCKER_HUB_ALIASES: &[&str] = &["docker.io", "index.docker.io", "registry-1.docker.io"];

/// Username credential helpers use for identity tokens
pub const IDENTITY_TOKEN_USER: &str = "<token>";

/// Resolves credentials for the registry hosting an image
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, reference: &Reference) -> Result<RegistryAuth, CredentialError>;
}

/// Always resolves to anonymous access
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousResolver;

#[async_trait]
impl CredentialResolver for AnonymousResolver {
    async fn resolve(&self, _reference: &Reference) -> Result<RegistryAuth, CredentialError> {
        Ok(RegistryAuth::Anonymous)
    }
}

/// One entry of the `auths` map
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthEntry {
    #[serde(default)]
    pub auth: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub identitytoken: Option<String>,
}

/// The subset of `~/.docker/config.json` used for registry auth
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerConfig {
    #[serde(default)]
    pub auths: HashMap<String, AuthEntry>,
    #[serde(default, rename = "credHelpers")]
    pub cred_helpers: HashMap<String, String>,
    #[serde(default, rename = "credsStore")]
    pub creds_store: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HelperResponse {
    username: String,
    secret: String,
}

/// Strip scheme and path from a server address and fold Docker Hub aliases
pub fn normalize_host(server: &str) -> String {
    let without_scheme = server
        .strip_prefix("https://")
        .or_else(|| server.strip_prefix("http://"))
        .unwrap_or(server);
    let host = without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_ascii_lowercase();

    if DOCKER_HUB_ALIASES.contains(&host.as_str()) {
        DOCKER_HUB.to_string()
    } else {
        host
    }
}

/// Server URL handed to credential helpers
fn helper_server_url(host: &str) -> String {
    if host == DOCKER_HUB {
        DOCKER_HUB_SERVER_URL.to_string()
    } else {
        host.to_string()
    }
}

/// Credential chain read from a Docker client config file
#[derive(Debug, Clone, Default)]
pub struct DockerConfigKeychain {
    config: DockerConfig,
    /// Directory searched for `docker-credential-*` binaries; `PATH` when unset
    helper_dir: Option<PathBuf>,
}

impl DockerConfigKeychain {
    pub fn new(config: DockerConfig) -> Self {
        Self {
            config,
            helper_dir: None,
        }
    }

    pub fn with_helper_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.helper_dir = Some(dir.into());
        self
    }

    /// `$DOCKER_CONFIG/config.json`, else `~/.docker/config.json`
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("DOCKER_CONFIG") {
            return Some(PathBuf::from(dir).join("config.json"));
        }
        dirs_next::home_dir().map(|home| home.join(".docker").join("config.json"))
    }

    /// Load the default config; a missing file yields an empty chain
    pub fn load_default() -> Result<Self, CredentialError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, CredentialError> {
        let content = std::fs::read_to_string(path).map_err(|e| CredentialError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = serde_json::from_str(&content).map_err(|e| CredentialError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(config))
    }

    fn helper_for(&self, host: &str) -> Option<&str> {
        self.config
            .cred_helpers
            .iter()
            .find(|(server, _)| normalize_host(server) == host)
            .map(|(_, helper)| helper.as_str())
    }

    fn auth_entry_for(&self, host: &str) -> Option<&AuthEntry> {
        self.config
            .auths
            .iter()
            .find(|(server, _)| normalize_host(server) == host)
            .map(|(_, entry)| entry)
    }

    /// Run `docker-credential-<helper> get`; `Ok(None)` when the helper has no entry
    async fn run_helper(
        &self,
        helper: &str,
        host: &str,
    ) -> Result<Option<RegistryAuth>, CredentialError> {
        let program = format!("docker-credential-{}", helper);
        let program = match &self.helper_dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        };
        let server = helper_server_url(host);
        let helper_error = |reason: String| CredentialError::Helper {
            helper: helper.to_string(),
            server: server.clone(),
            reason,
        };

        let mut child = Command::new(&program)
            .arg("get")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| helper_error(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(server.as_bytes())
                .await
                .map_err(|e| helper_error(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| helper_error(e.to_string()))?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            if stdout.contains("credentials not found") {
                debug!(helper = %helper, server = %server, "Credential helper has no entry");
                return Ok(None);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(helper_error(format!(
                "exited with {}: {}",
                output.status,
                if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() }
            )));
        }

        let response: HelperResponse =
            serde_json::from_str(stdout.trim()).map_err(|e| helper_error(e.to_string()))?;

        // Identity tokens arrive under the fixed username "<token>" and are passed on as-is
        Ok(Some(RegistryAuth::Basic(response.username, response.secret)))
    }

    fn static_auth(&self, host: &str) -> Result<Option<RegistryAuth>, CredentialError> {
        let Some(entry) = self.auth_entry_for(host) else {
            return Ok(None);
        };

        if let Some(encoded) = entry.auth.as_ref().filter(|a| !a.is_empty()) {
            let malformed = |reason: String| CredentialError::MalformedAuth {
                server: host.to_string(),
                reason,
            };
            let decoded = general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| malformed(e.to_string()))?;
            let decoded = String::from_utf8(decoded).map_err(|e| malformed(e.to_string()))?;
            let (user, password) = decoded
                .split_once(':')
                .ok_or_else(|| malformed("expected user:password".to_string()))?;
            return Ok(Some(RegistryAuth::Basic(
                user.to_string(),
                password.to_string(),
            )));
        }

        if let (Some(user), Some(password)) = (&entry.username, &entry.password) {
            return Ok(Some(RegistryAuth::Basic(user.clone(), password.clone())));
        }

        // An identity token alone is encoded the way credential helpers return it
        Ok(entry
            .identitytoken
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|token| RegistryAuth::Basic(IDENTITY_TOKEN_USER.to_string(), token.clone())))
    }
}

#[async_trait]
impl CredentialResolver for DockerConfigKeychain {
    async fn resolve(&self, reference: &Reference) -> Result<RegistryAuth, CredentialError> {
        let host = normalize_host(reference.registry());

        if let Some(helper) = self.helper_for(&host) {
            if let Some(auth) = self.run_helper(helper, &host).await? {
                return Ok(auth);
            }
        }

        if let Some(store) = self.config.creds_store.as_deref() {
            if let Some(auth) = self.run_helper(store, &host).await? {
                return Ok(auth);
            }
        }

        if let Some(auth) = self.static_auth(&host)? {
            return Ok(auth);
        }

        debug!(registry = %host, "No credentials configured, using anonymous access");
        Ok(RegistryAuth::Anonymous)
    }
}
