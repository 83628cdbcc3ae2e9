//! Manifest documents as served by OCI and Docker registries
//!
//! Only the fields needed to classify platform support are decoded;
//! everything else in the documents is ignored.

use serde::Deserialize;
use serde_json::Value;

pub const OCI_IMAGE_INDEX: &str = "application/vnd.oci.image.index.v1+json";
pub const DOCKER_MANIFEST_LIST: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
pub const OCI_IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const DOCKER_MANIFEST_V1: &str = "application/vnd.docker.distribution.manifest.v1+json";
pub const DOCKER_MANIFEST_V1_SIGNED: &str =
    "application/vnd.docker.distribution.manifest.v1+prettyjws";

/// Media types sent in the `Accept` header of manifest requests
pub const ACCEPTED_MANIFEST_TYPES: &[&str] = &[
    OCI_IMAGE_INDEX,
    DOCKER_MANIFEST_LIST,
    OCI_IMAGE_MANIFEST,
    DOCKER_MANIFEST_V2,
    DOCKER_MANIFEST_V1_SIGNED,
    DOCKER_MANIFEST_V1,
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(default)]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    #[serde(default)]
    pub media_type: Option<String>,
    pub digest: String,
    #[serde(default)]
    pub platform: Option<Platform>,
}

/// OCI image index or Docker manifest list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageIndex {
    pub manifests: Vec<IndexEntry>,
}

impl ImageIndex {
    pub fn supports(&self, architecture: &str) -> bool {
        self.manifests.iter().any(|entry| {
            entry
                .platform
                .as_ref()
                .map(|p| p.architecture == architecture && p.os.eq_ignore_ascii_case("linux"))
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDescriptor {
    #[serde(default)]
    pub media_type: Option<String>,
    pub digest: String,
}

/// Single-platform OCI manifest or Docker v2 manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageManifest {
    pub config: ConfigDescriptor,
}

/// Docker schema 1 manifest, which names its architecture inline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LegacyManifest {
    pub architecture: String,
}

/// Image configuration blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    pub architecture: String,
    pub os: String,
}

/// Top-level descriptor of an image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Index(ImageIndex),
    Image(ImageManifest),
    Legacy(LegacyManifest),
}

/// Why a top-level descriptor could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// Not JSON, or a media type we do not understand
    Unrecognized(String),
    /// Recognized as an index but its entries did not decode
    Index(String),
    /// Recognized as a single-platform manifest but it did not decode
    Image(String),
}

fn is_index_type(media_type: &str) -> bool {
    media_type == OCI_IMAGE_INDEX || media_type == DOCKER_MANIFEST_LIST
}

fn is_image_type(media_type: &str) -> bool {
    media_type == OCI_IMAGE_MANIFEST || media_type == DOCKER_MANIFEST_V2
}

fn is_legacy_type(media_type: &str) -> bool {
    media_type == DOCKER_MANIFEST_V1 || media_type == DOCKER_MANIFEST_V1_SIGNED
}

/// Classify a manifest document by `mediaType`, falling back to its shape
///
/// Some registries omit `mediaType` on OCI documents; a `manifests` array
/// marks an index, a `config` object marks a single-platform manifest and
/// `schemaVersion: 1` marks a legacy manifest.
pub fn parse_descriptor(bytes: &[u8]) -> Result<Descriptor, DescriptorError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| DescriptorError::Unrecognized(format!("invalid manifest json: {}", e)))?;

    let media_type = value.get("mediaType").and_then(Value::as_str);
    let schema_version = value.get("schemaVersion").and_then(Value::as_u64);

    let treat_as_index = match media_type {
        Some(mt) => is_index_type(mt),
        None => value.get("manifests").is_some(),
    };
    if treat_as_index {
        return serde_json::from_value(value)
            .map(Descriptor::Index)
            .map_err(|e| DescriptorError::Index(e.to_string()));
    }

    let treat_as_legacy = match media_type {
        Some(mt) => is_legacy_type(mt),
        None => schema_version == Some(1),
    };
    if treat_as_legacy {
        return serde_json::from_value(value)
            .map(Descriptor::Legacy)
            .map_err(|e| DescriptorError::Image(e.to_string()));
    }

    let treat_as_image = match media_type {
        Some(mt) => is_image_type(mt),
        None => value.get("config").is_some(),
    };
    if treat_as_image {
        return serde_json::from_value(value)
            .map(Descriptor::Image)
            .map_err(|e| DescriptorError::Image(e.to_string()));
    }

    Err(DescriptorError::Unrecognized(format!(
        "unsupported manifest media type {}",
        media_type.unwrap_or("<none>")
    )))
}

/// Decode an image config; it must be an object naming its architecture
pub fn parse_config(bytes: &[u8]) -> Result<ImageConfig, String> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| format!("invalid config json: {}", e))?;
    let object = value
        .as_object()
        .ok_or_else(|| "image config is not a json object".to_string())?;

    let architecture = match object.get("architecture").and_then(Value::as_str) {
        Some(arch) if !arch.is_empty() => arch.to_string(),
        _ => return Err("image config has no architecture".to_string()),
    };
    let os = object
        .get("os")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(ImageConfig { architecture, os })
}
