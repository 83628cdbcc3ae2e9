//! Configuration management for the CLI

use anyhow::{Context, Result};
use armshift_lib::{CoordinatorConfig, MarkerSet, RetryPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI configuration
///
/// Layered from built-in defaults, `~/.config/armshift/config.toml` and
/// `ARMSHIFT__`-prefixed environment variables (`__` separates nested keys).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry probe fan-out
    pub probe: CoordinatorConfig,
    /// Cluster write retry
    pub retry: RetryPolicy,
    /// Tolerations, selector and affinity managed by this tool
    pub markers: MarkerSet,
    /// Namespace used when `--namespace` is not given
    pub default_namespace: Option<String>,
    /// Output format used when `--format` is not given
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from the default file and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path().as_deref())
    }

    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ARMSHIFT")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("probe.insecure_registries"),
        );

        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("armshift").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(Some(&dir.path().join("missing.toml"))).unwrap();

        assert_eq!(config.probe.max_concurrent, 7);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.markers, MarkerSet::default());
        assert!(config.default_namespace.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_namespace = "shop"

[probe]
max_concurrent = 3
insecure_registries = ["registry.local:5000"]

[retry]
interval_ms = 250

[markers]
arm_preference_weight = 50
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.default_namespace.as_deref(), Some("shop"));
        assert_eq!(config.probe.max_concurrent, 3);
        assert_eq!(config.probe.rate_limit_jitter_ms, 800);
        assert_eq!(config.probe.insecure_registries, vec!["registry.local:5000"]);
        assert_eq!(config.retry.interval_ms, 250);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.markers.arm_preference_weight, 50);
        assert_eq!(config.markers.arm_toleration_key, "kubernetes.io/arch");
    }
}
