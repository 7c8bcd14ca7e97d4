//! Layered configuration.
//!
//! Sources, later ones win:
//! - built-in defaults
//! - a TOML file (`semsearch.toml` unless another path is given)
//! - environment variables prefixed with `SEMSEARCH_`, with `__` separating
//!   nested keys: `SEMSEARCH_SERVER__ADDR=0.0.0.0:8080` sets `server.addr`
//!
//! Command-line flags are applied on top by the binary.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::distance::DistanceMetric;
use crate::error::{Result, SearchError};
use crate::persistence::ArtifactPaths;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "semsearch.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Metric the loaded index must use. Unset accepts whatever the artifact records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<DistanceMetric>,

    /// Result count when a caller does not pass `k`.
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Probe count override for partitioned indexes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nprobe: Option<usize>,

    /// Dimension of the built-in hashing embedder.
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    #[serde(default)]
    pub artifacts: ArtifactPaths,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Cluster count for partitioned builds; unset picks sqrt(n).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clusters: Option<usize>,

    #[serde(default = "default_kmeans_iterations")]
    pub kmeans_iterations: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_k() -> usize {
    5
}

fn default_embedding_dimension() -> usize {
    384
}

fn default_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_kmeans_iterations() -> usize {
    25
}

fn default_seed() -> u64 {
    42
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            metric: None,
            default_k: default_k(),
            nprobe: None,
            embedding_dimension: default_embedding_dimension(),
            artifacts: ArtifactPaths::default(),
            server: ServerConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            clusters: None,
            kmeans_iterations: default_kmeans_iterations(),
            seed: default_seed(),
        }
    }
}

impl Settings {
    /// Load from defaults, the config file, and the environment.
    ///
    /// A missing config file is not an error; a malformed one is.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Self::from_figment(
            Figment::new()
                .merge(Serialized::defaults(Settings::default()))
                .merge(Toml::file(path))
                .merge(Env::prefixed("SEMSEARCH_").split("__")),
        )
    }

    /// Extract and validate settings from an assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| SearchError::ConfigError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_k == 0 {
            return Err(SearchError::ConfigError(
                "default_k must be a positive integer".to_string(),
            ));
        }
        if self.nprobe == Some(0) {
            return Err(SearchError::ConfigError(
                "nprobe must be a positive integer".to_string(),
            ));
        }
        if self.embedding_dimension == 0 {
            return Err(SearchError::ConfigError(
                "embedding_dimension must be a positive integer".to_string(),
            ));
        }
        if self.build.clusters == Some(0) {
            return Err(SearchError::ConfigError(
                "build.clusters must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}
