//! Pipeline configuration loaded from TOML.
//!
//! Every section is optional; omitted keys take their defaults. Validation
//! runs at load time so degenerate settings fail before any work starts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::augment::AugmentConfig;
use crate::cluster::PartitionConfig;
use crate::domain::{ConfigError, Result};
use crate::quality::{QualityGate, QualityResult, RuleRegistry, RuleSpec};
use crate::sandbox::SandboxConfig;

/// Environment variable that overrides `oracle.token`.
pub const ORACLE_TOKEN_ENV: &str = "SYNTHDB_ORACLE_TOKEN";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSection {
    #[serde(flatten)]
    pub partition: PartitionConfig,
    /// Enables incremental mode once the file exists.
    pub centroids_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySection {
    /// `None` selects the default rule set.
    pub rules: Option<Vec<RuleSpec>>,
}

/// HTTP code oracle endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub url: String,
    pub token: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            token: String::new(),
            max_retries: 3,
            retry_delay_ms: 2000,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workdir: PathBuf,
    pub cluster: ClusterSection,
    pub quality: QualitySection,
    pub sandbox: SandboxConfig,
    pub augment: AugmentConfig,
    pub oracle: OracleConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("./workdir"),
            cluster: ClusterSection::default(),
            quality: QualitySection::default(),
            sandbox: SandboxConfig::default(),
            augment: AugmentConfig::default(),
            oracle: OracleConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a config file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ORACLE_TOKEN_ENV) {
            if !token.is_empty() {
                self.oracle.token = token;
            }
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let checks: [(&'static str, bool); 6] = [
            ("cluster.max_cluster_size", self.cluster.partition.max_cluster_size >= 1),
            ("cluster.initial_k", self.cluster.partition.initial_k >= 1),
            ("augment.max_iterations", self.augment.max_iterations >= 1),
            ("augment.concurrency", self.augment.concurrency >= 1),
            ("sandbox.timeout_secs", self.sandbox.timeout_secs >= 1),
            ("oracle.request_timeout_secs", self.oracle.request_timeout_secs >= 1),
        ];
        match checks.iter().find(|(_, ok)| !ok) {
            Some((field, _)) => Err(ConfigError::InvalidValue {
                field: *field,
                reason: "must be at least 1".to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Build the quality gate this config describes.
    pub fn quality_gate(&self, registry: &RuleRegistry) -> QualityResult<QualityGate> {
        QualityGate::from_specs(registry, self.quality.rules.as_deref())
    }

    pub fn augment_log_dir(&self) -> PathBuf {
        self.workdir.join("augment_logs")
    }
}
