//! Configuration Module
//!
//! This module defines all configuration structures for the validator service.
//! Configuration is loaded from TOML files and parsed using serde.

use crate::validation::MatchingPolicy;
use serde::Deserialize;
use std::fs;

/// Main configuration structure
///
/// # Example TOML
/// ```toml
/// [validation]
/// matching = "set_based"
/// gas_per_signature_check = 3000
/// max_signatures_per_owner = 2
///
/// [api]
/// host = "127.0.0.1"
/// port = 8546
///
/// [logging]
/// level = "info"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub validation: ValidationConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Spend validation settings
///
/// # Fields
/// - `matching`: how signatures are paired with owners (`"set_based"` or `"positional"`)
/// - `gas_per_signature_check`: gas charged for every signature oracle call
/// - `max_signatures_per_owner`: the RPC refuses requests with more than
///   `owners * max_signatures_per_owner` signatures
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub matching: MatchingPolicy,
    #[serde(default = "default_gas_per_check")]
    pub gas_per_signature_check: u64,
    #[serde(default = "default_max_signatures_per_owner")]
    pub max_signatures_per_owner: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            matching: MatchingPolicy::default(),
            gas_per_signature_check: default_gas_per_check(),
            max_signatures_per_owner: default_max_signatures_per_owner(),
        }
    }
}

fn default_gas_per_check() -> u64 {
    3000
}

fn default_max_signatures_per_owner() -> usize {
    2
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// Log output settings
///
/// `level` is one of `trace`, `debug`, `info`, `warn`, `error`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> anyhow::Result<tracing::Level> {
        self.level
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown log level: {}", self.level))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
