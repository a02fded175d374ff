// LedgerGit - Git objects on a remote ledger
// Copyright (C) 2025 LedgerGit Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Configuration schema
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration.

use crate::error::{ConfigError, ConfigResult};
use crate::loader::ConfigLoader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory, relative to a working root, holding the config file
pub const CONFIG_DIR: &str = ".ledgergit";

/// Config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// Branch protection and proposal settings
    #[serde(default)]
    pub governance: GovernanceConfig,

    /// Object deploy batching and pacing
    #[serde(default)]
    pub writer: WriterConfig,

    /// Polling for eventually consistent reads
    #[serde(default)]
    pub consistency: ConsistencyConfig,

    /// Commit identity settings
    #[serde(default)]
    pub author: AuthorConfig,

    /// External content store
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Path of the config file under `root`
    pub fn path_in(root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load config from a working root, falling back to defaults
    pub async fn load(root: impl AsRef<Path>) -> ConfigResult<Self> {
        let config_path = Self::path_in(root);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        ConfigLoader::new().load_file(&config_path).await
    }

    /// Save config under a working root
    pub fn save(&self, root: impl AsRef<Path>) -> ConfigResult<()> {
        let config_path = Self::path_in(root);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        std::fs::write(&config_path, toml_str)?;
        Ok(())
    }

    /// Check if `branch` is the governed branch
    pub fn is_protected(&self, branch: &str) -> bool {
        self.governance.protected_branch == branch
    }
}

/// Branch governance settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GovernanceConfig {
    /// The one branch whose updates go through a proposal
    #[serde(default = "default_protected_branch")]
    pub protected_branch: String,

    /// Locker tokens (free plus locked) required to open a proposal
    #[serde(default = "default_min_proposal_balance")]
    pub min_proposal_balance: u64,
}

/// Object writer settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriterConfig {
    /// Blobs deployed concurrently per batch
    #[serde(default = "default_blob_batch_size")]
    pub blob_batch_size: usize,

    /// Trees deployed concurrently per batch
    #[serde(default = "default_tree_batch_size")]
    pub tree_batch_size: usize,

    /// Address lookups issued concurrently per batch
    #[serde(default = "default_address_batch_size")]
    pub address_batch_size: usize,

    /// Pause between batches (in milliseconds)
    #[serde(default = "default_pacing_interval_ms")]
    pub pacing_interval_ms: u64,

    /// Largest compressed blob stored inline on the ledger (in bytes)
    #[serde(default = "default_max_onchain_file_size")]
    pub max_onchain_file_size: usize,
}

impl WriterConfig {
    /// Pause between batches
    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }
}

/// Consistency polling settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsistencyConfig {
    /// First delay between checks (in milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Longest delay between checks (in milliseconds)
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Multiplier applied to the delay after each miss
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Deadline for a single wait (in milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ConsistencyConfig {
    /// First delay between checks
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Longest delay between checks
    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    /// Deadline for a single wait
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Commit identity settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorConfig {
    /// Email domain used in `name <name@domain>` identity lines
    #[serde(default = "default_author_domain")]
    pub domain: String,
}

/// External content store backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "backend")]
pub enum StorageConfig {
    /// Process-local memory, lost on exit
    #[serde(rename = "memory")]
    #[default]
    Memory,

    /// Content-addressed files under a directory
    #[serde(rename = "local")]
    Local(LocalStorage),
}

/// Local directory content store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalStorage {
    /// Base directory path
    pub base_path: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_protected_branch() -> String {
    "main".to_string()
}

fn default_min_proposal_balance() -> u64 {
    20
}

fn default_blob_batch_size() -> usize {
    10
}

fn default_tree_batch_size() -> usize {
    30
}

fn default_address_batch_size() -> usize {
    30
}

fn default_pacing_interval_ms() -> u64 {
    300
}

fn default_max_onchain_file_size() -> usize {
    15360
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_max_interval_ms() -> u64 {
    6000
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_timeout_ms() -> u64 {
    120_000
}

fn default_author_domain() -> String {
    "gosh.sh".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        GovernanceConfig {
            protected_branch: default_protected_branch(),
            min_proposal_balance: default_min_proposal_balance(),
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            blob_batch_size: default_blob_batch_size(),
            tree_batch_size: default_tree_batch_size(),
            address_batch_size: default_address_batch_size(),
            pacing_interval_ms: default_pacing_interval_ms(),
            max_onchain_file_size: default_max_onchain_file_size(),
        }
    }
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        ConsistencyConfig {
            poll_interval_ms: default_poll_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            backoff_factor: default_backoff_factor(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for AuthorConfig {
    fn default() -> Self {
        AuthorConfig {
            domain: default_author_domain(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        ObservabilityConfig {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.governance.protected_branch, "main");
        assert_eq!(config.governance.min_proposal_balance, 20);
        assert_eq!(config.writer.blob_batch_size, 10);
        assert_eq!(config.writer.tree_batch_size, 30);
        assert_eq!(config.writer.max_onchain_file_size, 15360);
        assert_eq!(config.consistency.poll_interval(), Duration::from_millis(1500));
        assert_eq!(config.author.domain, "gosh.sh");
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_is_protected() {
        let mut config = Config::default();
        assert!(config.is_protected("main"));
        assert!(!config.is_protected("feature"));
        config.governance.protected_branch = "release".to_string();
        assert!(config.is_protected("release"));
        assert!(!config.is_protected("main"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.writer.pacing_interval_ms = 50;
        config.storage = StorageConfig::Local(LocalStorage {
            base_path: "/tmp/blobs".to_string(),
        });
        config.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_missing_falls_back_to_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let loaded = Config::load(dir.path()).await.unwrap();
        assert_eq!(loaded, Config::default());
    }
}
