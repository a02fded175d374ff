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

//! Configuration validation

use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Validator for configuration settings
pub trait Validator {
    /// Check the section, returning the first problem found
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        self.governance.validate()?;
        self.writer.validate()?;
        self.consistency.validate()?;
        self.author.validate()?;
        self.storage.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

impl Validator for GovernanceConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.protected_branch.trim().is_empty() {
            return Err(ConfigError::MissingRequired(
                "governance.protected_branch".to_string(),
            ));
        }

        if self.protected_branch.contains(char::is_whitespace) {
            return Err(ConfigError::invalid_value(
                "governance.protected_branch",
                "branch names cannot contain whitespace",
            ));
        }

        Ok(())
    }
}

impl Validator for WriterConfig {
    fn validate(&self) -> ConfigResult<()> {
        let batches = [
            ("writer.blob_batch_size", self.blob_batch_size),
            ("writer.tree_batch_size", self.tree_batch_size),
            ("writer.address_batch_size", self.address_batch_size),
        ];
        for (field, size) in batches {
            if size == 0 {
                return Err(ConfigError::invalid_value(field, "batch size must be at least 1"));
            }
        }

        if self.max_onchain_file_size == 0 {
            return Err(ConfigError::invalid_value(
                "writer.max_onchain_file_size",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validator for ConsistencyConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::invalid_value(
                "consistency.poll_interval_ms",
                "must be greater than 0",
            ));
        }

        if self.max_interval_ms < self.poll_interval_ms {
            return Err(ConfigError::validation_error(format!(
                "consistency.max_interval_ms ({}) must be at least poll_interval_ms ({})",
                self.max_interval_ms, self.poll_interval_ms
            )));
        }

        if self.timeout_ms < self.poll_interval_ms {
            return Err(ConfigError::validation_error(format!(
                "consistency.timeout_ms ({}) must be at least poll_interval_ms ({})",
                self.timeout_ms, self.poll_interval_ms
            )));
        }

        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(ConfigError::invalid_value(
                "consistency.backoff_factor",
                format!("must be a finite number >= 1.0, got {}", self.backoff_factor),
            ));
        }

        Ok(())
    }
}

impl Validator for AuthorConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.domain.is_empty() {
            return Err(ConfigError::MissingRequired("author.domain".to_string()));
        }

        if self.domain.contains(['@', '<', '>', ' ']) {
            return Err(ConfigError::invalid_value(
                "author.domain",
                format!("not a bare domain: {}", self.domain),
            ));
        }

        Ok(())
    }
}

impl Validator for StorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            StorageConfig::Memory => Ok(()),
            StorageConfig::Local(local) => {
                if local.base_path.is_empty() {
                    return Err(ConfigError::MissingRequired(
                        "storage.base_path".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl Validator for ObservabilityConfig {
    fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        Ok(())
    }
}
