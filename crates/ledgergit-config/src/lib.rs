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

//! Configuration for the LedgerGit client
//!
//! Settings cover the protected branch, object deploy batching and pacing,
//! consistency polling, commit identity, the external content store, and
//! logging.
//!
//! # Features
//!
//! - TOML, YAML and JSON files, detected by extension
//! - Environment variable overrides with the `LEDGERGIT_` prefix
//! - Per-section validation with field-level error messages
//!
//! # Example
//!
//! ```no_run
//! use ledgergit_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = ConfigLoader::new();
//!     let config = loader.load_with_overrides("ledgergit.toml").await?;
//!
//!     println!("Protected branch: {}", config.governance.protected_branch);
//!     println!("Poll every {:?}", config.consistency.poll_interval());
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

// Re-export commonly used items
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader, ENV_PREFIX};
pub use schema::*;
pub use validation::Validator;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("protected_branch = \"main\""));
        assert!(toml.contains("backend = \"memory\""));
    }
}
