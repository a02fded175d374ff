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

//! Structured logging for the LedgerGit client
//!
//! All crates log through the `tracing` facade with structured fields
//! (`oid`, `branch`, `batch`, ...). Binaries and tests that want to see
//! those events install a subscriber once with [`init_tracing`] or
//! [`init_tracing_with_config`].
//!
//! # Features
//!
//! - **Multiple Output Formats**: Pretty, JSON, and compact output formats
//! - **Environment-based Filtering**: Dynamic log level control via `RUST_LOG`
//! - **Config Integration**: [`LogConfig::from_settings`] reads the
//!   `[observability]` section of the client config
//!
//! # Example
//!
//! ```no_run
//! use ledgergit_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Pretty, None).unwrap();
//! tracing::info!("Client started");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{init_tracing, init_tracing_with_config};
