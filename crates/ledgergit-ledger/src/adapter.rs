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

//! The remote ledger seam
//!
//! Everything the client does remotely goes through the three calls of
//! [`RemoteLedgerAdapter`]. Method names live in [`crate::methods`] and the
//! outputs are turned into typed records by the pure functions in
//! [`crate::decode`], so adapters never need per-entity bindings.

use crate::LedgerResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Debug};

/// Address of an account on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap an address string
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key pair used to sign state-changing calls
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    /// Public key, hex encoded
    pub public: String,
    /// Secret key, hex encoded
    pub secret: String,
}

impl Signer {
    /// Create a signer from a key pair
    pub fn new(public: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            public: public.into(),
            secret: secret.into(),
        }
    }
}

impl Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("public", &self.public)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Lifecycle state of a ledger account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// No account at this address
    NonExist,
    /// Address funded but code not deployed yet
    Uninit,
    /// Deployed and callable
    Active,
    /// Frozen by the ledger
    Frozen,
}

impl AccountStatus {
    /// Check if the account is deployed and callable
    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

/// Acknowledgement of an accepted state-changing call
///
/// Acceptance is not visibility: the effect may show up in reads later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Ledger transaction id
    pub transaction: String,
}

/// Read/write primitive for the remote ledger
///
/// Implementations must be safe to share across concurrent batch calls.
#[async_trait]
pub trait RemoteLedgerAdapter: Send + Sync + Debug {
    /// Execute a read-only method locally against `target`'s state
    async fn run_local(&self, target: &Address, method: &str, args: Value) -> LedgerResult<Value>;

    /// Submit a state-changing method call on `target`, signed by `signer`
    async fn run(
        &self,
        target: &Address,
        method: &str,
        args: Value,
        signer: &Signer,
    ) -> LedgerResult<Ack>;

    /// Query the lifecycle state of an account
    async fn account_status(&self, address: &Address) -> LedgerResult<AccountStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _assert(_: &dyn RemoteLedgerAdapter) {}
    }

    #[test]
    fn test_signer_debug_redacts_secret() {
        let signer = Signer::new("pub", "very-secret");
        let debug = format!("{:?}", signer);
        assert!(debug.contains("pub"));
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn test_account_status_serde() {
        let status: AccountStatus = serde_json::from_str("\"active\"").unwrap();
        assert!(status.is_active());
        assert!(!AccountStatus::Uninit.is_active());
    }
}
