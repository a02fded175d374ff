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

//! Ledger error types

use std::time::Duration;
use thiserror::Error;

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors raised by a [`RemoteLedgerAdapter`](crate::RemoteLedgerAdapter)
/// or while decoding its output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The call could not be delivered or its result was lost
    #[error("ledger call {method} failed: {reason}")]
    Transport {
        /// Method that was being called
        method: String,
        /// Transport-level reason
        reason: String,
    },

    /// The ledger executed the call and refused it
    #[error("ledger rejected {method} (exit code {code}): {reason}")]
    Rejected {
        /// Method that was rejected
        method: String,
        /// Contract exit code
        code: i32,
        /// Human-readable reason
        reason: String,
    },

    /// The target account does not exist or is not active
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Output did not match the expected entity shape
    #[error("failed to decode {entity}: {reason}")]
    Decode {
        /// Entity being decoded
        entity: &'static str,
        /// Decoder message
        reason: String,
    },
}

impl LedgerError {
    /// Create a transport error
    pub fn transport<M: Into<String>, R: Into<String>>(method: M, reason: R) -> Self {
        LedgerError::Transport {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Create a rejection error
    pub fn rejected<M: Into<String>, R: Into<String>>(method: M, code: i32, reason: R) -> Self {
        LedgerError::Rejected {
            method: method.into(),
            code,
            reason: reason.into(),
        }
    }

    /// Create a decode error
    pub fn decode<R: ToString>(entity: &'static str, reason: R) -> Self {
        LedgerError::Decode {
            entity,
            reason: reason.to_string(),
        }
    }

    /// Check if the ledger refused the call
    pub fn is_rejected(&self) -> bool {
        matches!(self, LedgerError::Rejected { .. })
    }
}

/// Errors from a bounded poll
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// The awaited condition did not hold before the deadline
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout {
        /// What was being awaited
        what: String,
        /// How long the poll ran
        waited: Duration,
    },

    /// A check call failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
