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

//! Client error taxonomy
//!
//! Every failed operation surfaces exactly one [`ClientError`]. Precondition
//! and validation failures are detected before any ledger write, so they
//! never leave partial state behind.

use ledgergit_compression::CompressionError;
use ledgergit_ledger::{LedgerError, PollError};
use ledgergit_storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Missing session context or missing remote entity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// The session has no repository, or the ledger does not know it
    #[error("no repository selected")]
    NoRepo,

    /// Branch does not exist
    #[error("branch '{0}' does not exist")]
    NoBranch(String),

    /// The session has no wallet
    #[error("no wallet configured")]
    NoWallet,

    /// The session has no DAO
    #[error("no DAO configured")]
    NoDao,

    /// The session has no root address
    #[error("no root address configured")]
    NoRoot,

    /// Proposal does not exist
    #[error("proposal {0} does not exist")]
    NoProposal(String),
}

/// A request the ledger would refuse, detected client-side
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Voting window has not opened yet
    #[error("voting starts at {start}, now is {now}")]
    NoStartYet {
        /// Window start, unix seconds
        start: i64,
        /// Current time, unix seconds
        now: i64,
    },

    /// Voting window is over or the proposal is resolved
    #[error("voting is closed")]
    VotingClosed,

    /// The wallet's locker is held by an unresolved proposal
    #[error("locker is busy with an unresolved proposal")]
    LockerBusy,

    /// Not enough tokens
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Tokens required
        requested: u64,
        /// Tokens available
        available: u64,
    },

    /// Branch governance policy cannot be applied
    #[error("invalid branch policy: {0}")]
    InvalidBranchPolicy(String),

    /// Nothing to commit
    #[error("commit has no changes")]
    EmptyCommit,

    /// A changed path cannot be placed in the tree
    #[error("malformed path: {0}")]
    MalformedPath(String),

    /// Proposal has not completed yet
    #[error("proposal is still open")]
    ProposalOpen,

    /// Commit object cannot be formed
    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    /// Branch name is empty or contains whitespace
    #[error("invalid branch name: '{0}'")]
    InvalidBranchName(String),

    /// Branch to create already exists
    #[error("branch '{0}' already exists")]
    BranchExists(String),

    /// The protected branch cannot be deleted
    #[error("branch '{0}' is protected")]
    ProtectedBranch(String),
}

/// Taxonomy class of a [`ClientError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing context or entity
    Precondition,
    /// Rejected before any remote call
    Validation,
    /// Ledger or collaborator failure
    Remote,
    /// Expected state never became visible
    ConsistencyTimeout,
}

/// Error returned by every client operation
#[derive(Error, Debug)]
pub enum ClientError {
    /// Missing context or entity
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// Request failed client-side checks
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Ledger call failed
    #[error("remote call failed: {0}")]
    Remote(#[from] LedgerError),

    /// External content store failed
    #[error("content store failed: {0}")]
    Storage(#[from] StorageError),

    /// Compression collaborator failed
    #[error("compression failed: {0}")]
    Compression(#[from] CompressionError),

    /// A poll ran out of time
    #[error("timed out after {waited:?} waiting for {what}")]
    ConsistencyTimeout {
        /// Condition that was awaited
        what: String,
        /// Time spent polling
        waited: Duration,
    },
}

impl From<PollError> for ClientError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Timeout { what, waited } => ClientError::ConsistencyTimeout { what, waited },
            PollError::Ledger(err) => ClientError::Remote(err),
        }
    }
}

impl ClientError {
    /// Taxonomy class of this error
    ///
    /// Content store and compression failures count as remote: they are
    /// collaborator calls outside the client's control.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Precondition(_) => ErrorKind::Precondition,
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::Remote(_) | ClientError::Storage(_) | ClientError::Compression(_) => {
                ErrorKind::Remote
            }
            ClientError::ConsistencyTimeout { .. } => ErrorKind::ConsistencyTimeout,
        }
    }

    /// Whether re-invoking the whole operation may succeed
    ///
    /// Nothing is retried automatically; this only informs the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Precondition(_) | ClientError::Validation(_) => false,
            ClientError::Remote(err) => !err.is_rejected(),
            ClientError::Storage(err) => !err.is_not_found(),
            ClientError::Compression(_) => false,
            ClientError::ConsistencyTimeout { .. } => true,
        }
    }
}
