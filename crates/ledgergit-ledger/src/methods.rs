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

//! Method names and argument shapes understood by the ledger contracts
//!
//! Reads go through [`RemoteLedgerAdapter::run_local`](crate::RemoteLedgerAdapter::run_local),
//! writes through [`RemoteLedgerAdapter::run`](crate::RemoteLedgerAdapter::run)
//! on the caller's wallet. Arguments are the serde structs below, encoded
//! with [`to_args`].

use crate::records::{BlobRecord, CommitRecord, EntityKind, TreeRecord};
use crate::{Address, LedgerError, LedgerResult};
use ledgergit_versioning::Oid;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root: resolve `{ scope, kind, name }` to `{ address }`
pub const GET_ADDRESS: &str = "getAddress";

/// Any entity account: return its record
pub const GET_DETAILS: &str = "getDetails";

/// Repository: `{ name }` -> branch or null
pub const GET_BRANCH: &str = "getBranch";

/// Repository: all branches
pub const GET_BRANCHES: &str = "getAllAddress";

/// Wallet: voting token locker state
pub const GET_LOCKER: &str = "getLocker";

/// Wallet: create a branch at another branch's tip
pub const DEPLOY_BRANCH: &str = "deployBranch";

/// Wallet: delete an unprotected branch
pub const DELETE_BRANCH: &str = "deleteBranch";

/// Wallet: deploy a commit record
pub const DEPLOY_COMMIT: &str = "deployCommit";

/// Wallet: deploy a tree record
pub const DEPLOY_TREE: &str = "deployTree";

/// Wallet: deploy a blob record
pub const DEPLOY_BLOB: &str = "deployBlob";

/// Wallet: attach resolved object addresses to a commit
pub const SET_COMMIT_OBJECTS: &str = "setCommitObjects";

/// Wallet: repoint an unprotected branch
pub const SET_COMMIT: &str = "setCommit";

/// Wallet: open a proposal to repoint a protected branch
pub const START_PROPOSAL: &str = "startProposalForSetCommit";

/// Wallet: vote on a proposal, locking tokens
pub const VOTE: &str = "voteFor";

/// Wallet: ask the ledger to evaluate a proposal
pub const TRY_PROPOSAL_RESULT: &str = "tryProposalResult";

/// Wallet: return tokens locked in a completed proposal
pub const RELEASE_LOCKED: &str = "releaseLocked";

/// Wallet: move tokens from the wallet into the locker
pub const LOCK_VOTING: &str = "lockVoting";

/// Wallet: move free tokens from the locker back to the wallet
pub const UNLOCK_VOTING: &str = "unlockVoting";

/// Encode call arguments
pub fn to_args<T: Serialize>(method: &str, args: &T) -> LedgerResult<Value> {
    serde_json::to_value(args).map_err(|e| LedgerError::transport(method, e.to_string()))
}

/// Decode call arguments on the ledger side
pub fn from_args<T: for<'de> Deserialize<'de>>(method: &str, args: Value) -> LedgerResult<T> {
    serde_json::from_value(args)
        .map_err(|e| LedgerError::rejected(method, 40, format!("bad arguments: {}", e)))
}

/// `getAddress` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAddress {
    /// Entity kind
    pub kind: EntityKind,
    /// Scope the name is unique in, usually the repository name
    pub scope: String,
    /// Entity name or key
    pub name: String,
}

/// `getBranch` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBranch {
    /// Branch name
    pub name: String,
}

/// `deployBranch` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployBranch {
    /// Repository name
    pub repo: String,
    /// New branch name
    pub name: String,
    /// Branch whose tip the new branch starts at
    pub from: String,
}

/// `deleteBranch` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBranch {
    /// Repository name
    pub repo: String,
    /// Branch to delete
    pub name: String,
}

/// `deployCommit` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployCommit {
    /// Repository name
    pub repo: String,
    /// Commit record
    pub commit: CommitRecord,
}

/// `deployTree` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployTree {
    /// Repository name
    pub repo: String,
    /// Tree record
    pub tree: TreeRecord,
}

/// `deployBlob` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployBlob {
    /// Repository name
    pub repo: String,
    /// Blob record
    pub blob: BlobRecord,
}

/// `setCommitObjects` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCommitObjects {
    /// Repository name
    pub repo: String,
    /// Commit hash
    pub commit: Oid,
    /// Addresses of the objects the commit introduced
    pub objects: Vec<Address>,
}

/// `setCommit` and `startProposalForSetCommit` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCommit {
    /// Repository name
    pub repo: String,
    /// Branch to repoint
    pub branch: String,
    /// New tip
    pub commit: Oid,
    /// Tip the change was computed against
    pub prev_commit: Oid,
    /// Number of blobs the commit introduced
    pub num_blobs: usize,
}

/// `voteFor` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteFor {
    /// Proposal address
    pub proposal: Address,
    /// `true` to accept
    pub choice: bool,
    /// Tokens to lock behind the vote
    pub amount: u64,
}

/// `tryProposalResult` and `releaseLocked` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRef {
    /// Proposal address
    pub proposal: Address,
}

/// `lockVoting` and `unlockVoting` arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Token amount
    pub amount: u64,
}
