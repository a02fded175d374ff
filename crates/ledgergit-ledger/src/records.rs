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

//! Typed ledger records
//!
//! Entities are plain records tagged by [`EntityKind`]. They are produced
//! from raw call output by [`crate::decode`] and serialized back into call
//! arguments with serde, using the ledger's camelCase field names.

use crate::Address;
use ledgergit_versioning::{FileMode, Oid};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of addressable ledger entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A repository account
    Repository,
    /// A commit record
    Commit,
    /// A tree record
    Tree,
    /// A blob record
    Blob,
    /// A governance proposal
    Proposal,
    /// A voter's stake in a proposal
    Client,
}

impl EntityKind {
    /// Kind name used in address lookups
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Repository => "repository",
            EntityKind::Commit => "commit",
            EntityKind::Tree => "tree",
            EntityKind::Blob => "blob",
            EntityKind::Proposal => "proposal",
            EntityKind::Client => "client",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bit flags stored on every blob record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobFlags(u8);

impl BlobFlags {
    /// Content is binary rather than UTF-8 text
    pub const BINARY: BlobFlags = BlobFlags(1);
    /// Stored bytes are compressed
    pub const COMPRESSED: BlobFlags = BlobFlags(2);
    /// Stored bytes live in the external content store
    pub const EXTERNAL: BlobFlags = BlobFlags(4);

    /// No flags set
    pub fn empty() -> Self {
        BlobFlags(0)
    }

    /// Raw bits
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Check if all bits of `other` are set
    pub fn contains(&self, other: BlobFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the bits of `other`
    pub fn insert(&mut self, other: BlobFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for BlobFlags {
    type Output = BlobFlags;

    fn bitor(self, rhs: BlobFlags) -> BlobFlags {
        BlobFlags(self.0 | rhs.0)
    }
}

/// A named mutable pointer to a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Branch name
    pub name: String,
    /// Tip commit, [`Oid::ZERO`] when the branch has no commits
    pub commit: Oid,
    /// Ledger address of the tip commit record
    #[serde(default)]
    pub commit_address: Option<Address>,
}

impl Branch {
    /// Check if the branch has no commits yet
    pub fn is_empty(&self) -> bool {
        self.commit.is_zero()
    }
}

/// Commit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Commit hash
    pub name: Oid,
    /// Branch the commit was made on
    pub branch: String,
    /// Root tree hash
    pub tree: Oid,
    /// Parent commit hashes, target tip first
    pub parents: Vec<Oid>,
    /// Serialized commit text
    pub content: String,
    /// Addresses of the tree and blob records this commit introduced
    #[serde(default)]
    pub objects: Vec<Address>,
}

/// One entry of a tree record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// File mode
    pub mode: FileMode,
    /// Entry name
    pub name: String,
    /// Blob or subtree hash
    pub sha: Oid,
}

/// Tree record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRecord {
    /// Tree hash
    pub sha: Oid,
    /// Entries, in any order
    pub entries: Vec<TreeEntry>,
}

/// Blob record
///
/// Exactly one of `data` and `content_id` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRecord {
    /// Blob hash
    pub sha: Oid,
    /// Commit that introduced this blob
    pub commit: Oid,
    /// Full path of the file in that commit
    pub path: String,
    /// Storage flags
    pub flags: BlobFlags,
    /// Compressed content, hex encoded, when stored inline
    #[serde(default)]
    pub data: Option<String>,
    /// External content id, when offloaded
    #[serde(default)]
    pub content_id: Option<String>,
    /// Hash of the previous version of this file
    #[serde(default)]
    pub prev_sha: Option<Oid>,
}

/// Per-wallet voting token locker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockerRecord {
    /// Tokens held by the locker
    pub votes_total: u64,
    /// Tokens currently locked in votes
    pub votes_locked: u64,
    /// Set while a proposal opened by this wallet is unresolved
    pub is_busy: bool,
}

impl LockerRecord {
    /// Tokens free to vote with
    pub fn available(&self) -> u64 {
        self.votes_total.saturating_sub(self.votes_locked)
    }
}

/// Governance proposal to repoint a protected branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRecord {
    /// Proposal id
    pub id: String,
    /// Repository name
    pub repo: String,
    /// Target branch
    pub branch: String,
    /// Proposed new tip
    pub commit: Oid,
    /// Tip the proposal was made against
    pub prev_commit: Oid,
    /// Wallet that opened the proposal
    pub proposer: Address,
    /// Tokens voted yes
    pub votes_yes: u64,
    /// Tokens voted no
    pub votes_no: u64,
    /// Voting opens at this unix time
    pub start: i64,
    /// Voting closes at this unix time
    pub finish: i64,
    /// `None` while open, `Some(accepted)` once resolved
    #[serde(default)]
    pub is_completed: Option<bool>,
}

/// A voter's stake in one proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    /// Proposal address
    pub proposal: Address,
    /// Voter wallet address
    pub voter: Address,
    /// Tokens still locked against the proposal
    pub locked_amount: u64,
}

/// Lookup key of a proposal within a repository
pub fn proposal_key(repo: &str, branch: &str, commit: &Oid) -> String {
    format!("{}/{}/{}", repo, branch, commit)
}

/// Lookup key of a voter's stake in a proposal
pub fn client_key(proposal: &Address, voter: &Address) -> String {
    format!("{}/{}", proposal, voter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_flags() {
        let mut flags = BlobFlags::COMPRESSED;
        assert!(flags.contains(BlobFlags::COMPRESSED));
        assert!(!flags.contains(BlobFlags::EXTERNAL));
        flags.insert(BlobFlags::EXTERNAL);
        assert_eq!(flags.bits(), 6);
        assert_eq!((BlobFlags::BINARY | BlobFlags::COMPRESSED).bits(), 3);
        assert_eq!(BlobFlags::empty().bits(), 0);
    }

    #[test]
    fn test_locker_available() {
        let locker = LockerRecord {
            votes_total: 50,
            votes_locked: 20,
            is_busy: false,
        };
        assert_eq!(locker.available(), 30);
    }

    #[test]
    fn test_branch_wire_format() {
        let branch = Branch {
            name: "main".into(),
            commit: Oid::ZERO,
            commit_address: None,
        };
        let json = serde_json::to_value(&branch).unwrap();
        assert_eq!(json["commitAddress"], serde_json::Value::Null);
        assert!(branch.is_empty());
    }

    #[test]
    fn test_keys() {
        let commit = Oid::ZERO;
        assert_eq!(
            proposal_key("repo", "main", &commit),
            format!("repo/main/{}", "0".repeat(40))
        );
        assert_eq!(
            client_key(&Address::new("0:p"), &Address::new("0:v")),
            "0:p/0:v"
        );
    }
}
