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

//! External content store for oversized blobs
//!
//! Ledger records have a hard size limit. Blob content whose compressed
//! form exceeds it is written to a [`ContentStore`] instead, and only the
//! returned [`ContentId`] is recorded on the ledger.
//!
//! # Implementing a store
//!
//! 1. Use `#[async_trait]` on your impl block
//! 2. `save` must be idempotent: saving identical bytes twice yields the
//!    same id and must not fail
//! 3. `load` returns [`StorageError::NotFound`] for unknown ids
//!
//! ```rust
//! use ledgergit_storage::{ContentStore, MemoryContentStore};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let store = MemoryContentStore::new();
//! let id = store.save(b"large payload").await?;
//! assert_eq!(store.load(&id).await?, b"large payload");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod local;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Debug};

pub use error::{StorageError, StorageResult};
pub use local::LocalContentStore;
pub use memory::MemoryContentStore;

/// Identifier returned by a content store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap an id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an id from content with the given scheme prefix
    ///
    /// The id is `{scheme}-{sha256 hex}`, so identical bytes share an id.
    pub fn for_content(scheme: &str, data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(format!("{}-{}", scheme, hex::encode(digest)))
    }

    /// The id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The sha256 hex part of a derived id, if it has one
    pub fn digest_hex(&self) -> Option<&str> {
        self.0
            .split_once('-')
            .map(|(_, digest)| digest)
            .filter(|d| d.len() == 64 && d.chars().all(|c| c.is_ascii_hexdigit()))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content store collaborator
///
/// Stores opaque (already compressed) byte payloads and hands back an id
/// that is small enough to live on the ledger.
#[async_trait]
pub trait ContentStore: Send + Sync + Debug {
    /// Persist bytes and return their id
    async fn save(&self, data: &[u8]) -> StorageResult<ContentId>;

    /// Fetch bytes by id
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when the id is unknown.
    async fn load(&self, id: &ContentId) -> StorageResult<Vec<u8>>;

    /// Check whether an id is present
    async fn exists(&self, id: &ContentId) -> StorageResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _assert(_: &dyn ContentStore) {}
    }

    #[test]
    fn test_content_id_is_content_addressed() {
        let a = ContentId::for_content("mem", b"data");
        let b = ContentId::for_content("mem", b"data");
        let c = ContentId::for_content("mem", b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("mem-"));
        assert_eq!(a.digest_hex().map(str::len), Some(64));
    }

    #[test]
    fn test_content_id_without_digest() {
        assert_eq!(ContentId::new("QmSomething").digest_hex(), None);
    }

    #[test]
    fn test_content_id_serde_transparent() {
        let id = ContentId::new("cid");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"cid\"");
    }
}
