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

//! In-memory content store
//!
//! Thread-safe store backed by `Arc<RwLock<HashMap>>`, used by tests and
//! by sessions that do not need durable external storage.

use crate::{ContentId, ContentStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory content store
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryContentStore {
    store: Arc<RwLock<HashMap<ContentId, Vec<u8>>>>,
}

impl MemoryContentStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payloads
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// All stored ids
    pub async fn ids(&self) -> Vec<ContentId> {
        self.store.read().await.keys().cloned().collect()
    }
}

impl fmt::Debug for MemoryContentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryContentStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn save(&self, data: &[u8]) -> StorageResult<ContentId> {
        let id = ContentId::for_content("mem", data);
        let mut store = self.store.write().await;
        store.entry(id.clone()).or_insert_with(|| data.to_vec());
        debug!(id = %id, size = data.len(), "Saved content");
        Ok(id)
    }

    async fn load(&self, id: &ContentId) -> StorageResult<Vec<u8>> {
        self.store
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(id.as_str()))
    }

    async fn exists(&self, id: &ContentId) -> StorageResult<bool> {
        Ok(self.store.read().await.contains_key(id))
    }
}
