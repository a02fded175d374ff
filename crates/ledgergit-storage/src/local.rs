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

//! Local directory content store
//!
//! Payloads are stored under a sharded layout keyed by their sha256:
//! ```text
//! root/
//!   ab/
//!     cd/
//!       abcd1234...
//! ```
//! Writes go to a temp file first and are renamed into place, so a crashed
//! write never leaves a truncated payload under a valid id.

use crate::{ContentId, ContentStore, StorageError, StorageResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Id scheme used by this store
const SCHEME: &str = "local";

/// Content store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    /// Open (and create if needed) a store at `root`
    pub async fn new<P: AsRef<Path>>(root: P) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        if fs::try_exists(&root).await? {
            if !fs::metadata(&root).await?.is_dir() {
                return Err(StorageError::backend(format!(
                    "path exists but is not a directory: {}",
                    root.display()
                )));
            }
        } else {
            fs::create_dir_all(&root).await?;
        }
        Ok(Self { root })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn payload_path(&self, id: &ContentId) -> StorageResult<PathBuf> {
        let digest = match id.as_str().split_once('-') {
            Some((SCHEME, _)) => id.digest_hex(),
            _ => None,
        }
        .ok_or_else(|| StorageError::invalid_id(id.as_str()))?;
        Ok(self.root.join(&digest[0..2]).join(&digest[2..4]).join(digest))
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn save(&self, data: &[u8]) -> StorageResult<ContentId> {
        let id = ContentId::for_content(SCHEME, data);
        let path = self.payload_path(&id)?;
        if fs::try_exists(&path).await? {
            return Ok(id);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("tmp");
        let _ = fs::remove_file(&temp_path).await;
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &path).await?;

        debug!(id = %id, size = data.len(), "Saved content to disk");
        Ok(id)
    }

    async fn load(&self, id: &ContentId) -> StorageResult<Vec<u8>> {
        let path = self.payload_path(id)?;
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(id.as_str()))
            }
            Err(e) => return Err(e.into()),
        };

        let actual = hex::encode(Sha256::digest(&data));
        if Some(actual.as_str()) != id.digest_hex() {
            return Err(StorageError::Corrupted(id.to_string()));
        }
        Ok(data)
    }

    async fn exists(&self, id: &ContentId) -> StorageResult<bool> {
        let path = self.payload_path(id)?;
        Ok(fs::try_exists(&path).await?)
    }
}
