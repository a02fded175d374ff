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

//! Object deployment and read-back
//!
//! Deploys are admission-controlled: objects go out in fixed-size batches,
//! every call in a batch runs concurrently, the batch is awaited as a whole
//! and the writer pauses for the pacing interval before the next one. The
//! first failed batch aborts the rest. Objects that did land are harmless
//! because redeploying a content-addressed object is a no-op.
//!
//! Blob content is compressed before it goes on the ledger. Compressed
//! content larger than `writer.max_onchain_file_size` is saved to the
//! [`ContentStore`](ledgergit_storage::ContentStore) and only its content id
//! is recorded.

use crate::error::ClientResult;
use crate::session::Session;
use futures::future::join_all;
use ledgergit_ledger::methods::{self, DeployBlob, DeployCommit, DeployTree};
use ledgergit_ledger::{
    decode, Address, BlobFlags, BlobRecord, CommitRecord, EntityKind, LedgerError, TreeEntry,
    TreeRecord,
};
use ledgergit_storage::ContentId;
use ledgergit_versioning::{hash_blob, join_path, FileMode, Oid, Tree, TreeItem};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Number of leading bytes inspected for binary detection
pub const BINARY_SNIFF_LEN: usize = 8000;

/// Content with a NUL byte near the start is treated as binary
pub fn is_binary(content: &[u8]) -> bool {
    content.iter().take(BINARY_SNIFF_LEN).any(|b| *b == 0)
}

/// Run `op` over `items` in batches of `batch_size`
///
/// Calls within a batch run concurrently and the whole batch is awaited
/// before its results are inspected. The first error stops the run; later
/// batches are never started. Results keep the input order.
pub async fn run_batched<T, R, F, Fut>(
    what: &str,
    items: Vec<T>,
    batch_size: usize,
    pacing: Duration,
    mut op: F,
) -> ClientResult<Vec<R>>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = ClientResult<R>>,
{
    let batch_size = batch_size.max(1);
    let batches = items.len().div_ceil(batch_size);
    let mut results = Vec::with_capacity(items.len());
    let mut items = items.into_iter();

    for batch in 0..batches {
        if batch > 0 && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
        let calls: Vec<Fut> = items.by_ref().take(batch_size).map(&mut op).collect();
        debug!(what, batch = batch + 1, of = batches, size = calls.len(), "Running batch");
        for result in join_all(calls).await {
            results.push(result?);
        }
    }
    Ok(results)
}

/// A git object and where it lives on the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Object kind
    pub kind: EntityKind,
    /// Object hash
    pub sha: Oid,
    /// Ledger address derived from `(kind, repo, sha)`
    pub address: Address,
    /// Whether the account was already active when resolved
    pub exists: bool,
}

/// Blob content waiting to be deployed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlob<'c> {
    /// Full path in the introducing commit
    pub path: String,
    /// Blob hash of `content`
    pub sha: Oid,
    /// Uncompressed content
    pub content: &'c [u8],
    /// Hash of the previous version of the file
    pub prev_sha: Option<Oid>,
}

/// Build the ledger record for a tree object
pub fn tree_record(sha: Oid, items: &[TreeItem]) -> TreeRecord {
    TreeRecord {
        sha,
        entries: items
            .iter()
            .map(|item| TreeEntry {
                mode: item.mode,
                name: item.name.clone(),
                sha: item.sha,
            })
            .collect(),
    }
}

/// Deploys and reads git objects for one session
#[derive(Debug, Clone, Copy)]
pub struct ObjectWriter<'a> {
    session: &'a Session,
}

impl<'a> ObjectWriter<'a> {
    /// Create a writer bound to `session`
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    fn pacing(&self) -> Duration {
        self.session.config().writer.pacing_interval()
    }

    /// Resolve the address of one object and whether it already exists
    pub async fn resolve_one(&self, kind: EntityKind, sha: Oid) -> ClientResult<ObjectRef> {
        let address = self.session.object_address(kind, &sha).await?;
        let exists = self.session.account_active(&address).await?;
        Ok(ObjectRef {
            kind,
            sha,
            address,
            exists,
        })
    }

    /// Resolve addresses of objects in paced batches
    pub async fn resolve(&self, kind: EntityKind, shas: Vec<Oid>) -> ClientResult<Vec<ObjectRef>> {
        let batch_size = self.session.config().writer.address_batch_size;
        run_batched("addresses", shas, batch_size, self.pacing(), |sha| {
            self.resolve_one(kind, sha)
        })
        .await
    }

    /// Deploy a commit record
    pub async fn deploy_commit(&self, commit: CommitRecord) -> ClientResult<()> {
        let sha = commit.name;
        let args = DeployCommit {
            repo: self.session.repo()?.to_string(),
            commit,
        };
        self.session.submit(methods::DEPLOY_COMMIT, &args).await?;
        debug!(commit = %sha, "Deployed commit");
        Ok(())
    }

    /// Deploy one tree record
    pub async fn deploy_tree(&self, tree: TreeRecord) -> ClientResult<()> {
        let sha = tree.sha;
        let args = DeployTree {
            repo: self.session.repo()?.to_string(),
            tree,
        };
        self.session.submit(methods::DEPLOY_TREE, &args).await?;
        debug!(tree = %sha, "Deployed tree");
        Ok(())
    }

    /// Deploy tree records in paced batches
    pub async fn deploy_trees(&self, trees: Vec<TreeRecord>) -> ClientResult<()> {
        let batch_size = self.session.config().writer.tree_batch_size;
        let count = trees.len();
        run_batched("trees", trees, batch_size, self.pacing(), |tree| {
            self.deploy_tree(tree)
        })
        .await?;
        info!(count, "Deployed trees");
        Ok(())
    }

    /// Encode blob content into a ledger record
    ///
    /// Content is always compressed. When the compressed form exceeds the
    /// on-chain limit it is saved to the content store instead of inlined.
    pub async fn encode_blob(&self, commit: Oid, blob: &NewBlob<'_>) -> ClientResult<BlobRecord> {
        let mut flags = BlobFlags::COMPRESSED;
        if is_binary(blob.content) {
            flags.insert(BlobFlags::BINARY);
        }

        let compressed = self.session.compressor().compress(blob.content)?;
        let limit = self.session.config().writer.max_onchain_file_size;
        let (data, content_id) = if compressed.len() > limit {
            let id = self.session.content_store().save(&compressed).await?;
            flags.insert(BlobFlags::EXTERNAL);
            info!(
                path = %blob.path,
                size = compressed.len(),
                limit,
                content_id = %id,
                "Blob offloaded to content store"
            );
            (None, Some(id.as_str().to_string()))
        } else {
            (Some(hex::encode(&compressed)), None)
        };

        Ok(BlobRecord {
            sha: blob.sha,
            commit,
            path: blob.path.clone(),
            flags,
            data,
            content_id,
            prev_sha: blob.prev_sha,
        })
    }

    /// Encode and deploy one blob, returning the flags it was stored with
    pub async fn deploy_blob(&self, commit: Oid, blob: &NewBlob<'_>) -> ClientResult<BlobFlags> {
        let record = self.encode_blob(commit, blob).await?;
        let flags = record.flags;
        let args = DeployBlob {
            repo: self.session.repo()?.to_string(),
            blob: record,
        };
        self.session.submit(methods::DEPLOY_BLOB, &args).await?;
        debug!(blob = %blob.sha, path = %blob.path, flags = flags.bits(), "Deployed blob");
        Ok(flags)
    }

    /// Deploy blobs in paced batches
    pub async fn deploy_blobs(
        &self,
        commit: Oid,
        blobs: &[NewBlob<'_>],
    ) -> ClientResult<Vec<BlobFlags>> {
        let batch_size = self.session.config().writer.blob_batch_size;
        let flags = run_batched("blobs", blobs.iter().collect(), batch_size, self.pacing(), |blob| {
            self.deploy_blob(commit, blob)
        })
        .await?;
        info!(count = flags.len(), "Deployed blobs");
        Ok(flags)
    }

    async fn details(&self, kind: EntityKind, sha: &Oid) -> ClientResult<Value> {
        let address = self.session.object_address(kind, sha).await?;
        self.session
            .query(&address, methods::GET_DETAILS, json!({}))
            .await
    }

    /// Read a commit record
    pub async fn read_commit(&self, sha: &Oid) -> ClientResult<CommitRecord> {
        Ok(decode::commit(self.details(EntityKind::Commit, sha).await?)?)
    }

    /// Read a tree record
    pub async fn read_tree(&self, sha: &Oid) -> ClientResult<TreeRecord> {
        Ok(decode::tree(self.details(EntityKind::Tree, sha).await?)?)
    }

    async fn read_tree_at(&self, (path, sha): (String, Oid)) -> ClientResult<(String, TreeRecord)> {
        let record = self.read_tree(&sha).await?;
        Ok((path, record))
    }

    /// Read a blob record without resolving its content
    pub async fn read_blob_record(&self, sha: &Oid) -> ClientResult<BlobRecord> {
        Ok(decode::blob(self.details(EntityKind::Blob, sha).await?)?)
    }

    /// Read a blob and return its uncompressed content
    pub async fn read_blob(&self, sha: &Oid) -> ClientResult<Vec<u8>> {
        let record = self.read_blob_record(sha).await?;
        self.blob_content(&record).await
    }

    /// Recover the content of a blob record, inline or offloaded
    ///
    /// The result is checked against the record's hash.
    pub async fn blob_content(&self, record: &BlobRecord) -> ClientResult<Vec<u8>> {
        let stored = match (&record.content_id, &record.data) {
            (Some(id), _) => {
                self.session
                    .content_store()
                    .load(&ContentId::new(id.as_str()))
                    .await?
            }
            (None, Some(data)) => hex::decode(data).map_err(|e| LedgerError::decode("blob", e))?,
            (None, None) => {
                return Err(LedgerError::decode("blob", "record holds no content").into())
            }
        };

        let content = if record.flags.contains(BlobFlags::COMPRESSED) {
            self.session.compressor().decompress(&stored)?
        } else {
            stored
        };

        let actual = hash_blob(&content);
        if actual != record.sha {
            return Err(LedgerError::decode(
                "blob",
                format!("content hashes to {}, record says {}", actual, record.sha),
            )
            .into());
        }
        Ok(content)
    }

    /// Reconstruct the full tree of a commit
    ///
    /// A zero commit id yields an empty tree.
    pub async fn load_tree(&self, commit: &Oid) -> ClientResult<Tree> {
        if commit.is_zero() {
            return Ok(Tree::new());
        }
        let record = self.read_commit(commit).await?;
        self.load_tree_from(record.tree).await
    }

    /// Reconstruct a full tree from its root tree hash, level by level
    pub async fn load_tree_from(&self, root: Oid) -> ClientResult<Tree> {
        let batch_size = self.session.config().writer.tree_batch_size;
        let mut items = Vec::new();
        let mut level = vec![(String::new(), root)];

        while !level.is_empty() {
            let records = run_batched("tree reads", level, batch_size, Duration::ZERO, |entry| {
                self.read_tree_at(entry)
            })
            .await?;

            let mut next = Vec::new();
            for (path, record) in records {
                for entry in record.entries {
                    if entry.mode == FileMode::Directory {
                        next.push((join_path(&path, &entry.name), entry.sha));
                    }
                    items.push(TreeItem {
                        mode: entry.mode,
                        sha: entry.sha,
                        path: path.clone(),
                        name: entry.name,
                    });
                }
            }
            level = next;
        }

        let tree = Tree::from_items(items);
        debug!(root = %root, items = tree.len(), "Loaded tree");
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::session::Wallet;
    use ledgergit_config::Config;
    use ledgergit_ledger::FakeLedger;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_binary_detection() {
        assert!(!is_binary(b"plain text\n"));
        assert!(is_binary(b"\x89PNG\r\n\x1a\n\0\0"));

        let mut late_nul = vec![b'a'; BINARY_SNIFF_LEN];
        late_nul.push(0);
        assert!(!is_binary(&late_nul));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_batched_paces_between_batches() {
        let started = tokio::time::Instant::now();
        let pause = Duration::from_millis(100);
        let results = run_batched("numbers", (0..7).collect(), 3, pause, |n| async move {
            Ok::<_, ClientError>(n * 2)
        })
        .await
        .unwrap();

        assert_eq!(results, vec![0, 2, 4, 6, 8, 10, 12]);
        // Three batches, two pauses.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_run_batched_stops_after_failed_batch() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let numbers: Vec<u32> = (0..10).collect();
        let result = run_batched("numbers", numbers, 2, Duration::ZERO, |n| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if n == 3 {
                Err(ClientError::from(LedgerError::transport("deployBlob", "boom")))
            } else {
                Ok(n)
            }
        })
        .await;

        assert!(result.is_err());
        // Batches [0,1] and [2,3] ran; nothing after the failing batch.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    async fn session(limit: usize) -> Session {
        let ledger = FakeLedger::new();
        let dao = ledger.create_dao("dao").await;
        ledger.create_repo(&dao, "repo").await;
        let (address, signer) = ledger.create_wallet(&dao, "0xabc", 0).await;
        let mut config = Config::default();
        config.writer.max_onchain_file_size = limit;
        config.writer.pacing_interval_ms = 0;
        Session::builder(Arc::new(ledger.clone()))
            .root(ledger.root())
            .dao(dao)
            .repo("repo")
            .wallet(Wallet::new(address, signer))
            .config(config)
            .build()
    }

    #[tokio::test]
    async fn test_small_blob_is_inlined() {
        let session = session(15360).await;
        let writer = ObjectWriter::new(&session);
        let blob = NewBlob {
            path: "README.md".to_string(),
            sha: hash_blob(b"hello"),
            content: b"hello",
            prev_sha: None,
        };

        let record = writer.encode_blob(Oid::ZERO, &blob).await.unwrap();
        assert!(record.flags.contains(BlobFlags::COMPRESSED));
        assert!(!record.flags.contains(BlobFlags::EXTERNAL));
        assert!(record.data.is_some());
        assert!(record.content_id.is_none());
        assert_eq!(writer.blob_content(&record).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_tampered_blob_is_rejected() {
        let session = session(15360).await;
        let writer = ObjectWriter::new(&session);
        let blob = NewBlob {
            path: "a.txt".to_string(),
            sha: hash_blob(b"a"),
            content: b"a",
            prev_sha: None,
        };
        let mut record = writer.encode_blob(Oid::ZERO, &blob).await.unwrap();
        record.sha = hash_blob(b"b");

        assert!(writer.blob_content(&record).await.is_err());
    }

    #[tokio::test]
    async fn test_load_tree_of_zero_commit() {
        let session = session(15360).await;
        let tree = ObjectWriter::new(&session).load_tree(&Oid::ZERO).await.unwrap();
        assert!(tree.is_empty());
    }
}
