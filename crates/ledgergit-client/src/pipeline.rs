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

//! Commit pipeline
//!
//! [`CommitPipeline::create_commit`] turns a set of file changes into a
//! commit on a branch:
//!
//! 1. load the branch's current tree
//! 2. hash every changed file and compute its informational patch
//! 3. merge the changes into the tree and rehash bottom-up
//! 4. resolve parents as `(target tip, merge source tip)`
//! 5. serialize and hash the commit
//! 6. deploy the commit, then changed trees, then changed blobs
//! 7. attach the addresses of those objects to the commit
//! 8. repoint the branch, or open a proposal if the branch is governed
//!
//! Every check that can fail without the ledger's help runs before the
//! first write.

use crate::error::{ClientResult, ValidationError};
use crate::governor::{BranchGovernor, BranchPolicy};
use crate::proposal::ProposalStateMachine;
use crate::session::Session;
use crate::writer::{is_binary, tree_record, NewBlob, ObjectWriter, ObjectRef};
use ledgergit_ledger::methods::{self, GetBranch, SetCommit, SetCommitObjects};
use ledgergit_ledger::{
    decode, Address, BlobFlags, Branch, CommitRecord, EntityKind, TreeRecord,
};
use ledgergit_versioning::{
    hash_blob, line_patch, parents_from_tips, validate_path, Commit, FileChange, Oid, Signature,
    Tree, TreeBuilder,
};
use std::collections::BTreeMap;
use tracing::{debug, info, info_span, Instrument};

/// One changed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedBlob {
    /// Full path, `/`-separated
    pub path: String,
    /// New content, or `None` to delete the file
    pub content: Option<Vec<u8>>,
}

impl ChangedBlob {
    /// Create or overwrite a file
    pub fn write(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: Some(content.into()),
        }
    }

    /// Delete a file
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
        }
    }
}

/// Everything needed to create one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    /// Target branch
    pub branch: String,
    /// Changed files, applied in order
    pub blobs: Vec<ChangedBlob>,
    /// Commit message
    pub message: String,
    /// Branch being merged into `branch`
    pub merge_from: Option<String>,
    /// Author public key; defaults to the session wallet's key
    pub author: Option<String>,
}

impl CommitRequest {
    /// Start a request for `branch`
    pub fn new(branch: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            blobs: Vec::new(),
            message: message.into(),
            merge_from: None,
            author: None,
        }
    }

    /// Add a changed file
    pub fn with_blob(mut self, blob: ChangedBlob) -> Self {
        self.blobs.push(blob);
        self
    }

    /// Record `source` as the second parent
    pub fn merge_from(mut self, source: impl Into<String>) -> Self {
        self.merge_from = Some(source.into());
        self
    }

    /// Author the commit as `pubkey`
    pub fn author(mut self, pubkey: impl Into<String>) -> Self {
        self.author = Some(pubkey.into());
        self
    }
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobChange {
    /// Full path
    pub path: String,
    /// New blob hash, `None` for a deletion
    pub sha: Option<Oid>,
    /// Previous blob hash, if the file existed
    pub prev_sha: Option<Oid>,
    /// Line patch against the previous content, for text files
    pub patch: Option<String>,
    /// Whether the content went to the external content store
    pub external: bool,
}

/// How the branch was updated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchUpdate {
    /// Branch now points at the new commit
    Repointed {
        /// Address of the new commit record
        commit_address: Address,
    },
    /// A proposal was opened; the branch is unchanged
    Proposed {
        /// Address of the proposal
        proposal: Address,
    },
}

/// Result of [`CommitPipeline::create_commit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// New commit hash
    pub commit: Oid,
    /// Root tree hash
    pub tree: Oid,
    /// Parents, target tip first
    pub parents: Vec<Oid>,
    /// Per-file results
    pub changes: Vec<BlobChange>,
    /// Addresses attached to the commit record
    pub objects: Vec<Address>,
    /// Branch outcome
    pub update: BranchUpdate,
}

struct PendingBlob<'r> {
    path: &'r str,
    sha: Oid,
    content: &'r [u8],
    prev_sha: Option<Oid>,
}

/// Builds and publishes commits for one session
#[derive(Debug, Clone, Copy)]
pub struct CommitPipeline<'a> {
    session: &'a Session,
    writer: ObjectWriter<'a>,
}

impl<'a> CommitPipeline<'a> {
    /// Create a pipeline bound to `session`
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            writer: ObjectWriter::new(session),
        }
    }

    /// Create a commit on `request.branch`
    pub async fn create_commit(&self, request: &CommitRequest) -> ClientResult<CommitOutcome> {
        let span = info_span!(
            "create_commit",
            repo = self.session.repo()?,
            branch = %request.branch
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: &CommitRequest) -> ClientResult<CommitOutcome> {
        let config = self.session.config();
        let wallet = self.session.wallet()?;
        let author = request
            .author
            .clone()
            .unwrap_or_else(|| wallet.pubkey().to_string());
        let policy = BranchGovernor::from_config(config)?.classify(&request.branch);

        if request.blobs.is_empty() && request.merge_from.is_none() {
            return Err(ValidationError::EmptyCommit.into());
        }
        for blob in &request.blobs {
            validate_path(&blob.path)
                .map_err(|e| ValidationError::MalformedPath(e.to_string()))?;
        }

        let branch = self.session.branch(&request.branch).await?;
        let source = match &request.merge_from {
            Some(name) => Some(self.session.branch(name).await?),
            None => None,
        };
        let proposals = ProposalStateMachine::new(self.session);
        if policy == BranchPolicy::Governed {
            proposals.ensure_can_open().await?;
        }

        // Steps 1-3: current tree, hashes, rebuilt tree.
        let tree = self.writer.load_tree(&branch.commit).await?;
        let mut builder = TreeBuilder::new(tree.clone());
        let mut changes = Vec::new();
        let mut pending = Vec::new();
        for blob in &request.blobs {
            let prev_sha = tree
                .find(&blob.path)
                .filter(|item| item.is_blob())
                .map(|item| item.sha);

            let (change, sha, patch) = match &blob.content {
                Some(content) => {
                    let sha = hash_blob(content);
                    if prev_sha == Some(sha) {
                        debug!(path = %blob.path, "File unchanged, skipping");
                        continue;
                    }
                    let patch = self.patch(&blob.path, prev_sha, content).await?;
                    pending.push(PendingBlob {
                        path: &blob.path,
                        sha,
                        content,
                        prev_sha,
                    });
                    (FileChange::write(blob.path.as_str(), sha), Some(sha), patch)
                }
                None => (FileChange::delete(blob.path.as_str()), None, None),
            };
            builder
                .apply(&change)
                .map_err(|e| ValidationError::MalformedPath(e.to_string()))?;
            changes.push(BlobChange {
                path: blob.path.clone(),
                sha,
                prev_sha,
                patch,
                external: false,
            });
        }
        if changes.is_empty() && source.is_none() {
            return Err(ValidationError::EmptyCommit.into());
        }
        let built = builder.build();

        // Steps 4-5: parents and commit object.
        let parents = parents_from_tips(branch.commit, source.as_ref().map(|b| b.commit));
        let now = self.session.clock().now();
        let signature = Signature::for_pubkey(&author, &config.author.domain, now);
        let commit = Commit::with_parents(
            built.root,
            parents.clone(),
            signature.clone(),
            signature,
            request.message.clone(),
        )
        .map_err(|e| ValidationError::InvalidCommit(e.to_string()))?;
        let sha = commit.hash();
        info!(
            commit = %sha,
            tree = %built.root,
            parents = parents.len(),
            files = changes.len(),
            "Prepared commit"
        );

        // Objects, de-duplicated by hash.
        let trees: BTreeMap<Oid, TreeRecord> = built
            .updated_trees()
            .into_iter()
            .map(|(_, tree_sha, items)| (tree_sha, tree_record(tree_sha, &items)))
            .collect();
        let mut blobs: BTreeMap<Oid, &PendingBlob<'_>> = BTreeMap::new();
        for blob in &pending {
            blobs.entry(blob.sha).or_insert(blob);
        }
        let tree_refs = self
            .writer
            .resolve(EntityKind::Tree, trees.keys().copied().collect())
            .await?;
        let blob_refs = self
            .writer
            .resolve(EntityKind::Blob, blobs.keys().copied().collect())
            .await?;

        // Step 6: commit first, then trees, then blobs.
        let commit_address = self.session.object_address(EntityKind::Commit, &sha).await?;
        if !self.session.account_active(&commit_address).await? {
            self.writer
                .deploy_commit(CommitRecord {
                    name: sha,
                    branch: request.branch.clone(),
                    tree: built.root,
                    parents: parents.clone(),
                    content: commit.data(),
                    objects: Vec::new(),
                })
                .await?;
        }
        self.session.wait_for_account_active(&commit_address).await?;

        let new_trees: Vec<TreeRecord> = missing(&tree_refs)
            .filter_map(|sha| trees.get(sha).cloned())
            .collect();
        self.writer.deploy_trees(new_trees).await?;

        let new_blobs: Vec<NewBlob<'_>> = missing(&blob_refs)
            .filter_map(|sha| blobs.get(sha))
            .map(|blob| NewBlob {
                path: blob.path.to_string(),
                sha: blob.sha,
                content: blob.content,
                prev_sha: blob.prev_sha,
            })
            .collect();
        let flags = self.writer.deploy_blobs(sha, &new_blobs).await?;
        let external: Vec<Oid> = new_blobs
            .iter()
            .zip(&flags)
            .filter(|(_, flags)| flags.contains(BlobFlags::EXTERNAL))
            .map(|(blob, _)| blob.sha)
            .collect();

        // Step 7: attach object addresses once they all resolve.
        let objects: Vec<Address> = tree_refs
            .iter()
            .chain(&blob_refs)
            .map(|r| r.address.clone())
            .collect();
        self.session.wait_for_accounts_active(&objects).await?;
        self.attach_objects(sha, &commit_address, &objects).await?;

        for change in &mut changes {
            change.external = change.sha.is_some_and(|sha| external.contains(&sha));
        }

        // Step 8: branch update.
        let set_commit = SetCommit {
            repo: self.session.repo()?.to_string(),
            branch: request.branch.clone(),
            commit: sha,
            prev_commit: branch.commit,
            num_blobs: pending.len(),
        };
        let update = match policy {
            BranchPolicy::Direct => {
                self.repoint(&set_commit).await?;
                BranchUpdate::Repointed { commit_address }
            }
            BranchPolicy::Governed => {
                let opened = proposals.open(&set_commit).await?;
                BranchUpdate::Proposed {
                    proposal: opened.address,
                }
            }
        };

        info!(commit = %sha, ?update, "Commit created");
        Ok(CommitOutcome {
            commit: sha,
            tree: built.root,
            parents,
            changes,
            objects,
            update,
        })
    }

    /// Line patch of a text file against its previous version
    async fn patch(
        &self,
        path: &str,
        prev_sha: Option<Oid>,
        content: &[u8],
    ) -> ClientResult<Option<String>> {
        if is_binary(content) {
            return Ok(None);
        }
        let new = match std::str::from_utf8(content) {
            Ok(text) => text,
            Err(_) => return Ok(None),
        };
        let old = match prev_sha {
            Some(prev) => self.writer.read_blob(&prev).await?,
            None => Vec::new(),
        };
        if is_binary(&old) {
            return Ok(None);
        }
        Ok(std::str::from_utf8(&old)
            .ok()
            .map(|old| line_patch(path, old, new)))
    }

    async fn attach_objects(
        &self,
        commit: Oid,
        commit_address: &Address,
        objects: &[Address],
    ) -> ClientResult<()> {
        let args = SetCommitObjects {
            repo: self.session.repo()?.to_string(),
            commit,
            objects: objects.to_vec(),
        };
        self.session
            .submit(methods::SET_COMMIT_OBJECTS, &args)
            .await?;
        self.session
            .poll_query(
                &format!("objects of commit {}", commit),
                commit_address,
                methods::GET_DETAILS,
                serde_json::json!({}),
                |value| Ok((decode::commit(value)?.objects == objects).then_some(())),
            )
            .await
    }

    async fn repoint(&self, change: &SetCommit) -> ClientResult<()> {
        self.session.submit(methods::SET_COMMIT, change).await?;

        let repo = self.session.repo_address().await?;
        let args = methods::to_args(
            methods::GET_BRANCH,
            &GetBranch {
                name: change.branch.clone(),
            },
        )?;
        let commit = change.commit;
        let branch: Branch = self
            .session
            .poll_query(
                &format!("branch {} at {}", change.branch, commit),
                &repo,
                methods::GET_BRANCH,
                args,
                |value| Ok(decode::branch(value)?.filter(|b| b.commit == commit)),
            )
            .await?;
        debug!(branch = %branch.name, commit = %branch.commit, "Branch repointed");
        Ok(())
    }
}

fn missing(refs: &[ObjectRef]) -> impl Iterator<Item = &Oid> {
    refs.iter().filter(|r| !r.exists).map(|r| &r.sha)
}

/// The tree a branch currently points at
pub async fn branch_tree(session: &Session, branch: &str) -> ClientResult<Tree> {
    let branch = session.branch(branch).await?;
    ObjectWriter::new(session).load_tree(&branch.commit).await
}
