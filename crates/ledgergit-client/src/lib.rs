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

//! LedgerGit client
//!
//! Publishes git commits to a repository whose objects live on a remote,
//! eventually consistent ledger, and drives the proposal vote that guards
//! the protected branch.
//!
//! # Components
//!
//! - [`Session`]: explicit per-caller context (ledger, collaborators,
//!   config, wallet)
//! - [`ObjectWriter`]: batched, paced object deploys and object reads
//! - [`CommitPipeline`]: change set to commit to branch update
//! - [`BranchGovernor`]: direct vs governed branches
//! - [`BranchManager`]: create and delete branches
//! - [`ProposalStateMachine`]: open, vote, resolve, release
//!
//! Every wait on ledger state is bounded by the consistency timeout and
//! surfaces as [`ClientError::ConsistencyTimeout`].
//!
//! # Examples
//!
//! ```rust
//! use ledgergit_client::{ChangedBlob, CommitPipeline, CommitRequest, Session, Wallet};
//! use ledgergit_ledger::FakeLedger;
//! use ledgergit_versioning::Oid;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let ledger = FakeLedger::new();
//! let dao = ledger.create_dao("dao").await;
//! ledger.create_repo(&dao, "repo").await;
//! ledger.create_branch("repo", "feature", Oid::ZERO).await;
//! let (address, signer) = ledger.create_wallet(&dao, "0xabc", 0).await;
//!
//! let session = Session::builder(Arc::new(ledger.clone()))
//!     .root(ledger.root())
//!     .dao(dao)
//!     .repo("repo")
//!     .wallet(Wallet::new(address, signer))
//!     .build();
//!
//! let request = CommitRequest::new("feature", "Add readme")
//!     .with_blob(ChangedBlob::write("README.md", "hello"));
//! let outcome = CommitPipeline::new(&session).create_commit(&request).await.unwrap();
//!
//! assert_eq!(ledger.branch("repo", "feature").await.unwrap().commit, outcome.commit);
//! # });
//! ```

pub mod branches;
pub mod error;
pub mod governor;
pub mod pipeline;
pub mod proposal;
pub mod session;
pub mod writer;

pub use branches::{check_branch_name, BranchManager};
pub use error::{ClientError, ClientResult, ErrorKind, PreconditionError, ValidationError};
pub use governor::{BranchGovernor, BranchPolicy};
pub use pipeline::{
    branch_tree, BlobChange, BranchUpdate, ChangedBlob, CommitOutcome, CommitPipeline,
    CommitRequest,
};
pub use proposal::{
    check_open, check_vote, OpenedProposal, ProposalState, ProposalStateMachine, ProposalStatus,
};
pub use session::{open_content_store, Session, SessionBuilder, Wallet};
pub use writer::{is_binary, run_batched, tree_record, NewBlob, ObjectRef, ObjectWriter};
