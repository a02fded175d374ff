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

//! Git object layer for LedgerGit
//!
//! This crate holds the pure, I/O-free half of the client:
//! - Git-compatible SHA-1 hashing of blobs, trees and commits
//! - A path-keyed [`Tree`] snapshot and the incremental [`TreeBuilder`]
//! - Commit serialization with ledger identities
//! - Informational line patches for changed files
//!
//! # Architecture
//!
//! Objects on the ledger are content addressed by the same SHA-1 that git
//! computes, so everything here must stay byte-exact with the git object
//! format:
//!
//! - **Blob**: `sha1("blob {len}\0{content}")`
//! - **Tree**: `sha1("tree {len}\0" + concat("{mode} {name}\0" + raw sha))`,
//!   entries ordered by name, directory mode written as `40000`
//! - **Commit**: `sha1("commit {len}\0{data}\n")`
//!
//! # Examples
//!
//! ```
//! use chrono::{FixedOffset, TimeZone};
//! use ledgergit_versioning::{hash_blob, Commit, FileChange, Signature, Tree, TreeBuilder};
//!
//! # fn main() -> anyhow::Result<()> {
//! let readme = hash_blob(b"hello");
//!
//! let mut builder = TreeBuilder::new(Tree::new());
//! builder.apply(&FileChange::write("README.md", readme))?;
//! let built = builder.build();
//!
//! let at = FixedOffset::east_opt(0).unwrap().timestamp_opt(1_700_000_000, 0).unwrap();
//! let sig = Signature::for_pubkey("0xabc", "gosh.sh", at);
//! let commit = Commit::new(built.root, sig.clone(), sig, "Add README".to_string());
//! println!("commit {}", commit.hash());
//! # Ok(())
//! # }
//! ```

mod builder;
mod commit;
mod hash;
mod object;
mod oid;
mod patch;
mod tree;

pub use builder::{BuiltTree, ChangeKind, FileChange, TreeBuilder};
pub use commit::{compose_message, parents_from_tips, Commit, Signature};
pub use hash::{hash_blob, hash_commit, hash_tree, tree_payload};
pub use object::ObjectType;
pub use oid::{Oid, OID_LEN};
pub use patch::{line_patch, CONTEXT_LINES};
pub use tree::{join_path, split_path, validate_path, FileMode, Tree, TreeItem};
