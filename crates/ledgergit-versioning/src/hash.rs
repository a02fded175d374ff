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

//! Git-compatible object hashing
//!
//! All functions here are pure. Their output must stay byte-exact with the
//! git object format, otherwise objects written by this crate would not be
//! addressable by git tooling and existing ledger records would no longer
//! match.

use crate::{ObjectType, Oid, TreeItem};

/// Hash file content as a git blob: `sha1("blob {len}\0{content}")`
///
/// # Examples
///
/// ```
/// use ledgergit_versioning::hash_blob;
///
/// // Same digest as `echo -n hello | git hash-object --stdin`
/// assert_eq!(
///     hash_blob(b"hello").to_hex(),
///     "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0"
/// );
/// ```
pub fn hash_blob(content: &[u8]) -> Oid {
    Oid::hash_with_header(&ObjectType::Blob.header(content.len()), content)
}

/// Hash a tree from its items
///
/// Items are ordered by name before hashing, so the caller's order does not
/// matter. Directories and files compare identically by name.
pub fn hash_tree(items: &[TreeItem]) -> Oid {
    let payload = tree_payload(items);
    Oid::hash_with_header(&ObjectType::Tree.header(payload.len()), &payload)
}

/// Serialized tree payload (without the `tree {len}\0` header)
pub fn tree_payload(items: &[TreeItem]) -> Vec<u8> {
    let mut sorted: Vec<&TreeItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut payload = Vec::with_capacity(sorted.len() * 48);
    for item in sorted {
        payload.extend_from_slice(item.mode.hash_mode().as_bytes());
        payload.push(b' ');
        payload.extend_from_slice(item.name.as_bytes());
        payload.push(0);
        payload.extend_from_slice(item.sha.as_bytes());
    }
    payload
}

/// Hash serialized commit data: `sha1("commit {len(data+"\n")}\0{data}\n")`
///
/// `data` is the newline-joined commit text without its trailing newline,
/// as produced by [`crate::Commit::data`].
pub fn hash_commit(data: &str) -> Oid {
    let mut payload = Vec::with_capacity(data.len() + 1);
    payload.extend_from_slice(data.as_bytes());
    payload.push(b'\n');
    Oid::hash_with_header(&ObjectType::Commit.header(payload.len()), &payload)
}
