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

//! Hierarchical tree state keyed by directory path
//!
//! A [`Tree`] is the flattened form of a repository snapshot: every
//! directory path (the root is `""`) maps to the items directly inside it.
//! Every non-root path key also appears as a directory item in its parent's
//! list, and the hash of a path is a pure function of its item list.

use crate::{hash_tree, ObjectType, Oid};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// File mode of a tree item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileMode {
    /// Regular file (100644)
    Regular,
    /// Executable file (100755)
    Executable,
    /// Symlink (120000)
    Symlink,
    /// Directory/tree (040000)
    Directory,
}

impl FileMode {
    /// Six-digit octal form stored in ledger tree records
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
            FileMode::Symlink => "120000",
            FileMode::Directory => "040000",
        }
    }

    /// Mode as written into the git tree payload
    ///
    /// Git drops the leading zero of the directory mode.
    pub fn hash_mode(&self) -> &'static str {
        match self {
            FileMode::Directory => "40000",
            other => other.as_str(),
        }
    }

    /// Parse a mode string, accepting both `040000` and `40000`
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "100644" => Ok(FileMode::Regular),
            "100755" => Ok(FileMode::Executable),
            "120000" => Ok(FileMode::Symlink),
            "040000" | "40000" => Ok(FileMode::Directory),
            _ => anyhow::bail!("Unknown file mode: {}", s),
        }
    }

    /// Determine object type based on file mode
    pub fn object_type(&self) -> ObjectType {
        match self {
            FileMode::Directory => ObjectType::Tree,
            _ => ObjectType::Blob,
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FileMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FileMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FileMode::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// One entry in a directory, unique per `(path, name)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeItem {
    /// File mode (determines blob vs tree)
    pub mode: FileMode,
    /// Object id of the blob or subtree
    pub sha: Oid,
    /// Directory containing this item (`""` for the root)
    pub path: String,
    /// Item name within its directory
    pub name: String,
}

impl TreeItem {
    /// Create a regular-file item
    pub fn blob(path: impl Into<String>, name: impl Into<String>, sha: Oid) -> Self {
        Self {
            mode: FileMode::Regular,
            sha,
            path: path.into(),
            name: name.into(),
        }
    }

    /// Create a directory item
    pub fn tree(path: impl Into<String>, name: impl Into<String>, sha: Oid) -> Self {
        Self {
            mode: FileMode::Directory,
            sha,
            path: path.into(),
            name: name.into(),
        }
    }

    /// Check if this item points to a tree (directory)
    pub fn is_tree(&self) -> bool {
        self.mode == FileMode::Directory
    }

    /// Check if this item is a blob (file)
    pub fn is_blob(&self) -> bool {
        !self.is_tree()
    }

    /// Full path of this item (`path/name`)
    pub fn full_path(&self) -> String {
        join_path(&self.path, &self.name)
    }
}

/// Split a full path into its directory and name
///
/// # Examples
///
/// ```
/// use ledgergit_versioning::split_path;
///
/// assert_eq!(split_path("src/lib/mod.rs"), ("src/lib", "mod.rs"));
/// assert_eq!(split_path("README.md"), ("", "README.md"));
/// ```
pub fn split_path(full_path: &str) -> (&str, &str) {
    match full_path.rfind('/') {
        Some(idx) => (&full_path[..idx], &full_path[idx + 1..]),
        None => ("", full_path),
    }
}

/// Join a directory and a name into a full path
pub fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", path, name)
    }
}

/// Reject paths that cannot be represented as tree items
pub fn validate_path(full_path: &str) -> anyhow::Result<()> {
    if full_path.is_empty() {
        anyhow::bail!("Path must not be empty");
    }
    for segment in full_path.split('/') {
        if segment.is_empty() {
            anyhow::bail!("Path '{}' has an empty segment", full_path);
        }
        if segment == "." || segment == ".." {
            anyhow::bail!("Path '{}' contains a relative segment", full_path);
        }
        if segment.contains('\0') {
            anyhow::bail!("Path '{}' contains a NUL byte", full_path);
        }
    }
    Ok(())
}

/// Repository snapshot: directory path -> items in that directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    paths: BTreeMap<String, Vec<TreeItem>>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create an empty tree holding only the root path
    pub fn new() -> Self {
        let mut paths = BTreeMap::new();
        paths.insert(String::new(), Vec::new());
        Self { paths }
    }

    /// Group a flat list of items by their `path`
    ///
    /// Directory items get an (initially empty) path entry of their own, so
    /// the parent/child invariant holds even for empty directories.
    pub fn from_items(items: impl IntoIterator<Item = TreeItem>) -> Self {
        let mut tree = Self::new();
        for item in items {
            if item.is_tree() {
                tree.ensure_path(&item.full_path());
            }
            tree.upsert(item);
        }
        tree
    }

    /// Items directly inside `path`
    pub fn items(&self, path: &str) -> Option<&[TreeItem]> {
        self.paths.get(path).map(Vec::as_slice)
    }

    /// Whether `path` is a known directory
    pub fn contains_path(&self, path: &str) -> bool {
        self.paths.contains_key(path)
    }

    /// All directory paths, root first
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    /// Look up the item at `(path, name)`
    pub fn get(&self, path: &str, name: &str) -> Option<&TreeItem> {
        self.paths
            .get(path)
            .and_then(|items| items.iter().find(|item| item.name == name))
    }

    /// Look up an item by its full path
    pub fn find(&self, full_path: &str) -> Option<&TreeItem> {
        let (path, name) = split_path(full_path);
        self.get(path, name)
    }

    /// Total number of items across all directories
    pub fn len(&self) -> usize {
        self.paths.values().map(Vec::len).sum()
    }

    /// Check if the tree holds no items at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All blob items, ordered by full path
    pub fn files(&self) -> Vec<&TreeItem> {
        let mut files: Vec<&TreeItem> = self
            .paths
            .values()
            .flatten()
            .filter(|item| item.is_blob())
            .collect();
        files.sort_by_key(|item| item.full_path());
        files
    }

    /// Create an empty item list for `path` if it does not exist yet
    pub fn ensure_path(&mut self, path: &str) -> bool {
        if self.paths.contains_key(path) {
            return false;
        }
        self.paths.insert(path.to_string(), Vec::new());
        true
    }

    /// Insert or replace the item at `(item.path, item.name)`
    ///
    /// Returns the replaced item, if any. Never produces duplicates.
    pub fn upsert(&mut self, item: TreeItem) -> Option<TreeItem> {
        let items = self.paths.entry(item.path.clone()).or_default();
        match items.iter_mut().find(|existing| existing.name == item.name) {
            Some(existing) => Some(std::mem::replace(existing, item)),
            None => {
                items.push(item);
                None
            }
        }
    }

    /// Remove the item at `(path, name)`
    pub fn remove(&mut self, path: &str, name: &str) -> Option<TreeItem> {
        let items = self.paths.get_mut(path)?;
        let idx = items.iter().position(|item| item.name == name)?;
        Some(items.remove(idx))
    }

    /// Set the sha of the directory item that represents `path` in its parent
    ///
    /// Returns false when the parent holds no such directory item.
    pub fn set_directory_sha(&mut self, path: &str, sha: Oid) -> bool {
        if path.is_empty() {
            return false;
        }
        let (parent, name) = split_path(path);
        match self
            .paths
            .get_mut(parent)
            .and_then(|items| items.iter_mut().find(|i| i.name == name && i.is_tree()))
        {
            Some(item) => {
                item.sha = sha;
                true
            }
            None => false,
        }
    }

    /// Hash of the items currently stored at `path`
    ///
    /// A missing path hashes as an empty tree.
    pub fn hash_path(&self, path: &str) -> Oid {
        hash_tree(self.items(path).unwrap_or_default())
    }

    /// Hash of the root directory using stored subtree shas
    pub fn root_hash(&self) -> Oid {
        self.hash_path("")
    }

    /// Recompute the root hash from scratch
    ///
    /// Stored directory shas are ignored and every subtree is rehashed
    /// recursively, so the result depends only on the blob items.
    pub fn compute_root(&self) -> Oid {
        self.compute_path("")
    }

    fn compute_path(&self, path: &str) -> Oid {
        let items: Vec<TreeItem> = self
            .items(path)
            .unwrap_or_default()
            .iter()
            .map(|item| {
                let mut item = item.clone();
                if item.is_tree() {
                    item.sha = self.compute_path(&item.full_path());
                }
                item
            })
            .collect();
        hash_tree(&items)
    }
}
