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

//! Incremental tree rebuild
//!
//! [`TreeBuilder`] merges file changes into an existing [`Tree`] and then
//! recomputes only the subtree hashes that the changes touched, deepest path
//! first, so every directory item is finalized before its parent is hashed.

use crate::tree::{join_path, split_path, validate_path};
use crate::{FileMode, Oid, Tree, TreeItem};
use std::collections::BTreeSet;
use tracing::debug;

/// A single file-level change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Full path of the file (`dir/sub/name`)
    pub full_path: String,
    /// What happens to the file
    pub kind: ChangeKind,
}

/// Kind of file change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Create or overwrite the file with the given blob
    Write {
        /// Blob sha of the new content
        sha: Oid,
        /// File mode of the new item
        mode: FileMode,
    },
    /// Remove the file
    Delete,
}

impl FileChange {
    /// Write a regular file
    pub fn write(full_path: impl Into<String>, sha: Oid) -> Self {
        Self::write_with_mode(full_path, sha, FileMode::Regular)
    }

    /// Write a file with an explicit mode
    pub fn write_with_mode(full_path: impl Into<String>, sha: Oid, mode: FileMode) -> Self {
        Self {
            full_path: full_path.into(),
            kind: ChangeKind::Write { sha, mode },
        }
    }

    /// Delete a file
    pub fn delete(full_path: impl Into<String>) -> Self {
        Self {
            full_path: full_path.into(),
            kind: ChangeKind::Delete,
        }
    }
}

/// Result of a tree rebuild
#[derive(Debug, Clone)]
pub struct BuiltTree {
    /// The merged tree with refreshed directory shas
    pub tree: Tree,
    /// Root tree hash
    pub root: Oid,
    /// Directory paths whose tree objects changed, deepest first, root last
    pub updated_paths: Vec<String>,
}

impl BuiltTree {
    /// Tree objects that must be (re)deployed: `(path, sha, items)`
    pub fn updated_trees(&self) -> Vec<(String, Oid, Vec<TreeItem>)> {
        self.updated_paths
            .iter()
            .map(|path| {
                let items = self.tree.items(path).unwrap_or_default().to_vec();
                (path.clone(), self.tree.hash_path(path), items)
            })
            .collect()
    }
}

/// Merges file changes into a tree and recomputes hashes bottom-up
///
/// # Examples
///
/// ```
/// use ledgergit_versioning::{hash_blob, FileChange, Tree, TreeBuilder};
///
/// let mut builder = TreeBuilder::new(Tree::new());
/// builder.apply(&FileChange::write("docs/guide.md", hash_blob(b"# Guide"))).unwrap();
/// let built = builder.build();
///
/// assert_eq!(built.updated_paths, vec!["docs".to_string(), String::new()]);
/// assert_eq!(built.root, built.tree.compute_root());
/// ```
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    tree: Tree,
    updated: BTreeSet<String>,
}

impl TreeBuilder {
    /// Start from the current full tree
    pub fn new(tree: Tree) -> Self {
        Self {
            tree,
            updated: BTreeSet::new(),
        }
    }

    /// Paths touched so far (de-duplicated, unordered)
    pub fn updated_paths(&self) -> impl Iterator<Item = &str> {
        self.updated.iter().map(String::as_str)
    }

    /// Apply a batch of changes
    pub fn apply_all<'a>(
        &mut self,
        changes: impl IntoIterator<Item = &'a FileChange>,
    ) -> anyhow::Result<()> {
        for change in changes {
            self.apply(change)?;
        }
        Ok(())
    }

    /// Apply one change
    ///
    /// Missing ancestor directories are synthesized as directory items with
    /// a placeholder sha that is replaced in [`TreeBuilder::build`].
    pub fn apply(&mut self, change: &FileChange) -> anyhow::Result<()> {
        validate_path(&change.full_path)?;
        let (path, name) = split_path(&change.full_path);

        match change.kind {
            ChangeKind::Write { sha, mode } => {
                if mode == FileMode::Directory {
                    anyhow::bail!("'{}' cannot be written as a directory", change.full_path);
                }
                self.ensure_ancestors(path)?;
                if let Some(existing) = self.tree.get(path, name) {
                    if existing.is_tree() {
                        anyhow::bail!("'{}' is a directory", change.full_path);
                    }
                }
                self.tree.upsert(TreeItem {
                    mode,
                    sha,
                    path: path.to_string(),
                    name: name.to_string(),
                });
            }
            ChangeKind::Delete => {
                match self.tree.get(path, name) {
                    Some(item) if item.is_blob() => {}
                    Some(_) => anyhow::bail!("'{}' is a directory", change.full_path),
                    None => anyhow::bail!("'{}' does not exist", change.full_path),
                }
                self.tree.remove(path, name);
                self.mark_ancestors(path);
            }
        }
        debug!(path = %change.full_path, "Applied tree change");
        Ok(())
    }

    /// Make sure every directory on the way to `path` exists
    fn ensure_ancestors(&mut self, path: &str) -> anyhow::Result<()> {
        let mut parent = String::new();
        if !path.is_empty() {
            for segment in path.split('/') {
                let current = join_path(&parent, segment);
                match self.tree.get(&parent, segment) {
                    Some(item) if item.is_blob() => {
                        anyhow::bail!("'{}' is a file, not a directory", current);
                    }
                    Some(_) => {}
                    None => {
                        self.tree
                            .upsert(TreeItem::tree(parent.as_str(), segment, Oid::ZERO));
                    }
                }
                self.tree.ensure_path(&current);
                parent = current;
            }
        }
        self.mark_ancestors(path);
        Ok(())
    }

    /// Record `path` and all of its ancestors, root included
    fn mark_ancestors(&mut self, path: &str) {
        let mut current = path;
        loop {
            self.updated.insert(current.to_string());
            if current.is_empty() {
                break;
            }
            current = split_path(current).0;
        }
    }

    /// Recompute hashes of every touched path and return the new root
    pub fn build(mut self) -> BuiltTree {
        let mut ordered: Vec<String> = self.updated.iter().cloned().collect();
        // Deepest first; length ties cannot be ancestors of each other.
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        for path in ordered.iter().filter(|p| !p.is_empty()) {
            let sha = self.tree.hash_path(path);
            self.tree.set_directory_sha(path, sha);
        }

        let root = self.tree.root_hash();
        debug!(root = %root, updated = ordered.len(), "Rebuilt tree hashes");

        BuiltTree {
            tree: self.tree,
            root,
            updated_paths: ordered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hash_blob, hash_tree};

    fn build(tree: Tree, changes: &[FileChange]) -> BuiltTree {
        let mut builder = TreeBuilder::new(tree);
        builder.apply_all(changes).unwrap();
        builder.build()
    }

    #[test]
    fn test_single_root_file() {
        let built = build(Tree::new(), &[FileChange::write("README.md", hash_blob(b"hello"))]);
        assert_eq!(
            built.root.to_hex(),
            "d25592c38ef63a211bf1d582f0d5e6c015438854"
        );
        assert_eq!(built.updated_paths, vec![String::new()]);
    }

    #[test]
    fn test_nested_paths_are_synthesized() {
        let built = build(
            Tree::new(),
            &[FileChange::write("a/b/c.txt", hash_blob(b"c"))],
        );
        assert_eq!(
            built.updated_paths,
            vec!["a/b".to_string(), "a".to_string(), String::new()]
        );
        let a = built.tree.get("", "a").unwrap();
        assert!(a.is_tree());
        assert_eq!(a.sha, built.tree.hash_path("a"));
        assert_eq!(
            built.tree.get("a", "b").unwrap().sha,
            built.tree.hash_path("a/b")
        );
        assert_eq!(built.root, built.tree.compute_root());
    }

    #[test]
    fn test_overwrite_never_duplicates() {
        let first = build(Tree::new(), &[FileChange::write("x/f", hash_blob(b"1"))]);
        let second = build(first.tree, &[FileChange::write("x/f", hash_blob(b"2"))]);
        assert_eq!(second.tree.items("x").unwrap().len(), 1);
        assert_eq!(second.tree.items("").unwrap().len(), 1);
        assert_eq!(second.tree.find("x/f").unwrap().sha, hash_blob(b"2"));
    }

    #[test]
    fn test_untouched_siblings_keep_their_sha() {
        let base = build(
            Tree::new(),
            &[
                FileChange::write("left/a", hash_blob(b"a")),
                FileChange::write("right/b", hash_blob(b"b")),
            ],
        );
        let right_before = base.tree.get("", "right").unwrap().sha;
        let next = build(base.tree, &[FileChange::write("left/a", hash_blob(b"A"))]);

        assert_eq!(next.tree.get("", "right").unwrap().sha, right_before);
        assert!(!next.updated_paths.contains(&"right".to_string()));
    }

    #[test]
    fn test_delete_leaves_empty_directory() {
        let base = build(Tree::new(), &[FileChange::write("dir/only", hash_blob(b"x"))]);
        let next = build(base.tree, &[FileChange::delete("dir/only")]);

        assert_eq!(next.tree.items("dir").unwrap().len(), 0);
        assert_eq!(next.tree.get("", "dir").unwrap().sha, hash_tree(&[]));
        assert_eq!(next.root, next.tree.compute_root());
    }

    #[test]
    fn test_delete_missing_file_fails() {
        let mut builder = TreeBuilder::new(Tree::new());
        assert!(builder.apply(&FileChange::delete("ghost")).is_err());
    }

    #[test]
    fn test_file_directory_conflicts_fail() {
        let base = build(Tree::new(), &[FileChange::write("f", hash_blob(b"f"))]);
        let mut builder = TreeBuilder::new(base.tree);
        assert!(builder
            .apply(&FileChange::write("f/inner", hash_blob(b"i")))
            .is_err());

        let base = build(Tree::new(), &[FileChange::write("d/inner", hash_blob(b"i"))]);
        let mut builder = TreeBuilder::new(base.tree);
        assert!(builder.apply(&FileChange::write("d", hash_blob(b"d"))).is_err());
    }

    #[test]
    fn test_updated_trees_match_paths() {
        let built = build(Tree::new(), &[FileChange::write("src/lib.rs", hash_blob(b"lib"))]);
        let trees = built.updated_trees();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].0, "src");
        assert_eq!(trees[1].1, built.root);
    }
}
