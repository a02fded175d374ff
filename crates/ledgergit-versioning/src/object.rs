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

//! Object kinds stored on the ledger

use serde::{Deserialize, Serialize};
use std::fmt;

/// Git object kinds
///
/// The string form is the prefix used in the git object header, so it
/// participates directly in hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// Blob - file content
    Blob,
    /// Tree - directory listing with references to other objects
    Tree,
    /// Commit - snapshot metadata with parent references
    Commit,
}

impl ObjectType {
    /// Get the type as a string identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use ledgergit_versioning::ObjectType;
    ///
    /// assert_eq!(ObjectType::Blob.as_str(), "blob");
    /// assert_eq!(ObjectType::Tree.as_str(), "tree");
    /// assert_eq!(ObjectType::Commit.as_str(), "commit");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }

    /// Parse object type from string
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            _ => anyhow::bail!("Unknown object type: {}", s),
        }
    }

    /// Git object header for a payload of `len` bytes: `"{type} {len}\0"`
    pub fn header(&self, len: usize) -> Vec<u8> {
        format!("{} {}\0", self.as_str(), len).into_bytes()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_from_str() {
        assert_eq!(ObjectType::parse("blob").unwrap(), ObjectType::Blob);
        assert_eq!(ObjectType::parse("tree").unwrap(), ObjectType::Tree);
        assert_eq!(ObjectType::parse("commit").unwrap(), ObjectType::Commit);
        assert!(ObjectType::parse("tag").is_err());
    }

    #[test]
    fn test_header_format() {
        assert_eq!(ObjectType::Blob.header(5), b"blob 5\0".to_vec());
        assert_eq!(ObjectType::Tree.header(0), b"tree 0\0".to_vec());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ObjectType::Commit).unwrap();
        assert_eq!(json, "\"commit\"");
    }
}
