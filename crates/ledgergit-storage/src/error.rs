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

//! Content store error types

use std::io;
use thiserror::Error;

/// Result type alias for content store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in a content store
#[derive(Error, Debug)]
pub enum StorageError {
    /// No content under the given id
    #[error("content not found: {0}")]
    NotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed content id
    #[error("invalid content id: {0}")]
    InvalidId(String),

    /// Stored bytes do not match their content id
    #[error("content integrity check failed for {0}")]
    Corrupted(String),

    /// Store not available or misconfigured
    #[error("content store error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a NotFound error for the given id
    pub fn not_found<S: Into<String>>(id: S) -> Self {
        StorageError::NotFound(id.into())
    }

    /// Create an InvalidId error with context
    pub fn invalid_id<S: Into<String>>(msg: S) -> Self {
        StorageError::InvalidId(msg.into())
    }

    /// Create a Backend error with context
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        StorageError::Backend(msg.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = StorageError::not_found("mem-abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "content not found: mem-abc");
    }

    #[test]
    fn test_io_conversion() {
        let err: StorageError = io::Error::other("disk gone").into();
        assert!(matches!(err, StorageError::Io(_)));
        assert!(!err.is_not_found());
    }
}
