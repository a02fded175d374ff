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

//! Object Identifier (OID) for git-compatible content addressing
//!
//! An OID is the SHA-1 digest of a type-prefixed, length-prefixed object
//! serialization, exactly as git computes it. Identical objects always map
//! to the same OID, which is what makes redeploying an object a no-op.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

/// Length of a SHA-1 digest in bytes
pub const OID_LEN: usize = 20;

/// Object Identifier - SHA-1 digest of an object
///
/// # Examples
///
/// ```
/// use ledgergit_versioning::Oid;
///
/// let oid = Oid::hash(b"abc");
/// assert_eq!(oid.to_hex(), "a9993e364706816aba3e25717850c26c9cd0d89d");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid([u8; OID_LEN]);

impl Oid {
    /// The all-zero id, used by the ledger to mean "no commit"
    pub const ZERO: Oid = Oid([0u8; OID_LEN]);

    /// Hash raw bytes with SHA-1
    ///
    /// This does not add a git object header; see [`crate::hash_blob`] and
    /// friends for object hashing.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Self::from_digest(hasher)
    }

    /// Hash a git object header followed by its payload
    pub(crate) fn hash_with_header(header: &[u8], payload: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(header);
        hasher.update(payload);
        Self::from_digest(hasher)
    }

    fn from_digest(hasher: Sha1) -> Self {
        let result = hasher.finalize();
        let mut bytes = [0u8; OID_LEN];
        bytes.copy_from_slice(&result);
        Oid(bytes)
    }

    /// Create OID from raw bytes
    pub fn from_bytes(bytes: [u8; OID_LEN]) -> Self {
        Oid(bytes)
    }

    /// Get the raw bytes of the OID
    ///
    /// These are the bytes embedded in tree entries.
    pub fn as_bytes(&self) -> &[u8; OID_LEN] {
        &self.0
    }

    /// Whether this is the all-zero "no commit" id
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; OID_LEN]
    }

    /// Convert OID to a lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create OID from hex string
    ///
    /// # Errors
    ///
    /// Returns error if the string is not 40 hex characters
    ///
    /// # Examples
    ///
    /// ```
    /// use ledgergit_versioning::Oid;
    ///
    /// let oid = Oid::from_hex("0000000000000000000000000000000000000000").unwrap();
    /// assert!(oid.is_zero());
    /// ```
    pub fn from_hex(s: &str) -> anyhow::Result<Self> {
        if s.len() != OID_LEN * 2 {
            anyhow::bail!(
                "OID hex string must be {} characters, got {}",
                OID_LEN * 2,
                s.len()
            );
        }

        let bytes = hex::decode(s)?;
        let mut oid_bytes = [0u8; OID_LEN];
        oid_bytes.copy_from_slice(&bytes);
        Ok(Oid(oid_bytes))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self.to_hex())
    }
}

impl FromStr for Oid {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Oid::from_hex(s)
    }
}

impl From<[u8; OID_LEN]> for Oid {
    fn from(bytes: [u8; OID_LEN]) -> Self {
        Oid(bytes)
    }
}

// Ledger records carry ids as hex strings, so serialize the same way.
impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Oid::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_vector() {
        assert_eq!(
            Oid::hash(b"").to_hex(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn test_hash_deterministic() {
        let oid1 = Oid::hash(b"test content");
        let oid2 = Oid::hash(b"test content");
        assert_eq!(oid1, oid2, "Same content should produce same OID");
    }

    #[test]
    fn test_hex_roundtrip() {
        let oid1 = Oid::hash(b"test");
        let oid2 = Oid::from_hex(&oid1.to_hex()).unwrap();
        assert_eq!(oid1, oid2);
    }

    #[test]
    fn test_invalid_hex() {
        assert!(Oid::from_hex("too_short").is_err());
        assert!(Oid::from_hex(&"z".repeat(40)).is_err());
        assert!(Oid::from_hex(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_zero() {
        assert!(Oid::ZERO.is_zero());
        assert_eq!(Oid::ZERO.to_hex(), "0".repeat(40));
        assert!(!Oid::hash(b"x").is_zero());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let oid = Oid::hash(b"serde");
        let json = serde_json::to_string(&oid).unwrap();
        assert_eq!(json, format!("\"{}\"", oid.to_hex()));
        let back: Oid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, oid);
    }

    #[test]
    fn test_debug_format() {
        let oid = Oid::ZERO;
        assert_eq!(format!("{:?}", oid), format!("Oid({})", "0".repeat(40)));
    }
}
