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

//! Compression for content written to the ledger
//!
//! Blob content is always compressed before it leaves the client. The
//! compressed size decides where it lands: small payloads are stored inline
//! in the ledger record, large ones go to the external content store.
//!
//! # Quick Start
//!
//! ```rust
//! use ledgergit_compression::{Compressor, CompressionLevel, ZstdCompressor};
//!
//! fn main() -> anyhow::Result<()> {
//!     let compressor = ZstdCompressor::new(CompressionLevel::Default);
//!
//!     let original = b"Hello, ledger!";
//!     let compressed = compressor.compress(original)?;
//!     let decompressed = compressor.decompress(&compressed)?;
//!
//!     assert_eq!(original, &decompressed[..]);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod zstd_compressor;

use std::fmt::Debug;

pub use error::{CompressionError, CompressionResult};
pub use zstd_compressor::ZstdCompressor;

/// Compression level configuration
///
/// Balances compression speed vs compression ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Fast compression, larger output (zstd level 1)
    Fast,
    /// Default balance (zstd level 3)
    Default,
    /// Best compression, slower (zstd level 19)
    Best,
}

impl CompressionLevel {
    /// Convert to zstd compression level
    pub fn to_zstd_level(self) -> i32 {
        match self {
            CompressionLevel::Fast => 1,
            CompressionLevel::Default => 3,
            CompressionLevel::Best => 19,
        }
    }
}

/// Compressor trait for pluggable compression implementations
///
/// Both directions are synchronous and CPU-bound.
pub trait Compressor: Send + Sync + Debug {
    /// Compress data
    ///
    /// # Errors
    ///
    /// Returns `CompressionError` if compression fails
    fn compress(&self, data: &[u8]) -> CompressionResult<Vec<u8>>;

    /// Decompress data produced by [`Compressor::compress`]
    ///
    /// # Errors
    ///
    /// Returns `CompressionError` if the input is not valid compressed data
    fn decompress(&self, data: &[u8]) -> CompressionResult<Vec<u8>>;

    /// Name of the algorithm, for logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstd_levels() {
        assert_eq!(CompressionLevel::Fast.to_zstd_level(), 1);
        assert_eq!(CompressionLevel::Default.to_zstd_level(), 3);
        assert_eq!(CompressionLevel::Best.to_zstd_level(), 19);
    }

    #[test]
    fn test_trait_is_object_safe() {
        let compressor: Box<dyn Compressor> = Box::new(ZstdCompressor::default_level());
        assert_eq!(compressor.name(), "zstd");
    }
}
