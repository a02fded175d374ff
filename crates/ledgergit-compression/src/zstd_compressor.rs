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

//! Zstd compression implementation

use crate::error::{CompressionError, CompressionResult};
use crate::{CompressionLevel, Compressor};
use std::fmt;

/// Zstd frame magic
const ZSTD_MAGIC: &[u8] = b"\x28\xb5\x2f\xfd";

/// Zstd compressor implementation
///
/// Decompression is strict: anything that is not a zstd frame is rejected,
/// so corrupted ledger records surface as errors instead of garbage content.
#[derive(Clone)]
pub struct ZstdCompressor {
    level: CompressionLevel,
}

impl ZstdCompressor {
    /// Create a new Zstd compressor with the given compression level
    pub fn new(level: CompressionLevel) -> Self {
        ZstdCompressor { level }
    }

    /// Create a Zstd compressor with default compression
    pub fn default_level() -> Self {
        ZstdCompressor::new(CompressionLevel::Default)
    }
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::default_level()
    }
}

impl fmt::Debug for ZstdCompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZstdCompressor")
            .field("level", &self.level)
            .finish()
    }
}

impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> CompressionResult<Vec<u8>> {
        zstd::encode_all(data, self.level.to_zstd_level()).map_err(|e| {
            CompressionError::compression_failed(format!("zstd compression failed: {}", e))
        })
    }

    fn decompress(&self, data: &[u8]) -> CompressionResult<Vec<u8>> {
        if !data.starts_with(ZSTD_MAGIC) {
            return Err(CompressionError::decompression_failed(
                "input is not a zstd frame",
            ));
        }
        zstd::decode_all(data).map_err(|e| {
            CompressionError::decompression_failed(format!("zstd decompression failed: {}", e))
        })
    }

    fn name(&self) -> &'static str {
        "zstd"
    }
}
