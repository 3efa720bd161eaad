use serde::{Deserialize, Serialize};

/// The full codec enumeration (§4.C). `Adaptive` is never the
/// `algorithm_used` in a [`crate::CompressedValue`] — it is resolved to a
/// concrete algorithm before compression runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CompressionAlgorithm {
    None,
    #[default]
    Lz4,
    Lz4Block,
    Snappy,
    Gzip,
    Zlib,
    Bzip2,
    Zstd {
        level: i32,
    },
    /// Block-shuffle + LZ4 composite. Not byte-compatible with the reference
    /// Blosc container; see DESIGN.md.
    Blosc,
    /// Delta-of-delta timestamps, XOR'd floats, gzip-packed.
    Gorilla,
    Delta,
    Rle,
}

impl CompressionAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            CompressionAlgorithm::None => "NONE",
            CompressionAlgorithm::Lz4 => "LZ4",
            CompressionAlgorithm::Lz4Block => "LZ4_BLOCK",
            CompressionAlgorithm::Snappy => "SNAPPY",
            CompressionAlgorithm::Gzip => "GZIP",
            CompressionAlgorithm::Zlib => "ZLIB",
            CompressionAlgorithm::Bzip2 => "BZIP2",
            CompressionAlgorithm::Zstd { .. } => "ZSTD",
            CompressionAlgorithm::Blosc => "BLOSC",
            CompressionAlgorithm::Gorilla => "GORILLA",
            CompressionAlgorithm::Delta => "DELTA",
            CompressionAlgorithm::Rle => "RLE",
        }
    }
}
