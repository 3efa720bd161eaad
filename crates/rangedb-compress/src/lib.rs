//! Compression plane (§4.C): a fixed algorithm enumeration, adaptive
//! selection between them, and three specialized codecs (Gorilla, Delta,
//! RLE) for structured numeric/time-series data.

mod adaptive;
mod algorithm;
mod blosc;
mod codec;
mod delta;
mod error;
mod gorilla;
mod rle;

pub use adaptive::PayloadShape;
pub use algorithm::CompressionAlgorithm;
pub use delta::DeltaValue;
pub use error::CompressionError;
pub use gorilla::Sample as GorillaSample;

use std::collections::HashMap;

/// The result of a `compress` call (§4.C envelope).
#[derive(Debug, Clone)]
pub struct CompressedValue {
    pub compressed_bytes: Vec<u8>,
    pub original_size: usize,
    pub compressed_size: usize,
    pub algorithm_used: CompressionAlgorithm,
    pub metadata: HashMap<String, String>,
    pub checksum: Option<String>,
}

fn envelope(
    original_size: usize,
    compressed_bytes: Vec<u8>,
    algorithm_used: CompressionAlgorithm,
    with_checksum: bool,
) -> CompressedValue {
    let checksum = with_checksum.then(|| blake3::hash(&compressed_bytes).to_hex().to_string());
    CompressedValue {
        compressed_size: compressed_bytes.len(),
        compressed_bytes,
        original_size,
        algorithm_used,
        metadata: HashMap::new(),
        checksum,
    }
}

/// Default adaptive threshold (§4.C: "serialized size < adaptive_threshold,
/// default 1024").
pub const DEFAULT_ADAPTIVE_THRESHOLD: usize = 1024;

/// Compresses raw bytes. When `algo` is `None`, resolves via adaptive
/// byte-shape classification (never selects Gorilla or Delta, which require
/// structured input — see [`compress_gorilla`]/[`compress_delta`]).
pub fn compress(
    data: &[u8],
    algo: Option<CompressionAlgorithm>,
    with_checksum: bool,
) -> Result<CompressedValue, CompressionError> {
    let resolved = match algo {
        Some(CompressionAlgorithm::Gorilla) | Some(CompressionAlgorithm::Delta) => {
            return Err(CompressionError::CompressionFailed(
                "Gorilla/Delta require structured input; use compress_gorilla/compress_delta"
                    .into(),
            ))
        }
        Some(a) => a,
        None => adaptive::select(
            adaptive::classify(data, DEFAULT_ADAPTIVE_THRESHOLD, false),
            false,
        ),
    };

    let bytes = if resolved == CompressionAlgorithm::Rle {
        rle::compress(data)
    } else {
        codec::compress_bytes(data, resolved)?
    };
    Ok(envelope(data.len(), bytes, resolved, with_checksum))
}

/// Decompresses a value previously produced by [`compress`]. Verifies the
/// checksum first, if present.
pub fn decompress(value: &CompressedValue) -> Result<Vec<u8>, CompressionError> {
    if let Some(expected) = &value.checksum {
        let actual = blake3::hash(&value.compressed_bytes).to_hex().to_string();
        if &actual != expected {
            return Err(CompressionError::ChecksumMismatch {
                expected: expected.clone(),
                actual,
            });
        }
    }
    if value.algorithm_used == CompressionAlgorithm::Rle {
        rle::decompress(&value.compressed_bytes)
    } else {
        codec::decompress_bytes(
            &value.compressed_bytes,
            value.algorithm_used,
            Some(value.original_size),
        )
    }
}

pub fn compress_gorilla(
    samples: &[GorillaSample],
    with_checksum: bool,
) -> Result<CompressedValue, CompressionError> {
    let bytes = gorilla::compress(samples)?;
    Ok(envelope(samples.len(), bytes, CompressionAlgorithm::Gorilla, with_checksum))
}

pub fn decompress_gorilla(value: &CompressedValue) -> Result<Vec<GorillaSample>, CompressionError> {
    gorilla::decompress(&value.compressed_bytes)
}

pub fn compress_delta(
    values: &[DeltaValue],
    with_checksum: bool,
) -> Result<CompressedValue, CompressionError> {
    let bytes = delta::compress(values);
    Ok(envelope(values.len(), bytes, CompressionAlgorithm::Delta, with_checksum))
}

pub fn decompress_delta(value: &CompressedValue) -> Result<Vec<DeltaValue>, CompressionError> {
    delta::decompress(&value.compressed_bytes)
}

/// Returns false if compressing `data` is unlikely to be worthwhile — e.g.
/// already-compressed or high-entropy content — sampling at most the first
/// 1KiB with a cheap LZ4 probe.
pub fn is_compressible(data: &[u8]) -> bool {
    if data.len() < 64 {
        return true;
    }
    let sample = &data[..data.len().min(1024)];
    let compressed = lz4_flex::compress_prepend_size(sample);
    (compressed.len() as f64) < (sample.len() as f64 * 0.95)
}
