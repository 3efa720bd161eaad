//! Approximation of Blosc's byte-shuffle + blocking scheme, built from crates
//! already in the stack (LZ4) rather than binding the C library. Not
//! byte-compatible with the reference Blosc container format.

use crate::error::CompressionError;

const TYPESIZE: usize = 8;

/// Byte-shuffles `data` in fixed-width elements of [`TYPESIZE`] bytes: for
/// each element position `0..TYPESIZE`, gather that byte across all
/// elements contiguously. Groups similar-magnitude bytes together so LZ4
/// finds more redundancy in numeric columnar data. Any trailing remainder
/// shorter than TYPESIZE is appended unshuffled.
fn shuffle(data: &[u8]) -> Vec<u8> {
    let n = data.len() / TYPESIZE;
    let tail = &data[n * TYPESIZE..];
    let mut out = Vec::with_capacity(data.len());
    for byte_pos in 0..TYPESIZE {
        for elem in 0..n {
            out.push(data[elem * TYPESIZE + byte_pos]);
        }
    }
    out.extend_from_slice(tail);
    out
}

fn unshuffle(data: &[u8], original_len: usize) -> Vec<u8> {
    let n = original_len / TYPESIZE;
    let tail_len = original_len - n * TYPESIZE;
    let mut out = vec![0u8; original_len];
    for byte_pos in 0..TYPESIZE {
        for elem in 0..n {
            out[elem * TYPESIZE + byte_pos] = data[byte_pos * n + elem];
        }
    }
    let tail_start = n * TYPESIZE;
    out[tail_start..].copy_from_slice(&data[n * TYPESIZE..n * TYPESIZE + tail_len]);
    out
}

pub fn compress(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let shuffled = shuffle(data);
    let compressed = lz4_flex::compress(&shuffled);
    let mut out = Vec::with_capacity(compressed.len() + 8);
    out.extend_from_slice(&(data.len() as u64).to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    if data.len() < 8 {
        return Err(CompressionError::DecompressionFailed(
            "blosc frame too short".into(),
        ));
    }
    let original_len = u64::from_le_bytes(data[..8].try_into().unwrap()) as usize;
    let shuffled = lz4_flex::decompress(&data[8..], original_len)
        .map_err(|e| CompressionError::DecompressionFailed(e.to_string()))?;
    Ok(unshuffle(&shuffled, original_len))
}
