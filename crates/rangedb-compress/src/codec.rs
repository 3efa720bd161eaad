use std::io::{Read, Write};

use crate::algorithm::CompressionAlgorithm;
use crate::error::CompressionError;

pub fn compress_bytes(data: &[u8], algo: CompressionAlgorithm) -> Result<Vec<u8>, CompressionError> {
    match algo {
        CompressionAlgorithm::None => Ok(data.to_vec()),
        CompressionAlgorithm::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
        CompressionAlgorithm::Lz4Block => Ok(lz4_flex::block::compress(data)),
        CompressionAlgorithm::Snappy => {
            let mut encoder = snap::raw::Encoder::new();
            encoder
                .compress_vec(data)
                .map_err(|e| CompressionError::CompressionFailed(e.to_string()))
        }
        CompressionAlgorithm::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(data)
                .map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CompressionError::CompressionFailed(e.to_string()))
        }
        CompressionAlgorithm::Zlib => {
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(data)
                .map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CompressionError::CompressionFailed(e.to_string()))
        }
        CompressionAlgorithm::Bzip2 => {
            let mut encoder =
                bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder
                .write_all(data)
                .map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CompressionError::CompressionFailed(e.to_string()))
        }
        CompressionAlgorithm::Zstd { level } => zstd::encode_all(data, level)
            .map_err(|e| CompressionError::CompressionFailed(e.to_string())),
        CompressionAlgorithm::Blosc => crate::blosc::compress(data),
        CompressionAlgorithm::Gorilla | CompressionAlgorithm::Delta | CompressionAlgorithm::Rle => {
            unreachable!("specialized codecs are dispatched separately")
        }
    }
}

pub fn decompress_bytes(
    data: &[u8],
    algo: CompressionAlgorithm,
    original_size: Option<usize>,
) -> Result<Vec<u8>, CompressionError> {
    match algo {
        CompressionAlgorithm::None => Ok(data.to_vec()),
        CompressionAlgorithm::Lz4 => lz4_flex::decompress_size_prepended(data)
            .map_err(|e| CompressionError::DecompressionFailed(e.to_string())),
        CompressionAlgorithm::Lz4Block => {
            let cap = original_size.unwrap_or(data.len() * 4);
            lz4_flex::block::decompress(data, cap)
                .map_err(|e| CompressionError::DecompressionFailed(e.to_string()))
        }
        CompressionAlgorithm::Snappy => {
            let mut decoder = snap::raw::Decoder::new();
            decoder
                .decompress_vec(data)
                .map_err(|e| CompressionError::DecompressionFailed(e.to_string()))
        }
        CompressionAlgorithm::Gzip => {
            let mut decoder = flate2::read::GzDecoder::new(data);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| CompressionError::DecompressionFailed(e.to_string()))?;
            Ok(out)
        }
        CompressionAlgorithm::Zlib => {
            let mut decoder = flate2::read::ZlibDecoder::new(data);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| CompressionError::DecompressionFailed(e.to_string()))?;
            Ok(out)
        }
        CompressionAlgorithm::Bzip2 => {
            let mut decoder = bzip2::read::BzDecoder::new(data);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| CompressionError::DecompressionFailed(e.to_string()))?;
            Ok(out)
        }
        CompressionAlgorithm::Zstd { .. } => {
            zstd::decode_all(data).map_err(|e| CompressionError::DecompressionFailed(e.to_string()))
        }
        CompressionAlgorithm::Blosc => crate::blosc::decompress(data),
        CompressionAlgorithm::Gorilla | CompressionAlgorithm::Delta | CompressionAlgorithm::Rle => {
            unreachable!("specialized codecs are dispatched separately")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn general_algos() -> Vec<CompressionAlgorithm> {
        vec![
            CompressionAlgorithm::None,
            CompressionAlgorithm::Lz4,
            CompressionAlgorithm::Snappy,
            CompressionAlgorithm::Gzip,
            CompressionAlgorithm::Zlib,
            CompressionAlgorithm::Bzip2,
            CompressionAlgorithm::Zstd { level: 3 },
        ]
    }

    proptest! {
        #[test]
        fn general_codecs_roundtrip(data in prop::collection::vec(0u8..=255, 0..20_000)) {
            for algo in general_algos() {
                let c = compress_bytes(&data, algo).unwrap();
                let d = decompress_bytes(&c, algo, Some(data.len())).unwrap();
                prop_assert_eq!(d, data.clone());
            }
        }
    }

    #[test]
    fn lz4_block_roundtrips_with_known_size() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let c = compress_bytes(&data, CompressionAlgorithm::Lz4Block).unwrap();
        let d = decompress_bytes(&c, CompressionAlgorithm::Lz4Block, Some(data.len())).unwrap();
        assert_eq!(d, data);
    }

    #[test]
    fn empty_input_roundtrips_for_every_general_algo() {
        for algo in general_algos() {
            let c = compress_bytes(&[], algo).unwrap();
            let d = decompress_bytes(&c, algo, Some(0)).unwrap();
            assert_eq!(d, Vec::<u8>::new());
        }
    }
}
