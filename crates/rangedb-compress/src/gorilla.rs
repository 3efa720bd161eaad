//! Gorilla time-series codec (§4.C): delta-of-delta on timestamps, XOR-with-
//! previous on IEEE-754 doubles with a one-bit same/different flag, final
//! bytes gzip-packed. Lossless — the XOR pipeline never discards mantissa
//! bits.

use std::io::{Read, Write};

use crate::error::CompressionError;

/// One `(timestamp_ms, value)` sample, the unit this codec operates on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp_ms: i64,
    pub value: f64,
}

fn encode_samples(samples: &[Sample]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    if samples.is_empty() {
        return out;
    }

    out.extend_from_slice(&samples[0].timestamp_ms.to_le_bytes());
    out.extend_from_slice(&samples[0].value.to_bits().to_le_bytes());

    let mut prev_ts = samples[0].timestamp_ms;
    let mut prev_delta: i64 = 0;
    let mut prev_bits = samples[0].value.to_bits();

    for s in &samples[1..] {
        let delta = s.timestamp_ms - prev_ts;
        let dod = delta - prev_delta;
        out.extend_from_slice(&dod.to_le_bytes());

        let bits = s.value.to_bits();
        let xor = bits ^ prev_bits;
        if xor == 0 {
            out.push(0);
        } else {
            out.push(1);
            out.extend_from_slice(&xor.to_le_bytes());
        }

        prev_delta = delta;
        prev_ts = s.timestamp_ms;
        prev_bits = bits;
    }
    out
}

fn decode_samples(mut data: &[u8]) -> Result<Vec<Sample>, CompressionError> {
    let bad = || CompressionError::DecompressionFailed("truncated gorilla stream".into());
    let take = |data: &mut &[u8], n: usize| -> Result<Vec<u8>, CompressionError> {
        if data.len() < n {
            return Err(bad());
        }
        let (head, tail) = data.split_at(n);
        *data = tail;
        Ok(head.to_vec())
    };

    let count = u32::from_le_bytes(take(&mut data, 4)?.try_into().unwrap()) as usize;
    let mut out = Vec::with_capacity(count);
    if count == 0 {
        return Ok(out);
    }

    let ts0 = i64::from_le_bytes(take(&mut data, 8)?.try_into().unwrap());
    let bits0 = u64::from_le_bytes(take(&mut data, 8)?.try_into().unwrap());
    out.push(Sample { timestamp_ms: ts0, value: f64::from_bits(bits0) });

    let mut prev_ts = ts0;
    let mut prev_delta: i64 = 0;
    let mut prev_bits = bits0;

    for _ in 1..count {
        let dod = i64::from_le_bytes(take(&mut data, 8)?.try_into().unwrap());
        let delta = prev_delta + dod;
        let ts = prev_ts + delta;

        let flag = take(&mut data, 1)?[0];
        let bits = if flag == 0 {
            prev_bits
        } else {
            prev_bits ^ u64::from_le_bytes(take(&mut data, 8)?.try_into().unwrap())
        };

        out.push(Sample { timestamp_ms: ts, value: f64::from_bits(bits) });
        prev_ts = ts;
        prev_delta = delta;
        prev_bits = bits;
    }
    Ok(out)
}

pub fn compress(samples: &[Sample]) -> Result<Vec<u8>, CompressionError> {
    let raw = encode_samples(samples);
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(&raw)
        .map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CompressionError::CompressionFailed(e.to_string()))
}

pub fn decompress(data: &[u8]) -> Result<Vec<Sample>, CompressionError> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|e| CompressionError::DecompressionFailed(e.to_string()))?;
    decode_samples(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_strategy() -> impl Strategy<Value = Sample> {
        (0i64..1_000_000, any::<u64>()).prop_map(|(ts, bits)| Sample {
            timestamp_ms: ts,
            value: f64::from_bits(bits),
        })
    }

    proptest! {
        #[test]
        fn roundtrips_bit_exact(samples in prop::collection::vec(sample_strategy(), 0..200)) {
            let c = compress(&samples).unwrap();
            let d = decompress(&c).unwrap();
            prop_assert_eq!(d.len(), samples.len());
            for (a, b) in d.iter().zip(samples.iter()) {
                prop_assert_eq!(a.timestamp_ms, b.timestamp_ms);
                prop_assert_eq!(a.value.to_bits(), b.value.to_bits());
            }
        }
    }

    #[test]
    fn constant_series_compresses_xor_to_zero_flags() {
        let samples: Vec<Sample> = (0..50)
            .map(|i| Sample { timestamp_ms: i * 1000, value: 42.0 })
            .collect();
        let encoded = encode_samples(&samples);
        // first sample header is 4 + 8 + 8 = 20 bytes; every subsequent
        // sample then contributes an 8-byte dod plus a single zero flag byte.
        assert_eq!(encoded.len(), 20 + (samples.len() - 1) * 9);
    }

    #[test]
    fn handles_nan_and_infinity() {
        let samples = vec![
            Sample { timestamp_ms: 0, value: f64::NAN },
            Sample { timestamp_ms: 1, value: f64::INFINITY },
            Sample { timestamp_ms: 2, value: f64::NEG_INFINITY },
        ];
        let c = compress(&samples).unwrap();
        let d = decompress(&c).unwrap();
        assert!(d[0].value.is_nan());
        assert_eq!(d[1].value, f64::INFINITY);
        assert_eq!(d[2].value, f64::NEG_INFINITY);
    }
}
