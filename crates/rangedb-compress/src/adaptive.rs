use crate::algorithm::CompressionAlgorithm;

/// A coarse classification of the payload used to drive adaptive algorithm
/// selection (§4.C). Callers that already know their data's shape can skip
/// classification and pick an algorithm directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Small,
    TextOrJson,
    Numeric,
    /// A sequence of `(timestamp, value)` 2-tuples.
    TimeSeries,
    Other,
}

pub fn classify(data: &[u8], adaptive_threshold: usize, looks_like_pairs: bool) -> PayloadShape {
    if looks_like_pairs {
        return PayloadShape::TimeSeries;
    }
    if data.len() < adaptive_threshold {
        return PayloadShape::Small;
    }
    if looks_like_text(data) {
        return PayloadShape::TextOrJson;
    }
    if looks_like_numeric(data) {
        return PayloadShape::Numeric;
    }
    PayloadShape::Other
}

fn looks_like_text(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(512)];
    let printable = sample
        .iter()
        .filter(|&&b| b == b'\n' || b == b'\t' || (0x20..=0x7e).contains(&b))
        .count();
    sample.is_empty() || (printable as f64 / sample.len() as f64) > 0.85
}

fn looks_like_numeric(data: &[u8]) -> bool {
    data.len() % 8 == 0 && !data.is_empty()
}

/// Chooses a concrete algorithm for `shape`, honoring `prefer_speed` as the
/// tiebreak for payloads that fall through every specialized rule.
pub fn select(shape: PayloadShape, prefer_speed: bool) -> CompressionAlgorithm {
    match shape {
        PayloadShape::Small => CompressionAlgorithm::Lz4,
        PayloadShape::TextOrJson => CompressionAlgorithm::Zstd { level: 3 },
        PayloadShape::Numeric => CompressionAlgorithm::Blosc,
        PayloadShape::TimeSeries => CompressionAlgorithm::Gorilla,
        PayloadShape::Other => {
            if prefer_speed {
                CompressionAlgorithm::Lz4
            } else {
                CompressionAlgorithm::Zstd { level: 3 }
            }
        }
    }
}
