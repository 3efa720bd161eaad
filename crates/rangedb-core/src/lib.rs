//! Shared newtypes and data-model entities used across subsystem crate boundaries.
//!
//! Mirrors the role `claudefs_meta::types` plays in the teacher workspace: every
//! other `rangedb-*` crate depends on this one for identifiers and wire-shared
//! structs, never the other way around.

pub mod entities;
pub mod ids;

pub use entities::{Hint, RangeDescriptor, RangeState, ReplicaInfo};
pub use ids::{LogIndex, NodeId, RangeId, ShardId, Term, Timestamp};

/// An opaque, lexicographically ordered byte key.
///
/// Keys sort by their raw byte representation; callers that need numeric or
/// structured ordering must encode it into the byte layout themselves.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Key(#[serde(with = "serde_bytes")] pub Vec<u8>);

impl Key {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex encoding used by the range descriptor wire format (§6).
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyHexError> {
        if s.len() % 2 != 0 {
            return Err(KeyHexError::OddLength);
        }
        let mut out = Vec::with_capacity(s.len() / 2);
        let bytes = s.as_bytes();
        for chunk in bytes.chunks(2) {
            let hi = hex_nibble(chunk[0]).ok_or(KeyHexError::BadDigit)?;
            let lo = hex_nibble(chunk[1]).ok_or(KeyHexError::BadDigit)?;
            out.push((hi << 4) | lo);
        }
        Ok(Key(out))
    }
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeyHexError {
    #[error("hex string has odd length")]
    OddLength,
    #[error("invalid hex digit")]
    BadDigit,
}

/// An optional compression tag attached to a stored value, naming the codec
/// used by [`rangedb-compress`] when the value was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CompressionTag {
    None,
    Lz4,
    Lz4Block,
    Snappy,
    Gzip,
    Zlib,
    Bzip2,
    Zstd,
    Blosc,
    Gorilla,
    Delta,
    Rle,
}

/// The stored unit of a key's value: raw bytes plus the HLC timestamp that
/// last wrote it and an optional compression tag (§3.1 "Value").
///
/// `generation` is a local optimistic-concurrency counter bumped on every
/// write to this value within a shard; it is not part of the wire contract
/// in §6 and exists purely for in-memory CAS checks at the shard layer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Value {
    #[serde(with = "serde_bytes")]
    pub bytes: Vec<u8>,
    pub hlc_physical_ms: u64,
    pub hlc_logical: u32,
    pub compression: Option<CompressionTag>,
    pub generation: u64,
}

impl Value {
    pub fn new(bytes: impl Into<Vec<u8>>, hlc_physical_ms: u64, hlc_logical: u32) -> Self {
        Self {
            bytes: bytes.into(),
            hlc_physical_ms,
            hlc_logical,
            compression: None,
            generation: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_hex_round_trip() {
        let k = Key::new(vec![0x00, 0x7f, 0xff]);
        let hex = k.to_hex();
        assert_eq!(hex, "007fff");
        assert_eq!(Key::from_hex(&hex).unwrap(), k);
    }

    #[test]
    fn key_from_hex_rejects_odd_length() {
        assert!(matches!(Key::from_hex("abc"), Err(KeyHexError::OddLength)));
    }

    #[test]
    fn key_ordering_is_lexicographic() {
        let a = Key::new(vec![0x01]);
        let b = Key::new(vec![0x02]);
        let c = Key::new(vec![0x01, 0x00]);
        assert!(a < b);
        assert!(a < c);
    }

    #[test]
    fn value_round_trips_through_bincode() {
        let v = Value::new(b"hello".to_vec(), 42, 3);
        let encoded = bincode::serialize(&v).unwrap();
        let decoded: Value = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, v);
    }
}
