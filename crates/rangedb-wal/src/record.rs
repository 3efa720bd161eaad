use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{WalError, WalResult};

/// Magic prefix of every on-disk entry (§4.D: `magic(4)="WAL1"`).
pub const MAGIC: &[u8; 4] = b"WAL1";

/// The logical entry kind recorded in a WAL entry's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WalEntryType {
    Put,
    Delete,
    Checkpoint,
}

/// A single logical WAL entry (§4.D payload fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    #[serde(rename = "type")]
    pub kind: WalEntryType,
    pub seq: u64,
    pub ts: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<u64>,
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// Encodes one entry as `magic | crc32(payload) | length(payload) | payload`,
/// where `payload` is zlib-compressed JSON (§4.D).
pub fn encode(entry: &WalEntry) -> WalResult<Vec<u8>> {
    let json = serde_json::to_vec(entry)?;
    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&json)?;
    let payload = encoder.finish()?;

    let crc = crc32fast::hash(&payload);
    let mut out = Vec::with_capacity(4 + 4 + 4 + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Reads and decodes exactly one entry from `reader`, returning `Ok(None)` on
/// a clean end-of-stream (no bytes read) or `Err` on a partial/corrupt
/// record, which signals "truncated tail" to the caller.
pub fn read_one<R: Read>(reader: &mut R) -> WalResult<Option<WalEntry>> {
    let mut header = [0u8; 12];
    match read_exact_or_eof(reader, &mut header)? {
        0 => return Ok(None),
        n if n < header.len() => {
            return Err(WalError::Corrupt("truncated entry header".into()))
        }
        _ => {}
    }

    if &header[0..4] != MAGIC {
        return Err(WalError::Corrupt("bad magic".into()));
    }
    let expected_crc = u32::from_le_bytes(header[4..8].try_into().unwrap());
    let len = u32::from_le_bytes(header[8..12].try_into().unwrap()) as usize;

    let mut payload = vec![0u8; len];
    let n = read_exact_or_eof(reader, &mut payload)?;
    if n < len {
        return Err(WalError::Corrupt("truncated entry payload".into()));
    }

    let actual_crc = crc32fast::hash(&payload);
    if actual_crc != expected_crc {
        return Err(WalError::ChecksumMismatch { offset: 0 });
    }

    let mut decoder = flate2::read::ZlibDecoder::new(&payload[..]);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| WalError::Corrupt(format!("zlib inflate failed: {e}")))?;

    let entry: WalEntry = serde_json::from_slice(&json)?;
    Ok(Some(entry))
}

fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
