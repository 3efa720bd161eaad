use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::WalResult;
use crate::record::{self, WalEntry};

/// Segment files are named `wal-{id:06d}.log`, matching the reference
/// implementation this engine's on-disk layout is modeled on.
pub fn segment_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("wal-{id:06d}.log"))
}

/// Parses a segment id back out of a `wal-NNNNNN.log` filename. Returns
/// `None` for any other filename found in the WAL directory.
pub fn parse_segment_id(file_name: &str) -> Option<u64> {
    let stripped = file_name.strip_prefix("wal-")?.strip_suffix(".log")?;
    stripped.parse().ok()
}

/// An open segment accepting new entries.
pub struct SegmentWriter {
    id: u64,
    path: PathBuf,
    file: BufWriter<File>,
    size_bytes: u64,
    first_sequence: Option<u64>,
    last_sequence: u64,
    entry_count: u64,
}

impl SegmentWriter {
    pub fn create(dir: &Path, id: u64) -> WalResult<Self> {
        let path = segment_path(dir, id);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            id,
            path,
            file: BufWriter::new(file),
            size_bytes: 0,
            first_sequence: None,
            last_sequence: 0,
            entry_count: 0,
        })
    }

    /// Reopens an existing segment for further appends (only the
    /// highest-numbered segment is ever reopened this way, on startup).
    pub fn reopen(dir: &Path, id: u64, size_bytes: u64, last_sequence: u64, entry_count: u64) -> WalResult<Self> {
        let path = segment_path(dir, id);
        let file = OpenOptions::new().append(true).open(&path)?;
        Ok(Self {
            id,
            path,
            file: BufWriter::new(file),
            size_bytes,
            first_sequence: if entry_count == 0 { None } else { Some(1) },
            last_sequence,
            entry_count,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn append(&mut self, entry: &WalEntry) -> WalResult<()> {
        let bytes = record::encode(entry)?;
        self.file.write_all(&bytes)?;
        self.size_bytes += bytes.len() as u64;
        self.entry_count += 1;
        self.first_sequence.get_or_insert(entry.seq);
        self.last_sequence = entry.seq;
        Ok(())
    }

    pub fn sync(&mut self) -> WalResult<()> {
        self.file.flush()?;
        self.file.get_ref().sync_data()?;
        Ok(())
    }
}

/// A reader over a single sealed or active segment, yielding decoded entries
/// in order. Stops (returning the underlying error) on the first corrupt or
/// truncated record.
pub struct SegmentReader {
    reader: BufReader<File>,
}

impl SegmentReader {
    pub fn open(path: &Path) -> WalResult<Self> {
        let file = File::open(path)?;
        Ok(Self { reader: BufReader::new(file) })
    }

    pub fn next_entry(&mut self) -> WalResult<Option<WalEntry>> {
        record::read_one(&mut self.reader)
    }
}

/// Lists segment ids present in `dir`, ascending.
pub fn list_segment_ids(dir: &Path) -> WalResult<Vec<u64>> {
    let mut ids = Vec::new();
    if !dir.exists() {
        return Ok(ids);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if let Some(id) = parse_segment_id(name) {
                ids.push(id);
            }
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_filename_is_zero_padded_six_digits() {
        let path = segment_path(Path::new("/tmp/wal"), 7);
        assert_eq!(path.file_name().unwrap(), "wal-000007.log");
    }

    #[test]
    fn parse_segment_id_roundtrips() {
        assert_eq!(parse_segment_id("wal-000042.log"), Some(42));
        assert_eq!(parse_segment_id("not-a-segment.txt"), None);
    }

    #[test]
    fn list_segment_ids_sorted_ascending() {
        let dir = tempfile::tempdir().unwrap();
        for id in [3, 1, 2] {
            SegmentWriter::create(dir.path(), id).unwrap();
        }
        assert_eq!(list_segment_ids(dir.path()).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn write_then_read_back_entry() {
        use crate::record::WalEntryType;
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SegmentWriter::create(dir.path(), 1).unwrap();
        let entry = WalEntry {
            kind: WalEntryType::Put,
            seq: 1,
            ts: 100,
            key: Some(b"k".to_vec()),
            value: Some(b"v".to_vec()),
            tx_id: None,
            meta: serde_json::json!({}),
        };
        writer.append(&entry).unwrap();
        writer.sync().unwrap();

        let mut reader = SegmentReader::open(&segment_path(dir.path(), 1)).unwrap();
        let read_back = reader.next_entry().unwrap().unwrap();
        assert_eq!(read_back.seq, 1);
        assert!(reader.next_entry().unwrap().is_none());
    }
}
