use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{WalError, WalResult};
use crate::record::{WalEntry, WalEntryType};
use crate::segment::{self, SegmentReader, SegmentWriter};

#[derive(Debug, Clone)]
pub struct WalConfig {
    pub dir: PathBuf,
    pub segment_size_mb: u64,
    pub rotation_check_interval: u64,
    pub max_segments: usize,
    pub sync_on_write: bool,
    pub sync_interval_ms: u64,
    pub recovery_batch_size: usize,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./wal"),
            segment_size_mb: 64,
            rotation_check_interval: 1000,
            max_segments: 10,
            sync_on_write: true,
            sync_interval_ms: 200,
            recovery_batch_size: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalStats {
    pub active_segment_id: u64,
    pub active_segment_bytes: u64,
    pub sealed_segment_count: usize,
    pub next_sequence: u64,
}

struct SealedSegment {
    id: u64,
    last_sequence: u64,
}

struct WalState {
    active: SegmentWriter,
    sealed: Vec<SealedSegment>,
    next_seq: u64,
    entries_since_check: u64,
}

/// Durable, crash-recoverable log of mutations, backed by rotating segment
/// files under `config.dir` (§4.D).
pub struct Wal {
    config: WalConfig,
    state: Mutex<WalState>,
    stop_background: Arc<AtomicBool>,
    background: Mutex<Option<std::thread::JoinHandle<()>>>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl Wal {
    /// Opens (creating if necessary) the WAL directory, scans existing
    /// segments ascending by id to seed the sequence counter, and reopens
    /// only the highest-numbered segment for further appends.
    pub fn start(config: WalConfig) -> WalResult<Arc<Self>> {
        std::fs::create_dir_all(&config.dir)?;
        let ids = segment::list_segment_ids(&config.dir)?;

        let mut sealed = Vec::new();
        let mut max_seq = 0u64;
        let last_id = ids.last().copied();
        let mut active_meta = None;

        for &id in &ids {
            let path = segment::segment_path(&config.dir, id);
            let mut reader = SegmentReader::open(&path)?;
            let mut last_sequence = 0u64;
            let mut count = 0u64;
            loop {
                match reader.next_entry() {
                    Ok(Some(entry)) => {
                        last_sequence = entry.seq;
                        max_seq = max_seq.max(entry.seq);
                        count += 1;
                    }
                    Ok(None) => break,
                    Err(_) if Some(id) == last_id => break,
                    Err(e) => return Err(e),
                }
            }
            if Some(id) == last_id {
                active_meta = Some((id, last_sequence, count));
            } else {
                sealed.push(SealedSegment { id, last_sequence });
            }
        }

        let active = if let Some((id, last_sequence, count)) = active_meta {
            let path = segment::segment_path(&config.dir, id);
            let size_bytes = std::fs::metadata(&path)?.len();
            SegmentWriter::reopen(&config.dir, id, size_bytes, last_sequence, count)?
        } else {
            SegmentWriter::create(&config.dir, 1)?
        };

        let state = WalState {
            active,
            sealed,
            next_seq: max_seq + 1,
            entries_since_check: 0,
        };

        let stop_background = Arc::new(AtomicBool::new(false));
        let wal = Arc::new(Self {
            config: config.clone(),
            state: Mutex::new(state),
            stop_background: stop_background.clone(),
            background: Mutex::new(None),
        });

        if !config.sync_on_write {
            let wal_weak = Arc::downgrade(&wal);
            let interval = Duration::from_millis(config.sync_interval_ms.max(1));
            let stop = stop_background.clone();
            let handle = std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    std::thread::sleep(interval);
                    match wal_weak.upgrade() {
                        Some(wal) => {
                            let _ = wal.sync();
                        }
                        None => break,
                    }
                }
            });
            *wal.background.lock().expect("background mutex poisoned") = Some(handle);
        }

        Ok(wal)
    }

    /// Appends a new entry, returning its assigned sequence number.
    pub fn write_entry(
        &self,
        kind: WalEntryType,
        key: Option<Vec<u8>>,
        value: Option<Vec<u8>>,
        tx_id: Option<u64>,
        meta: serde_json::Value,
    ) -> WalResult<u64> {
        let mut state = self.state.lock().expect("wal mutex poisoned");
        let seq = state.next_seq;
        state.next_seq += 1;

        let entry = WalEntry { kind, seq, ts: now_ms(), key, value, tx_id, meta };
        state.active.append(&entry)?;

        if self.config.sync_on_write {
            state.active.sync()?;
        }

        state.entries_since_check += 1;
        let should_rotate = state.active.size_bytes() >= self.config.segment_size_mb * 1024 * 1024
            || state.entries_since_check >= self.config.rotation_check_interval;

        if should_rotate {
            self.rotate_locked(&mut state)?;
        }

        Ok(seq)
    }

    fn rotate_locked(&self, state: &mut WalState) -> WalResult<()> {
        state.active.sync()?;
        let sealed_id = state.active.id();
        let sealed_last_seq = state.active.last_sequence();

        let new_id = sealed_id + 1;
        let new_active = SegmentWriter::create(&self.config.dir, new_id)?;
        let old_active = std::mem::replace(&mut state.active, new_active);
        drop(old_active);

        state.sealed.push(SealedSegment { id: sealed_id, last_sequence: sealed_last_seq });
        state.entries_since_check = 0;

        if state.sealed.len() > self.config.max_segments {
            state.sealed.sort_by_key(|s| s.id);
            let overflow = state.sealed.len() - self.config.max_segments;
            for sealed in state.sealed.drain(..overflow) {
                let path = segment::segment_path(&self.config.dir, sealed.id);
                let _ = std::fs::remove_file(path);
            }
        }

        tracing::debug!(sealed_id, new_id, "rotated wal segment");
        Ok(())
    }

    /// Forces an fsync of the active segment.
    pub fn sync(&self) -> WalResult<()> {
        let mut state = self.state.lock().expect("wal mutex poisoned");
        state.active.sync()
    }

    fn segment_ids_ascending(&self, state: &WalState) -> Vec<u64> {
        let mut ids: Vec<u64> = state.sealed.iter().map(|s| s.id).collect();
        ids.push(state.active.id());
        ids.sort_unstable();
        ids
    }

    /// Returns a lazy, single-pass iterator over entries in sequence order
    /// across all segments, optionally bounded to `[from_seq, to_seq]`.
    pub fn read_entries(&self, from_seq: Option<u64>, to_seq: Option<u64>) -> WalResult<ReadEntries> {
        let state = self.state.lock().expect("wal mutex poisoned");
        let ids = self.segment_ids_ascending(&state);
        let paths: VecDeque<PathBuf> = ids
            .into_iter()
            .map(|id| segment::segment_path(&self.config.dir, id))
            .collect();
        Ok(ReadEntries { paths, from_seq, to_seq, current: None, done: false })
    }

    /// Replays all entries in batches of `recovery_batch_size`, invoking
    /// `callback` for each. Aborts immediately if `callback` errors. A
    /// truncated tail on the highest-id segment is tolerated; corruption in
    /// any earlier segment is fatal.
    pub fn recover(&self, mut callback: impl FnMut(&WalEntry) -> WalResult<()>) -> WalResult<()> {
        let state = self.state.lock().expect("wal mutex poisoned");
        let ids = self.segment_ids_ascending(&state);
        let last_id = *ids.last().unwrap_or(&0);
        drop(state);

        let mut batch_count = 0usize;
        for id in ids {
            let path = segment::segment_path(&self.config.dir, id);
            let mut reader = SegmentReader::open(&path)?;
            loop {
                match reader.next_entry() {
                    Ok(Some(entry)) => {
                        callback(&entry).map_err(|e| WalError::RecoveryAborted(e.to_string()))?;
                        batch_count += 1;
                        if batch_count >= self.config.recovery_batch_size {
                            batch_count = 0;
                        }
                    }
                    Ok(None) => break,
                    Err(e) if id == last_id => {
                        tracing::warn!(segment_id = id, error = %e, "tolerating truncated tail");
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Writes a CHECKPOINT entry recording that `seq` is durable up to this
    /// point.
    pub fn checkpoint(&self, seq: u64) -> WalResult<u64> {
        self.write_entry(
            WalEntryType::Checkpoint,
            None,
            None,
            None,
            serde_json::json!({ "checkpoint_seq": seq }),
        )
    }

    /// Removes sealed segments whose highest sequence is below `seq`. Never
    /// removes the active segment.
    pub fn truncate_before(&self, seq: u64) -> WalResult<usize> {
        let mut state = self.state.lock().expect("wal mutex poisoned");
        let (to_remove, keep): (Vec<SealedSegment>, Vec<SealedSegment>) =
            state.sealed.drain(..).partition(|s| s.last_sequence < seq);
        state.sealed = keep;

        let removed = to_remove.len();
        for sealed in to_remove {
            let path = segment::segment_path(&self.config.dir, sealed.id);
            std::fs::remove_file(path)?;
        }
        Ok(removed)
    }

    pub fn stats(&self) -> WalStats {
        let state = self.state.lock().expect("wal mutex poisoned");
        WalStats {
            active_segment_id: state.active.id(),
            active_segment_bytes: state.active.size_bytes(),
            sealed_segment_count: state.sealed.len(),
            next_sequence: state.next_seq,
        }
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        self.stop_background.store(true, Ordering::Relaxed);
        if let Some(handle) = self.background.lock().expect("background mutex poisoned").take() {
            let _ = handle.join();
        }
    }
}

/// Iterator over WAL entries across segments, produced by
/// [`Wal::read_entries`].
pub struct ReadEntries {
    paths: VecDeque<PathBuf>,
    from_seq: Option<u64>,
    to_seq: Option<u64>,
    current: Option<SegmentReader>,
    done: bool,
}

impl Iterator for ReadEntries {
    type Item = WalResult<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if self.current.is_none() {
                let path = self.paths.pop_front()?;
                match SegmentReader::open(&path) {
                    Ok(r) => self.current = Some(r),
                    Err(e) => return Some(Err(e)),
                }
            }

            let reader = self.current.as_mut().unwrap();
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    if let Some(from) = self.from_seq {
                        if entry.seq < from {
                            continue;
                        }
                    }
                    if let Some(to) = self.to_seq {
                        if entry.seq > to {
                            self.done = true;
                            return None;
                        }
                    }
                    return Some(Ok(entry));
                }
                Ok(None) => {
                    self.current = None;
                    continue;
                }
                Err(e) => {
                    self.current = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> WalConfig {
        WalConfig {
            dir: dir.to_path_buf(),
            segment_size_mb: 1,
            rotation_check_interval: 3,
            max_segments: 10,
            sync_on_write: true,
            sync_interval_ms: 100,
            recovery_batch_size: 500,
        }
    }

    #[test]
    fn write_and_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::start(test_config(dir.path())).unwrap();

        for i in 0..5 {
            wal.write_entry(
                WalEntryType::Put,
                Some(format!("k{i}").into_bytes()),
                Some(format!("v{i}").into_bytes()),
                None,
                serde_json::json!({}),
            )
            .unwrap();
        }

        let entries: Vec<_> = wal.read_entries(None, None).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(entries.len(), 5);
        let seqs: Vec<u64> = entries.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn sequence_numbers_strictly_increase_across_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let wal = Wal::start(test_config(dir.path())).unwrap();
            for _ in 0..3 {
                wal.write_entry(WalEntryType::Put, None, None, None, serde_json::json!({})).unwrap();
            }
        }
        let wal2 = Wal::start(test_config(dir.path())).unwrap();
        let next = wal2.write_entry(WalEntryType::Put, None, None, None, serde_json::json!({})).unwrap();
        assert_eq!(next, 4);
    }

    #[test]
    fn rotation_happens_at_configured_entry_interval() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::start(test_config(dir.path())).unwrap();
        for _ in 0..3 {
            wal.write_entry(WalEntryType::Put, None, None, None, serde_json::json!({})).unwrap();
        }
        let stats = wal.stats();
        assert_eq!(stats.sealed_segment_count, 1);
        assert_eq!(stats.active_segment_id, 2);
    }

    #[test]
    fn truncate_before_never_removes_active_segment() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::start(test_config(dir.path())).unwrap();
        for _ in 0..6 {
            wal.write_entry(WalEntryType::Put, None, None, None, serde_json::json!({})).unwrap();
        }
        let stats_before = wal.stats();
        assert!(stats_before.sealed_segment_count >= 1);

        let removed = wal.truncate_before(100).unwrap();
        assert_eq!(removed, stats_before.sealed_segment_count);

        let stats_after = wal.stats();
        assert_eq!(stats_after.sealed_segment_count, 0);
        assert!(segment::segment_path(dir.path(), stats_after.active_segment_id).exists());
    }

    #[test]
    fn recover_replays_all_entries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::start(test_config(dir.path())).unwrap();
        for i in 0..10 {
            wal.write_entry(
                WalEntryType::Put,
                None,
                Some(vec![i as u8]),
                None,
                serde_json::json!({}),
            )
            .unwrap();
        }

        let mut replayed = Vec::new();
        wal.recover(|entry| {
            replayed.push(entry.seq);
            Ok(())
        })
        .unwrap();
        assert_eq!(replayed, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn recover_aborts_on_callback_error() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::start(test_config(dir.path())).unwrap();
        for _ in 0..5 {
            wal.write_entry(WalEntryType::Put, None, None, None, serde_json::json!({})).unwrap();
        }

        let mut seen = 0;
        let result = wal.recover(|_| {
            seen += 1;
            if seen == 2 {
                Err(WalError::Corrupt("simulated".into()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert_eq!(seen, 2);
    }

    #[test]
    fn checkpoint_writes_an_entry_with_target_sequence_in_meta() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::start(test_config(dir.path())).unwrap();
        wal.write_entry(WalEntryType::Put, None, None, None, serde_json::json!({})).unwrap();
        let checkpoint_seq = wal.checkpoint(1).unwrap();
        assert_eq!(checkpoint_seq, 2);

        let entries: Vec<_> = wal.read_entries(None, None).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(entries[1].kind, WalEntryType::Checkpoint);
        assert_eq!(entries[1].meta["checkpoint_seq"], 1);
    }
}
