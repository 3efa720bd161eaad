use std::collections::{HashMap, HashSet, VecDeque};

use rangedb_compress::{CompressedValue, CompressionAlgorithm};
use rangedb_core::{CompressionTag, Key, Value};

#[derive(Clone, Debug)]
pub struct ShardStoreConfig {
    pub max_memory_bytes: u64,
    /// Values larger than this are compressed on write (§4.G, default 1 KiB).
    pub compression_threshold_bytes: usize,
    pub enable_compression: bool,
    pub hot_cache_capacity: usize,
    pub hot_cache_promote_after: u32,
}

impl Default for ShardStoreConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: 256 * 1024 * 1024,
            compression_threshold_bytes: 1024,
            enable_compression: true,
            hot_cache_capacity: 64,
            hot_cache_promote_after: 3,
        }
    }
}

enum StoredBytes {
    Raw(Vec<u8>),
    Compressed(CompressedValue),
}

impl StoredBytes {
    fn byte_len(&self) -> usize {
        match self {
            StoredBytes::Raw(b) => b.len(),
            StoredBytes::Compressed(c) => c.compressed_size,
        }
    }
}

struct Entry {
    bytes: StoredBytes,
    hlc_physical_ms: u64,
    hlc_logical: u32,
    generation: u64,
    access_count: u32,
}

/// Per-shard storage: a primary map, an LRU-evicted main cache, and a small
/// fixed "hot" set exempt from eviction once promoted by repeated access
/// (§4.G). Not thread-safe by design — a shard's single worker thread is
/// its only caller.
pub struct ShardStore {
    config: ShardStoreConfig,
    primary: HashMap<Key, Entry>,
    /// Recency order, most-recently-touched at the back. Drives LRU
    /// eviction of everything not in `hot`.
    recency: VecDeque<Key>,
    hot: HashSet<Key>,
    memory_usage: u64,
}

impl ShardStore {
    pub fn new(config: ShardStoreConfig) -> Self {
        Self {
            config,
            primary: HashMap::new(),
            recency: VecDeque::new(),
            hot: HashSet::new(),
            memory_usage: 0,
        }
    }

    pub fn memory_usage(&self) -> u64 {
        self.memory_usage
    }

    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    pub fn is_hot(&self, key: &Key) -> bool {
        self.hot.contains(key)
    }

    fn entry_size(key: &Key, entry: &Entry) -> u64 {
        (key.as_bytes().len() + entry.bytes.byte_len()) as u64
    }

    fn touch(&mut self, key: &Key) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(pos);
        }
        self.recency.push_back(key.clone());
    }

    fn promote_if_due(&mut self, key: &Key, access_count: u32) {
        if access_count < self.config.hot_cache_promote_after || self.hot.contains(key) {
            return;
        }
        if self.hot.len() >= self.config.hot_cache_capacity {
            // Evict the coldest hot entry (front of recency among hot keys).
            if let Some(coldest) = self.recency.iter().find(|k| self.hot.contains(*k)).cloned() {
                self.hot.remove(&coldest);
            } else {
                return;
            }
        }
        self.hot.insert(key.clone());
    }

    fn evict_until_fits(&mut self, incoming: u64) {
        while self.memory_usage + incoming > self.config.max_memory_bytes {
            let victim = self
                .recency
                .iter()
                .position(|k| !self.hot.contains(k))
                .map(|idx| self.recency[idx].clone());
            let Some(victim) = victim else { break };
            self.recency.retain(|k| k != &victim);
            if let Some(entry) = self.primary.remove(&victim) {
                self.memory_usage = self.memory_usage.saturating_sub(Self::entry_size(&victim, &entry));
            }
        }
    }

    /// Stores `value`. Compresses `value.bytes` in place above the
    /// configured threshold; the caller always supplies raw bytes.
    pub fn put(&mut self, key: Key, value: Value) {
        let stored_bytes = if self.config.enable_compression
            && value.bytes.len() > self.config.compression_threshold_bytes
        {
            match rangedb_compress::compress(&value.bytes, None, false) {
                Ok(compressed) if compressed.compressed_size < value.bytes.len() => {
                    StoredBytes::Compressed(compressed)
                }
                _ => StoredBytes::Raw(value.bytes),
            }
        } else {
            StoredBytes::Raw(value.bytes)
        };

        let entry = Entry {
            bytes: stored_bytes,
            hlc_physical_ms: value.hlc_physical_ms,
            hlc_logical: value.hlc_logical,
            generation: value.generation,
            access_count: 0,
        };
        let incoming = Self::entry_size(&key, &entry);
        self.evict_until_fits(incoming);

        if let Some(old) = self.primary.get(&key) {
            self.memory_usage = self.memory_usage.saturating_sub(Self::entry_size(&key, old));
        }
        self.memory_usage += incoming;
        self.primary.insert(key.clone(), entry);
        self.touch(&key);
    }

    /// Returns the value for `key`, transparently decompressing it if it
    /// was stored compressed. Bumps the access count and promotes to the
    /// hot cache once the promotion threshold is crossed.
    pub fn get(&mut self, key: &Key) -> Option<Value> {
        let access_count = {
            let entry = self.primary.get_mut(key)?;
            entry.access_count += 1;
            entry.access_count
        };
        self.touch(key);
        self.promote_if_due(key, access_count);

        let entry = self.primary.get(key)?;
        let (bytes, compression) = match &entry.bytes {
            StoredBytes::Raw(b) => (b.clone(), None),
            StoredBytes::Compressed(c) => match rangedb_compress::decompress(c) {
                Ok(raw) => (raw, None),
                Err(_) => (Vec::new(), Some(to_compression_tag(c.algorithm_used))),
            },
        };
        Some(Value {
            bytes,
            hlc_physical_ms: entry.hlc_physical_ms,
            hlc_logical: entry.hlc_logical,
            compression,
            generation: entry.generation,
        })
    }

    pub fn remove(&mut self, key: &Key) -> bool {
        self.hot.remove(key);
        self.recency.retain(|k| k != key);
        if let Some(entry) = self.primary.remove(key) {
            self.memory_usage = self.memory_usage.saturating_sub(Self::entry_size(key, &entry));
            true
        } else {
            false
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.primary.contains_key(key)
    }
}

fn to_compression_tag(algo: CompressionAlgorithm) -> CompressionTag {
    match algo {
        CompressionAlgorithm::None => CompressionTag::None,
        CompressionAlgorithm::Lz4 => CompressionTag::Lz4,
        CompressionAlgorithm::Lz4Block => CompressionTag::Lz4Block,
        CompressionAlgorithm::Snappy => CompressionTag::Snappy,
        CompressionAlgorithm::Gzip => CompressionTag::Gzip,
        CompressionAlgorithm::Zlib => CompressionTag::Zlib,
        CompressionAlgorithm::Bzip2 => CompressionTag::Bzip2,
        CompressionAlgorithm::Zstd { .. } => CompressionTag::Zstd,
        CompressionAlgorithm::Blosc => CompressionTag::Blosc,
        CompressionAlgorithm::Gorilla => CompressionTag::Gorilla,
        CompressionAlgorithm::Delta => CompressionTag::Delta,
        CompressionAlgorithm::Rle => CompressionTag::Rle,
    }
}
