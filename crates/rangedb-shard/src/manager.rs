use std::collections::HashMap;
use std::sync::Mutex;

use rangedb_core::{Key, ShardId, Value};
use rangedb_wal::{Wal, WalEntryType};

use crate::coordinator::ShardCoordinator;
use crate::error::{ShardError, ShardResult};
use crate::migration::MigrationManager;
use crate::placement::{NumaTopology, PlacementStrategy, ShardPlacer};
use crate::routing::key_to_shard;
use crate::store::{ShardStore, ShardStoreConfig};
use crate::worker::ShardWorker;

/// A fixed-capacity ring of WAL writes that failed to persist, kept so
/// operators can inspect or replay them once the WAL writer recovers
/// (§4.G: "a local ring of in-memory fallback entries").
pub struct FallbackRing {
    capacity: usize,
    entries: Mutex<std::collections::VecDeque<(Key, Value)>>,
}

impl FallbackRing {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: Mutex::new(std::collections::VecDeque::with_capacity(capacity)) }
    }

    fn push(&self, key: Key, value: Value) {
        let mut entries = self.entries.lock().expect("fallback ring mutex poisoned");
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back((key, value));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("fallback ring mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn drain(&self) -> Vec<(Key, Value)> {
        self.entries.lock().expect("fallback ring mutex poisoned").drain(..).collect()
    }
}

pub struct ShardManagerConfig {
    pub num_shards: Option<u16>,
    pub placement_strategy: PlacementStrategy,
    pub store_config: ShardStoreConfig,
    pub fallback_ring_capacity: usize,
}

impl Default for ShardManagerConfig {
    fn default() -> Self {
        Self {
            num_shards: None,
            placement_strategy: PlacementStrategy::NumaAware,
            store_config: ShardStoreConfig::default(),
            fallback_ring_capacity: 1024,
        }
    }
}

struct Shard {
    store: Mutex<ShardStore>,
    worker: ShardWorker,
}

/// Top-level shard-per-core engine (§4.G): defaults to one shard per
/// physical core, routes keys to shards by [`key_to_shard`], and runs each
/// shard's storage on its own dedicated worker thread.
pub struct ShardManager {
    shards: HashMap<ShardId, Shard>,
    num_shards: u16,
    node_assignment: HashMap<ShardId, u32>,
    wal: Option<std::sync::Arc<Wal>>,
    fallback: FallbackRing,
    coordinator: ShardCoordinator,
    migrations: Mutex<MigrationManager>,
}

impl ShardManager {
    pub fn new(config: ShardManagerConfig, topology: &NumaTopology, wal: Option<std::sync::Arc<Wal>>) -> Self {
        let num_shards = config.num_shards.unwrap_or_else(default_shard_count);
        let node_assignment = ShardPlacer::assign(num_shards, topology, config.placement_strategy);

        let mut shards = HashMap::with_capacity(num_shards as usize);
        for i in 0..num_shards {
            let shard_id = ShardId::new(i as u32);
            shards.insert(
                shard_id,
                Shard {
                    store: Mutex::new(ShardStore::new(config.store_config.clone())),
                    worker: ShardWorker::spawn(shard_id),
                },
            );
        }

        Self {
            shards,
            num_shards,
            node_assignment,
            wal,
            fallback: FallbackRing::new(config.fallback_ring_capacity),
            coordinator: ShardCoordinator::new(),
            migrations: Mutex::new(MigrationManager::new()),
        }
    }

    pub fn num_shards(&self) -> u16 {
        self.num_shards
    }

    pub fn shard_for_key(&self, key: &Key) -> ShardId {
        key_to_shard(key, self.num_shards)
    }

    pub fn node_for_shard(&self, shard_id: ShardId) -> Option<u32> {
        self.node_assignment.get(&shard_id).copied()
    }

    pub fn coordinator(&self) -> &ShardCoordinator {
        &self.coordinator
    }

    pub fn migrations(&self) -> &Mutex<MigrationManager> {
        &self.migrations
    }

    pub fn fallback_ring(&self) -> &FallbackRing {
        &self.fallback
    }

    fn shard(&self, shard_id: ShardId) -> ShardResult<&Shard> {
        self.shards.get(&shard_id).ok_or(ShardError::UnknownShard(shard_id))
    }

    /// Writes `value` to its owning shard's in-memory store and schedules a
    /// fire-and-forget WAL append; a WAL failure does not fail the write,
    /// it lands in the fallback ring instead (§4.G).
    pub fn put(&self, key: Key, value: Value) -> ShardResult<()> {
        let shard_id = self.shard_for_key(&key);
        let shard = self.shard(shard_id)?;

        if let Some(wal) = &self.wal {
            let write_result = wal.write_entry(
                WalEntryType::Put,
                Some(key.as_bytes().to_vec()),
                Some(value.bytes.clone()),
                None,
                serde_json::json!({ "shard_id": shard_id.get() }),
            );
            if write_result.is_err() {
                tracing::warn!(%shard_id, "wal write failed, recording to fallback ring");
                self.fallback.push(key.clone(), value.clone());
            }
        }

        shard.store.lock().expect("shard store mutex poisoned").put(key, value);
        Ok(())
    }

    pub fn get(&self, key: &Key) -> ShardResult<Option<Value>> {
        let shard_id = self.shard_for_key(key);
        let shard = self.shard(shard_id)?;
        Ok(shard.store.lock().expect("shard store mutex poisoned").get(key))
    }

    pub fn remove(&self, key: &Key) -> ShardResult<bool> {
        let shard_id = self.shard_for_key(key);
        let shard = self.shard(shard_id)?;
        Ok(shard.store.lock().expect("shard store mutex poisoned").remove(key))
    }

    pub fn worker(&self, shard_id: ShardId) -> ShardResult<&ShardWorker> {
        Ok(&self.shard(shard_id)?.worker)
    }

    pub fn memory_usage(&self, shard_id: ShardId) -> ShardResult<u64> {
        Ok(self.shard(shard_id)?.store.lock().expect("shard store mutex poisoned").memory_usage())
    }
}

fn default_shard_count() -> u16 {
    std::thread::available_parallelism().map(|n| n.get() as u16).unwrap_or(1)
}
