//! Data-model entities shared between the router, shard manager, and
//! consistency coordinator (§3.1).

use crate::ids::{NodeId, RangeId, Timestamp};
use crate::Key;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a range, per the migration/split state machine in §9's
/// design notes (`ACTIVE -> DRAINING -> MIGRATING -> ACTIVE`, plus the
/// split/merge states named in §3.1).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeState {
    Active,
    Splitting,
    Merging,
    Offline,
    Relocating,
}

/// A contiguous, non-overlapping slice of the key space owned by one Raft
/// group (§3.1 "Range Descriptor").
///
/// Invariant: ranges partition the keyspace — `end_key` is exclusive, and
/// `generation` strictly increases on every split or merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeDescriptor {
    pub range_id: RangeId,
    pub start_key: Key,
    pub end_key: Key,
    pub replicas: Vec<NodeId>,
    pub leader: Option<NodeId>,
    pub state: RangeState,
    pub generation: u64,
    pub last_modified: Timestamp,
}

impl RangeDescriptor {
    pub fn contains(&self, key: &Key) -> bool {
        key >= &self.start_key && (self.end_key.0.is_empty() || key < &self.end_key)
    }

    /// The §6 JSON wire shape: `{range_id, start_key (hex), end_key (hex), replicas[], leader_node?, state, generation, last_modified}`.
    pub fn to_wire(&self) -> RangeDescriptorWire {
        RangeDescriptorWire {
            range_id: self.range_id.get(),
            start_key: self.start_key.to_hex(),
            end_key: self.end_key.to_hex(),
            replicas: self.replicas.iter().map(|n| n.get()).collect(),
            leader_node: self.leader.map(|n| n.get()),
            state: format!("{:?}", self.state).to_uppercase(),
            generation: self.generation,
            last_modified: self.last_modified.as_millis(),
        }
    }
}

/// JSON-serializable range descriptor matching the bit-exact §6 wire contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RangeDescriptorWire {
    pub range_id: u64,
    pub start_key: String,
    pub end_key: String,
    pub replicas: Vec<u64>,
    pub leader_node: Option<u64>,
    pub state: String,
    pub generation: u64,
    pub last_modified: u64,
}

/// Health and replication-lag snapshot for one replica (§3.1 "Replica Info").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicaInfo {
    pub node_id: NodeId,
    pub host: String,
    pub port: u16,
    pub is_leader: bool,
    pub healthy: bool,
    pub heartbeat_ts: Timestamp,
    pub raft_term: u64,
    pub log_index: u64,
    pub replication_lag_ms: u64,
}

/// A pending write stashed on a healthy replica for a temporarily
/// unreachable peer (§3.1 "Hint", §4.H "Hinted handoff").
///
/// Invariant: expired hints (`created_ts + ttl < now`) are discarded rather
/// than replayed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hint {
    pub failed_node: NodeId,
    pub target_node: NodeId,
    pub key: Key,
    pub value_bytes: Vec<u8>,
    pub hlc_physical_ms: u64,
    pub hlc_logical: u32,
    pub created_ts: Timestamp,
    pub ttl_secs: u64,
}

impl Hint {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.secs.saturating_sub(self.created_ts.secs) >= self.ttl_secs
    }
}
