use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use rangedb_core::{Hint, NodeId, Timestamp};

/// Map of `target_node -> queued hints`, oldest-first eviction once a
/// target's queue hits `capacity_per_node`, TTL-based expiry on read
/// (§4.H "Hinted handoff").
pub struct HintedHandoff {
    capacity_per_node: usize,
    hints: Mutex<HashMap<NodeId, VecDeque<Hint>>>,
}

impl HintedHandoff {
    pub fn new(capacity_per_node: usize) -> Self {
        Self { capacity_per_node, hints: Mutex::new(HashMap::new()) }
    }

    /// Stashes a hint for `hint.target_node`, evicting the oldest queued
    /// hint for that node if already at capacity.
    pub fn store(&self, hint: Hint) {
        let mut hints = self.hints.lock().expect("hints mutex poisoned");
        let queue = hints.entry(hint.target_node).or_default();
        if queue.len() >= self.capacity_per_node {
            queue.pop_front();
        }
        queue.push_back(hint);
    }

    pub fn pending_count(&self, target_node: NodeId) -> usize {
        self.hints.lock().expect("hints mutex poisoned").get(&target_node).map_or(0, VecDeque::len)
    }

    /// Returns the unexpired hints queued for `target_node`, dropping
    /// expired ones in the process, without removing the survivors.
    pub fn prune_expired(&self, target_node: NodeId, now: Timestamp) {
        let mut hints = self.hints.lock().expect("hints mutex poisoned");
        if let Some(queue) = hints.get_mut(&target_node) {
            queue.retain(|h| !h.is_expired(now));
        }
    }

    /// Drains the hints queued for `recovered_node` so the caller can
    /// re-send each one; unexpired hints only. Callers that fail to deliver
    /// a hint should re-[`store`] it.
    pub fn replay_hints(&self, recovered_node: NodeId, now: Timestamp) -> Vec<Hint> {
        let mut hints = self.hints.lock().expect("hints mutex poisoned");
        let Some(mut queue) = hints.remove(&recovered_node) else {
            return Vec::new();
        };
        queue.retain(|h| !h.is_expired(now));
        queue.into_iter().collect()
    }

    pub fn node_count(&self) -> usize {
        self.hints.lock().expect("hints mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(target: u64, ttl_secs: u64, created_secs: u64) -> Hint {
        Hint {
            failed_node: NodeId::new(target),
            target_node: NodeId::new(target),
            key: rangedb_core::Key::new(b"k".to_vec()),
            value_bytes: vec![1, 2, 3],
            hlc_physical_ms: 0,
            hlc_logical: 0,
            created_ts: Timestamp { secs: created_secs, nanos: 0 },
            ttl_secs,
        }
    }

    #[test]
    fn store_then_replay_returns_queued_hint() {
        let handoff = HintedHandoff::new(10);
        handoff.store(hint(1, 3600, 0));
        let replayed = handoff.replay_hints(NodeId::new(1), Timestamp { secs: 10, nanos: 0 });
        assert_eq!(replayed.len(), 1);
        assert_eq!(handoff.pending_count(NodeId::new(1)), 0);
    }

    #[test]
    fn oldest_hint_is_evicted_at_capacity() {
        let handoff = HintedHandoff::new(2);
        handoff.store(hint(1, 3600, 0));
        handoff.store(hint(1, 3600, 1));
        handoff.store(hint(1, 3600, 2));
        let replayed = handoff.replay_hints(NodeId::new(1), Timestamp { secs: 5, nanos: 0 });
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0].created_ts.secs, 1);
    }

    #[test]
    fn expired_hints_are_dropped_on_replay() {
        let handoff = HintedHandoff::new(10);
        handoff.store(hint(1, 5, 0));
        let replayed = handoff.replay_hints(NodeId::new(1), Timestamp { secs: 100, nanos: 0 });
        assert!(replayed.is_empty());
    }

    #[test]
    fn replay_of_unknown_node_is_empty() {
        let handoff = HintedHandoff::new(10);
        assert!(handoff.replay_hints(NodeId::new(99), Timestamp::now()).is_empty());
    }
}
