use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use rangedb_core::{Key, NodeId, RangeDescriptor, RangeId, RangeState, Term, Timestamp};

use crate::error::{RouterError, RouterResult};

/// Ordered routing table mapping key ranges to their owning Raft group
/// (§4.F). Ranges are keyed by `start_key`; lookup is containment by
/// `BTreeMap::range` over the predecessor-or-equal entry followed by an
/// `end_key` bound check, since `BTreeMap` has no native interval tree.
pub struct RangeRouter {
    by_start: RwLock<BTreeMap<Key, RangeDescriptor>>,
    /// Maps a point lookup directly to the range descriptor's start key.
    /// Invalidated wholesale on any table mutation (insert/update/split/merge).
    point_cache: RwLock<HashMap<Key, Key>>,
}

impl Default for RangeRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeRouter {
    pub fn new() -> Self {
        Self {
            by_start: RwLock::new(BTreeMap::new()),
            point_cache: RwLock::new(HashMap::new()),
        }
    }

    fn invalidate_cache(&self) {
        self.point_cache.write().unwrap().clear();
    }

    /// Registers a brand-new range. Rejects a range whose `start_key`
    /// collides with an existing entry.
    pub fn insert_range(&self, descriptor: RangeDescriptor) -> RouterResult<()> {
        if descriptor.replicas.is_empty() {
            return Err(RouterError::EmptyReplicas);
        }
        let mut table = self.by_start.write().unwrap();
        if let Some(existing) = table.get(&descriptor.start_key) {
            return Err(RouterError::Overlap { existing: existing.range_id });
        }
        table.insert(descriptor.start_key.clone(), descriptor);
        drop(table);
        self.invalidate_cache();
        Ok(())
    }

    /// Finds the range covering `key`, if any.
    pub fn range_for_key(&self, key: &Key) -> RouterResult<RangeDescriptor> {
        if let Some(start) = self.point_cache.read().unwrap().get(key).cloned() {
            if let Some(descriptor) = self.by_start.read().unwrap().get(&start) {
                if descriptor.contains(key) {
                    return Ok(descriptor.clone());
                }
            }
        }

        let table = self.by_start.read().unwrap();
        let candidate = table
            .range(..=key.clone())
            .next_back()
            .map(|(_, descriptor)| descriptor.clone());

        match candidate {
            Some(descriptor) if descriptor.contains(key) => {
                drop(table);
                self.point_cache
                    .write()
                    .unwrap()
                    .insert(key.clone(), descriptor.start_key.clone());
                Ok(descriptor)
            }
            _ => Err(RouterError::RangeNotFound),
        }
    }

    pub fn range_by_id(&self, range_id: RangeId) -> RouterResult<RangeDescriptor> {
        self.by_start
            .read()
            .unwrap()
            .values()
            .find(|d| d.range_id == range_id)
            .cloned()
            .ok_or(RouterError::UnknownRange(range_id))
    }

    /// Leader for the range owning `key`, per §4.F's `leader_for_key`.
    pub fn leader_for_key(&self, key: &Key) -> RouterResult<NodeId> {
        let descriptor = self.range_for_key(key)?;
        descriptor.leader.ok_or(RouterError::NotLeader(descriptor.range_id))
    }

    /// Updates the leader of a range after an election (§4.E/§4.F
    /// integration point).
    pub fn update_leader(&self, range_id: RangeId, leader: NodeId, term: Term) -> RouterResult<()> {
        let mut table = self.by_start.write().unwrap();
        let descriptor = table
            .values_mut()
            .find(|d| d.range_id == range_id)
            .ok_or(RouterError::UnknownRange(range_id))?;

        if !descriptor.replicas.contains(&leader) {
            return Err(RouterError::NotAReplica(leader, range_id));
        }

        descriptor.leader = Some(leader);
        descriptor.last_modified = Timestamp::now();
        tracing::debug!(range = %range_id, leader = %leader, term = term.get(), "range leader updated");
        Ok(())
    }

    /// Splits `range_id` at `split_key` into two ranges: the original range
    /// (shrunk to `[start, split_key)`), and a new range `[split_key, end)`
    /// under `new_range_id`, both with `generation + 1` (§4.F `split_range`).
    ///
    /// Callers are expected to have already driven this decision through the
    /// range's Raft group; this call applies the already-committed outcome
    /// to the routing table.
    pub fn split_range(
        &self,
        range_id: RangeId,
        split_key: Key,
        new_range_id: RangeId,
    ) -> RouterResult<(RangeDescriptor, RangeDescriptor)> {
        let mut table = self.by_start.write().unwrap();

        let original_start = table
            .values()
            .find(|d| d.range_id == range_id)
            .map(|d| d.start_key.clone())
            .ok_or(RouterError::UnknownRange(range_id))?;

        let original = table.remove(&original_start).expect("looked up above");

        if split_key <= original.start_key
            || (!original.end_key.as_bytes().is_empty() && split_key >= original.end_key)
        {
            let restored = original;
            let restart = restored.start_key.clone();
            table.insert(restart, restored);
            return Err(RouterError::InvalidSplitKey(range_id));
        }

        let generation = original.generation + 1;
        let now = Timestamp::now();

        let left = RangeDescriptor {
            range_id: original.range_id,
            start_key: original.start_key.clone(),
            end_key: split_key.clone(),
            replicas: original.replicas.clone(),
            leader: None,
            state: RangeState::Active,
            generation,
            last_modified: now,
        };
        let right = RangeDescriptor {
            range_id: new_range_id,
            start_key: split_key,
            end_key: original.end_key,
            replicas: original.replicas,
            leader: None,
            state: RangeState::Active,
            generation,
            last_modified: now,
        };

        table.insert(left.start_key.clone(), left.clone());
        table.insert(right.start_key.clone(), right.clone());
        drop(table);
        self.invalidate_cache();
        Ok((left, right))
    }

    /// Reserved (§4.F): range merging is not implemented.
    pub fn merge_range(&self, _left: RangeId, _right: RangeId) -> RouterResult<RangeDescriptor> {
        Err(RouterError::MergeNotImplemented)
    }

    /// Strips `node_id` from every range's replica set, clearing the leader
    /// where it was the removed node. Returns ranges left with no replicas.
    pub fn remove_node(&self, node_id: NodeId) -> Vec<RangeId> {
        let mut table = self.by_start.write().unwrap();
        let mut affected = Vec::new();
        for descriptor in table.values_mut() {
            if descriptor.replicas.contains(&node_id) {
                descriptor.replicas.retain(|&n| n != node_id);
                if descriptor.leader == Some(node_id) {
                    descriptor.leader = None;
                }
                if descriptor.replicas.is_empty() {
                    affected.push(descriptor.range_id);
                }
            }
        }
        drop(table);
        self.invalidate_cache();
        affected
    }

    pub fn all_ranges(&self) -> Vec<RangeDescriptor> {
        self.by_start.read().unwrap().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: u64, start: &[u8], end: &[u8], replicas: Vec<u64>) -> RangeDescriptor {
        RangeDescriptor {
            range_id: RangeId::new(id),
            start_key: Key::new(start.to_vec()),
            end_key: Key::new(end.to_vec()),
            replicas: replicas.into_iter().map(NodeId::new).collect(),
            leader: None,
            state: RangeState::Active,
            generation: 0,
            last_modified: Timestamp::now(),
        }
    }

    #[test]
    fn lookup_finds_containing_range() {
        let router = RangeRouter::new();
        router.insert_range(descriptor(1, &[0x00], &[0x50], vec![1, 2])).unwrap();
        router.insert_range(descriptor(2, &[0x50], &[], vec![1, 2])).unwrap();

        let found = router.range_for_key(&Key::new(vec![0x10])).unwrap();
        assert_eq!(found.range_id, RangeId::new(1));

        let found = router.range_for_key(&Key::new(vec![0xff])).unwrap();
        assert_eq!(found.range_id, RangeId::new(2));
    }

    #[test]
    fn lookup_before_any_range_fails() {
        let router = RangeRouter::new();
        router.insert_range(descriptor(1, &[0x10], &[0x20], vec![1])).unwrap();
        assert!(matches!(
            router.range_for_key(&Key::new(vec![0x00])),
            Err(RouterError::RangeNotFound)
        ));
    }

    #[test]
    fn leader_lookup_reflects_update_leader() {
        let router = RangeRouter::new();
        router.insert_range(descriptor(1, &[0x00], &[], vec![1, 2, 3])).unwrap();
        let key = Key::new(vec![0x05]);

        assert!(matches!(router.leader_for_key(&key), Err(RouterError::NotLeader(_))));

        router.update_leader(RangeId::new(1), NodeId::new(2), Term::new(1)).unwrap();
        assert_eq!(router.leader_for_key(&key).unwrap(), NodeId::new(2));
    }

    #[test]
    fn update_leader_rejects_non_replica() {
        let router = RangeRouter::new();
        router.insert_range(descriptor(1, &[0x00], &[], vec![1, 2])).unwrap();
        let err = router
            .update_leader(RangeId::new(1), NodeId::new(99), Term::new(1))
            .unwrap_err();
        assert!(matches!(err, RouterError::NotAReplica(_, _)));
    }

    #[test]
    fn split_range_creates_two_ranges_with_bumped_generation() {
        let router = RangeRouter::new();
        router.insert_range(descriptor(1, &[0x00], &[0x50], vec![1, 2])).unwrap();

        let (left, right) = router
            .split_range(RangeId::new(1), Key::new(vec![0x20]), RangeId::new(2))
            .unwrap();

        assert_eq!(left.range_id, RangeId::new(1));
        assert_eq!(left.end_key, Key::new(vec![0x20]));
        assert_eq!(left.generation, 1);
        assert_eq!(right.range_id, RangeId::new(2));
        assert_eq!(right.start_key, Key::new(vec![0x20]));
        assert_eq!(right.end_key, Key::new(vec![0x50]));
        assert_eq!(right.generation, 1);

        assert_eq!(
            router.range_for_key(&Key::new(vec![0x10])).unwrap().range_id,
            RangeId::new(1)
        );
        assert_eq!(
            router.range_for_key(&Key::new(vec![0x30])).unwrap().range_id,
            RangeId::new(2)
        );
    }

    #[test]
    fn split_range_rejects_key_outside_bounds() {
        let router = RangeRouter::new();
        router.insert_range(descriptor(1, &[0x00], &[0x50], vec![1])).unwrap();
        let err = router
            .split_range(RangeId::new(1), Key::new(vec![0x60]), RangeId::new(2))
            .unwrap_err();
        assert!(matches!(err, RouterError::InvalidSplitKey(_)));
        // original range must still be routable after a rejected split
        assert!(router.range_for_key(&Key::new(vec![0x10])).is_ok());
    }

    #[test]
    fn merge_range_is_reserved() {
        let router = RangeRouter::new();
        let err = router.merge_range(RangeId::new(1), RangeId::new(2)).unwrap_err();
        assert!(matches!(err, RouterError::MergeNotImplemented));
    }

    #[test]
    fn remove_node_clears_leader_and_reports_orphaned_ranges() {
        let router = RangeRouter::new();
        router.insert_range(descriptor(1, &[0x00], &[], vec![1])).unwrap();
        router.insert_range(descriptor(2, &[0x50], &[], vec![1, 2])).unwrap();
        router.update_leader(RangeId::new(1), NodeId::new(1), Term::new(1)).unwrap();
        router.update_leader(RangeId::new(2), NodeId::new(1), Term::new(1)).unwrap();

        let affected = router.remove_node(NodeId::new(1));
        assert_eq!(affected, vec![RangeId::new(1)]);

        let remaining = router.range_by_id(RangeId::new(2)).unwrap();
        assert!(remaining.leader.is_none());
        assert!(!remaining.replicas.contains(&NodeId::new(1)));
    }

    #[test]
    fn point_cache_reflects_post_split_table() {
        let router = RangeRouter::new();
        router.insert_range(descriptor(1, &[0x00], &[0x50], vec![1])).unwrap();
        let key = Key::new(vec![0x30]);
        assert_eq!(router.range_for_key(&key).unwrap().range_id, RangeId::new(1));

        router.split_range(RangeId::new(1), Key::new(vec![0x20]), RangeId::new(2)).unwrap();
        assert_eq!(router.range_for_key(&key).unwrap().range_id, RangeId::new(2));
    }
}
