use std::collections::BTreeMap;

use rangedb_core::NodeId;
use serde::{Deserialize, Serialize};

/// How two vector clocks relate in the happens-before partial order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockOrder {
    Less,
    Greater,
    Concurrent,
    Equal,
}

/// A map `node_id -> counter` of monotone per-node event counts (§4.I).
///
/// Unlike a Lamport `(site_id, seq)` pair, a full vector clock tracks every
/// node's contribution independently, so `merge` and `compare` can detect
/// concurrent (non-causally-related) updates rather than only ordering by a
/// single sequence number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock {
    counters: BTreeMap<NodeId, u64>,
}

impl VectorClock {
    pub fn new() -> Self {
        Self { counters: BTreeMap::new() }
    }

    pub fn counter(&self, node: NodeId) -> u64 {
        self.counters.get(&node).copied().unwrap_or(0)
    }

    /// Increments `node`'s counter and returns the updated clock.
    pub fn tick(&mut self, node: NodeId) -> &mut Self {
        *self.counters.entry(node).or_insert(0) += 1;
        self
    }

    /// Elementwise max over every node seen by either clock.
    pub fn merge(&self, other: &VectorClock) -> VectorClock {
        let mut merged = self.counters.clone();
        for (&node, &count) in &other.counters {
            let entry = merged.entry(node).or_insert(0);
            *entry = (*entry).max(count);
        }
        VectorClock { counters: merged }
    }

    /// Compares `self` against `other` per the standard vector-clock partial
    /// order: `self <= other` iff every counter in `self` is `<=` the
    /// corresponding counter in `other`.
    pub fn compare(&self, other: &VectorClock) -> ClockOrder {
        let mut self_less_or_equal = true;
        let mut other_less_or_equal = true;

        for node in self.counters.keys().chain(other.counters.keys()) {
            let a = self.counter(*node);
            let b = other.counter(*node);
            if a > b {
                other_less_or_equal = false;
            }
            if b > a {
                self_less_or_equal = false;
            }
        }

        match (self_less_or_equal, other_less_or_equal) {
            (true, true) => ClockOrder::Equal,
            (true, false) => ClockOrder::Less,
            (false, true) => ClockOrder::Greater,
            (false, false) => ClockOrder::Concurrent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: u64) -> NodeId {
        NodeId::new(n)
    }

    #[test]
    fn fresh_clock_has_zero_counters() {
        let clock = VectorClock::new();
        assert_eq!(clock.counter(node(1)), 0);
    }

    #[test]
    fn tick_increments_only_that_node() {
        let mut clock = VectorClock::new();
        clock.tick(node(1));
        clock.tick(node(1));
        clock.tick(node(2));
        assert_eq!(clock.counter(node(1)), 2);
        assert_eq!(clock.counter(node(2)), 1);
        assert_eq!(clock.counter(node(3)), 0);
    }

    #[test]
    fn merge_takes_elementwise_max() {
        let mut a = VectorClock::new();
        a.tick(node(1)).tick(node(1));
        let mut b = VectorClock::new();
        b.tick(node(1));
        b.tick(node(2));

        let merged = a.merge(&b);
        assert_eq!(merged.counter(node(1)), 2);
        assert_eq!(merged.counter(node(2)), 1);
    }

    #[test]
    fn identical_clocks_compare_equal() {
        let mut a = VectorClock::new();
        a.tick(node(1));
        let b = a.clone();
        assert_eq!(a.compare(&b), ClockOrder::Equal);
    }

    #[test]
    fn strictly_dominating_clock_compares_greater() {
        let mut a = VectorClock::new();
        a.tick(node(1));
        let mut b = a.clone();
        b.tick(node(1));
        assert_eq!(b.compare(&a), ClockOrder::Greater);
        assert_eq!(a.compare(&b), ClockOrder::Less);
    }

    #[test]
    fn divergent_clocks_are_concurrent() {
        let mut a = VectorClock::new();
        a.tick(node(1));
        let mut b = VectorClock::new();
        b.tick(node(2));
        assert_eq!(a.compare(&b), ClockOrder::Concurrent);
        assert_eq!(b.compare(&a), ClockOrder::Concurrent);
    }

    #[test]
    fn merge_of_concurrent_clocks_dominates_both() {
        let mut a = VectorClock::new();
        a.tick(node(1));
        let mut b = VectorClock::new();
        b.tick(node(2));
        let merged = a.merge(&b);
        assert_eq!(merged.compare(&a), ClockOrder::Greater);
        assert_eq!(merged.compare(&b), ClockOrder::Greater);
    }
}
