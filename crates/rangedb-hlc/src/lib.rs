//! Hybrid Logical Clock (§4.A): a monotone, causally ordered timestamp that
//! combines a physical millisecond reading with a logical tie-break counter.
//!
//! The clock never emits a value less than or equal to one it has already
//! emitted, and observing a remote timestamp via [`HlcClock::update`] never
//! moves the clock backward.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A totally ordered `(physical_ms, logical)` pair. Comparison is
/// lexicographic: physical time dominates, logical breaks ties within the
/// same millisecond.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HlcTimestamp {
    pub physical_ms: u64,
    pub logical: u32,
}

impl HlcTimestamp {
    pub const ZERO: HlcTimestamp = HlcTimestamp { physical_ms: 0, logical: 0 };

    pub fn new(physical_ms: u64, logical: u32) -> Self {
        Self { physical_ms, logical }
    }
}

impl std::fmt::Display for HlcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.physical_ms, self.logical)
    }
}

fn wall_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

/// A node-local hybrid logical clock.
///
/// All operations are nonblocking and take a single internal lock; there is
/// no cancellation surface (§4.A: "Cancellation: none").
pub struct HlcClock {
    node_id: u64,
    state: Mutex<HlcTimestamp>,
}

impl HlcClock {
    pub fn new(node_id: u64) -> Self {
        Self {
            node_id,
            state: Mutex::new(HlcTimestamp::ZERO),
        }
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Returns a timestamp strictly greater than any prior `now()`/`update()`
    /// result from this clock.
    pub fn now(&self) -> HlcTimestamp {
        let mut guard = self.state.lock().expect("hlc mutex poisoned");
        let physical_now = wall_now_ms();
        let next = if physical_now > guard.physical_ms {
            HlcTimestamp::new(physical_now, 0)
        } else {
            HlcTimestamp::new(guard.physical_ms, guard.logical + 1)
        };
        *guard = next;
        next
    }

    /// Folds in a remote timestamp observed on an incoming message, per the
    /// four-way case split in §4.A.
    pub fn update(&self, remote: HlcTimestamp) -> HlcTimestamp {
        let mut guard = self.state.lock().expect("hlc mutex poisoned");
        let physical_now = wall_now_ms();
        let max_physical = guard.physical_ms.max(remote.physical_ms).max(physical_now);

        let logical = if max_physical == guard.physical_ms && max_physical == remote.physical_ms {
            guard.logical.max(remote.logical) + 1
        } else if max_physical == guard.physical_ms {
            guard.logical + 1
        } else if max_physical == remote.physical_ms {
            remote.logical + 1
        } else {
            0
        };

        let next = HlcTimestamp::new(max_physical, logical);
        *guard = next;
        tracing::debug!(node_id = self.node_id, remote = %remote, result = %next, "hlc update");
        next
    }

    /// Lexicographic comparison, exposed as a free function for callers that
    /// want to tie-break by node id (LWW) without holding a clock instance.
    pub fn compare(a: HlcTimestamp, b: HlcTimestamp) -> std::cmp::Ordering {
        a.cmp(&b)
    }
}

/// Tie-breaks two equal HLC timestamps by node id, as required by LWW
/// resolution (§4.A "tie-broken by node id where required").
pub fn tie_break(a_ts: HlcTimestamp, a_node: u64, b_ts: HlcTimestamp, b_node: u64) -> std::cmp::Ordering {
    a_ts.cmp(&b_ts).then_with(|| a_node.cmp(&b_node))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_now_calls_are_strictly_monotone() {
        let clock = HlcClock::new(1);
        let mut prev = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > prev, "{next} must be > {prev}");
            prev = next;
        }
    }

    #[test]
    fn update_never_moves_clock_backward() {
        let clock = HlcClock::new(1);
        let t1 = clock.now();
        let stale_remote = HlcTimestamp::new(0, 0);
        let t2 = clock.update(stale_remote);
        assert!(t2 > t1);
    }

    #[test]
    fn update_with_future_remote_adopts_remote_physical() {
        let clock = HlcClock::new(1);
        clock.now();
        let far_future = HlcTimestamp::new(u64::MAX / 2, 7);
        let result = clock.update(far_future);
        assert_eq!(result.physical_ms, far_future.physical_ms);
        assert_eq!(result.logical, far_future.logical + 1);
    }

    #[test]
    fn update_with_equal_physical_takes_max_logical_plus_one() {
        let clock = HlcClock::new(1);
        // Force a known state by updating with a remote far in the future first.
        let fixed = HlcTimestamp::new(1_000_000, 5);
        clock.update(fixed);
        let remote_same_physical = HlcTimestamp::new(1_000_000, 9);
        let result = clock.update(remote_same_physical);
        assert_eq!(result.physical_ms, 1_000_000);
        assert_eq!(result.logical, 10);
    }

    #[test]
    fn compare_is_lexicographic() {
        let a = HlcTimestamp::new(5, 10);
        let b = HlcTimestamp::new(5, 11);
        let c = HlcTimestamp::new(6, 0);
        assert_eq!(HlcClock::compare(a, b), std::cmp::Ordering::Less);
        assert_eq!(HlcClock::compare(b, c), std::cmp::Ordering::Less);
    }

    #[test]
    fn tie_break_uses_node_id_on_equal_timestamps() {
        let ts = HlcTimestamp::new(5, 0);
        assert_eq!(tie_break(ts, 1, ts, 2), std::cmp::Ordering::Less);
        assert_eq!(tie_break(ts, 2, ts, 1), std::cmp::Ordering::Greater);
    }
}
