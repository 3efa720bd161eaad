use std::collections::HashMap;
use std::hash::Hash;

use rangedb_hlc::HlcTimestamp;
use serde::{Deserialize, Serialize};

/// A last-write-wins element set (§4.I): `add`/`remove` each stamp the
/// current HLC into a per-element map, `value()` returns elements whose
/// latest add outranks its latest remove, and `merge` takes the per-element
/// max HLC from each side — deterministic regardless of merge order since
/// max-of-maxes is associative and commutative.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LwwElementSet<E: Eq + Hash + Clone> {
    adds: HashMap<E, HlcTimestamp>,
    removes: HashMap<E, HlcTimestamp>,
}

impl<E: Eq + Hash + Clone> Default for LwwElementSet<E> {
    fn default() -> Self {
        Self { adds: HashMap::new(), removes: HashMap::new() }
    }
}

impl<E: Eq + Hash + Clone> LwwElementSet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, element: E, at: HlcTimestamp) {
        let entry = self.adds.entry(element).or_insert(HlcTimestamp::ZERO);
        if at > *entry {
            *entry = at;
        }
    }

    pub fn remove(&mut self, element: E, at: HlcTimestamp) {
        let entry = self.removes.entry(element).or_insert(HlcTimestamp::ZERO);
        if at > *entry {
            *entry = at;
        }
    }

    /// True if `element`'s latest add timestamp outranks its latest remove
    /// (an element with no remove record at all is present).
    pub fn contains(&self, element: &E) -> bool {
        match self.adds.get(element) {
            None => false,
            Some(add_ts) => match self.removes.get(element) {
                None => true,
                Some(remove_ts) => add_ts > remove_ts,
            },
        }
    }

    pub fn value(&self) -> Vec<E> {
        self.adds.keys().filter(|e| self.contains(e)).cloned().collect()
    }

    /// Per-element max HLC from each side, independently for adds and removes.
    pub fn merge(&self, other: &LwwElementSet<E>) -> LwwElementSet<E> {
        let mut merged = self.clone();
        for (element, ts) in &other.adds {
            let entry = merged.adds.entry(element.clone()).or_insert(HlcTimestamp::ZERO);
            if *ts > *entry {
                *entry = *ts;
            }
        }
        for (element, ts) in &other.removes {
            let entry = merged.removes.entry(element.clone()).or_insert(HlcTimestamp::ZERO);
            if *ts > *entry {
                *entry = *ts;
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: u64) -> HlcTimestamp {
        HlcTimestamp::new(ms, 0)
    }

    #[test]
    fn added_element_is_present() {
        let mut set = LwwElementSet::new();
        set.add("a", ts(1));
        assert!(set.contains(&"a"));
    }

    #[test]
    fn remove_after_add_hides_element() {
        let mut set = LwwElementSet::new();
        set.add("a", ts(1));
        set.remove("a", ts(2));
        assert!(!set.contains(&"a"));
    }

    #[test]
    fn re_add_after_remove_wins_if_later() {
        let mut set = LwwElementSet::new();
        set.add("a", ts(1));
        set.remove("a", ts(2));
        set.add("a", ts(3));
        assert!(set.contains(&"a"));
    }

    #[test]
    fn merge_is_commutative_and_deterministic() {
        let mut a = LwwElementSet::new();
        a.add("x", ts(1));
        a.remove("y", ts(5));

        let mut b = LwwElementSet::new();
        b.add("y", ts(1));
        b.remove("x", ts(3));
        b.add("x", ts(10));

        let merged_ab = a.merge(&b);
        let merged_ba = b.merge(&a);

        let mut va = merged_ab.value();
        let mut vb = merged_ba.value();
        va.sort();
        vb.sort();
        assert_eq!(va, vb);
        assert!(merged_ab.contains(&"x")); // add@10 beats remove@3
        assert!(!merged_ab.contains(&"y")); // remove@5 beats add@1
    }

    #[test]
    fn value_lists_only_present_elements() {
        let mut set = LwwElementSet::new();
        set.add("a", ts(1));
        set.add("b", ts(1));
        set.remove("b", ts(2));
        assert_eq!(set.value(), vec!["a"]);
    }
}
