use serde::{Deserialize, Serialize};

use crate::error::{ConsistencyError, ConsistencyResult};

/// The tunable consistency levels a coordinated read or write may request
/// (§4.H). `SERIAL`/`LOCAL_SERIAL` are linearizable variants of
/// `QUORUM`/`LOCAL_QUORUM` — the spec enumerates them as distinct levels but
/// gives their required-response count no separate formula, so they are
/// sized identically to their non-serial counterpart here; the paxos-style
/// round a true SERIAL read would add is a higher-layer concern (the range's
/// Raft group already provides linearizability for committed writes).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalOne,
    LocalQuorum,
    EachQuorum,
    Any,
    Serial,
    LocalSerial,
}

/// Per-datacenter replica counts, used by `LOCAL_*` and `EACH_QUORUM`.
#[derive(Clone, Debug, Default)]
pub struct DatacenterReplicas {
    /// Replica count in the coordinator's own datacenter.
    pub local: usize,
    /// Replica counts for every other datacenter, local DC excluded.
    pub remote: Vec<usize>,
}

/// Computes the number of successful responses required to satisfy `level`
/// against `total` replicas (§4.H's literal formula table).
pub fn required_responses(
    level: ConsistencyLevel,
    total: usize,
    dcs: &DatacenterReplicas,
) -> ConsistencyResult<usize> {
    let required = match level {
        ConsistencyLevel::One | ConsistencyLevel::Any | ConsistencyLevel::LocalOne => 1,
        ConsistencyLevel::Two => 2.min(total),
        ConsistencyLevel::Three => 3.min(total),
        ConsistencyLevel::Quorum | ConsistencyLevel::Serial => total / 2 + 1,
        ConsistencyLevel::All => total,
        ConsistencyLevel::LocalQuorum | ConsistencyLevel::LocalSerial => dcs.local / 2 + 1,
        ConsistencyLevel::EachQuorum => {
            let local_quorum = dcs.local / 2 + 1;
            dcs.remote.iter().map(|&n| n / 2 + 1).sum::<usize>() + local_quorum
        }
    };

    if required > total {
        return Err(ConsistencyError::UnsatisfiableLevel { required, n: total });
    }
    Ok(required)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dcs(local: usize, remote: &[usize]) -> DatacenterReplicas {
        DatacenterReplicas { local, remote: remote.to_vec() }
    }

    #[test]
    fn one_any_local_one_always_require_a_single_response() {
        let d = dcs(3, &[]);
        assert_eq!(required_responses(ConsistencyLevel::One, 5, &d).unwrap(), 1);
        assert_eq!(required_responses(ConsistencyLevel::Any, 5, &d).unwrap(), 1);
        assert_eq!(required_responses(ConsistencyLevel::LocalOne, 5, &d).unwrap(), 1);
    }

    #[test]
    fn two_and_three_are_capped_by_replica_count() {
        let d = dcs(1, &[]);
        assert_eq!(required_responses(ConsistencyLevel::Two, 1, &d).unwrap(), 1);
        assert_eq!(required_responses(ConsistencyLevel::Three, 2, &d).unwrap(), 2);
    }

    #[test]
    fn quorum_is_majority_of_total() {
        let d = dcs(5, &[]);
        assert_eq!(required_responses(ConsistencyLevel::Quorum, 5, &d).unwrap(), 3);
        assert_eq!(required_responses(ConsistencyLevel::Quorum, 4, &d).unwrap(), 3);
    }

    #[test]
    fn all_requires_every_replica() {
        let d = dcs(3, &[]);
        assert_eq!(required_responses(ConsistencyLevel::All, 3, &d).unwrap(), 3);
    }

    #[test]
    fn local_quorum_uses_only_local_dc_count() {
        let d = dcs(3, &[4]);
        assert_eq!(required_responses(ConsistencyLevel::LocalQuorum, 7, &d).unwrap(), 2);
    }

    #[test]
    fn each_quorum_sums_per_dc_quorums() {
        let d = dcs(3, &[3, 2]);
        // local quorum 2 + dc1 quorum 2 + dc2 quorum 2
        assert_eq!(required_responses(ConsistencyLevel::EachQuorum, 8, &d).unwrap(), 6);
    }

    #[test]
    fn unsatisfiable_level_is_rejected() {
        // Caller-supplied local DC count (5) exceeds the claimed total (2).
        assert!(matches!(
            required_responses(ConsistencyLevel::LocalQuorum, 2, &dcs(5, &[])),
            Err(ConsistencyError::UnsatisfiableLevel { .. })
        ));
    }
}
