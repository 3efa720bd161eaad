use rangedb_core::{NodeId, RangeId};

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("no range covers the requested key")]
    RangeNotFound,
    #[error("range {0} not found")]
    UnknownRange(RangeId),
    #[error("no leader elected for range {0}")]
    NotLeader(RangeId),
    #[error("new range must have at least one replica")]
    EmptyReplicas,
    #[error("range {existing} already covers the start key of the proposed range")]
    Overlap { existing: RangeId },
    #[error("split key must fall strictly inside range {0}'s bounds")]
    InvalidSplitKey(RangeId),
    #[error("node {0} is not a replica of range {1}")]
    NotAReplica(NodeId, RangeId),
    #[error("merge_range is reserved and not yet implemented")]
    MergeNotImplemented,
}

pub type RouterResult<T> = Result<T, RouterError>;
