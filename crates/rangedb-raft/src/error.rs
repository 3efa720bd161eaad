use rangedb_core::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum RaftError {
    #[error("not leader (hint: {leader_hint:?})")]
    NotLeader { leader_hint: Option<NodeId> },
    #[error("install snapshot is reserved and not yet implemented")]
    SnapshotNotImplemented,
}

pub type RaftResult<T> = Result<T, RaftError>;
