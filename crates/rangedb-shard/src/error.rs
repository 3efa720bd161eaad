use rangedb_core::ShardId;

use crate::migration::ShardMigrationState;

#[derive(Debug, thiserror::Error)]
pub enum ShardError {
    #[error("shard {0} not found")]
    UnknownShard(ShardId),
    #[error("shard {0} already exists")]
    ShardAlreadyExists(ShardId),
    #[error("invalid migration state transition from {from:?} to {to:?}")]
    InvalidTransition { from: ShardMigrationState, to: ShardMigrationState },
    #[error("coordinator operation {0} not found")]
    UnknownOperation(u64),
    #[error("shard worker for {0} is unavailable")]
    WorkerUnavailable(ShardId),
}

pub type ShardResult<T> = Result<T, ShardError>;
