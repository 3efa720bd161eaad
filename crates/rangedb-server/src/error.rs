/// Aggregates every subsystem error behind one type so the server binary
/// and its RPC handlers have a single `Result` to thread through.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Wal(#[from] rangedb_wal::WalError),
    #[error(transparent)]
    Raft(#[from] rangedb_raft::RaftError),
    #[error(transparent)]
    Router(#[from] rangedb_router::RouterError),
    #[error(transparent)]
    Shard(#[from] rangedb_shard::ShardError),
    #[error(transparent)]
    Consistency(#[from] rangedb_consistency::ConsistencyError),
    #[error(transparent)]
    Compression(#[from] rangedb_compress::CompressionError),
    #[error("rpc transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
