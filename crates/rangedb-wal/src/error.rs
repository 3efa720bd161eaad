#[derive(Debug, thiserror::Error)]
pub enum WalError {
    #[error("wal io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("wal has not been started")]
    NotStarted,
    #[error("wal entry is corrupt: {0}")]
    Corrupt(String),
    #[error("checksum mismatch on wal entry at segment offset {offset}")]
    ChecksumMismatch { offset: u64 },
    #[error("failed to serialize wal entry: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("recovery callback failed: {0}")]
    RecoveryAborted(String),
}

pub type WalResult<T> = Result<T, WalError>;
