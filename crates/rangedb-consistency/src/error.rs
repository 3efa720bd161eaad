#[derive(Debug, thiserror::Error)]
pub enum ConsistencyError {
    #[error("no replicas supplied for consistency operation")]
    NoReplicas,
    #[error("required {required} responses but only {n} replicas exist")]
    UnsatisfiableLevel { required: usize, n: usize },
    #[error("replica dispatch failed: {0}")]
    Dispatch(String),
    #[error("timed out waiting for {satisfied}/{required} responses")]
    Timeout { satisfied: usize, required: usize },
}

pub type ConsistencyResult<T> = Result<T, ConsistencyError>;
