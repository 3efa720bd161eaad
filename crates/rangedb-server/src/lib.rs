//! Wires the storage, consensus, and coordination subsystems into one node
//! process: per-shard storage (`rangedb-shard`), range routing
//! (`rangedb-router`), Raft groups (`rangedb-raft`) carried over either
//! gRPC or an in-process transport (`transport`), tunable-consistency
//! coordination (`rangedb-consistency`), CRDTs (`rangedb-crdt`), and
//! pub/sub (`rangedb-pubsub`).

pub mod config;
pub mod error;
pub mod transport;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
