//! The two [`rangedb_raft::RaftTransport`] implementations this binary
//! ships: `grpc` for real network peers, `in_process` for tests that want a
//! full multi-node Raft group without sockets.

pub mod grpc;
pub mod in_process;
pub mod service;

pub use grpc::GrpcRaftTransport;
pub use in_process::InProcessTransport;
pub use service::RaftRpcService;
