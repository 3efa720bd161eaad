//! Raft consensus (§4.E): leader election and log replication, generic over
//! the command bytes being replicated. Used both for the cluster-wide
//! metadata group and for each range's own replica group.

mod error;
mod log;
mod message;
mod node;
mod state_machine;
mod transport;

pub use error::{RaftError, RaftResult};
pub use log::LogEntry;
pub use message::RaftMessage;
pub use node::{RaftConfig, RaftNode, RaftState};
pub use state_machine::StateMachine;
pub use transport::{RaftTransport, TransportFuture};
