use rangedb_core::{LogIndex, Term};
use serde::{Deserialize, Serialize};

/// One replicated log entry. `command` is an opaque, already-serialized
/// operation; Raft never inspects it, only orders and replicates it (§4.E).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub index: LogIndex,
    pub term: Term,
    pub command: Vec<u8>,
}
