use rangedb_core::{LogIndex, NodeId, Term};
use serde::{Deserialize, Serialize};

use crate::log::LogEntry;

/// Wire messages exchanged between Raft peers (§4.E). Transport-agnostic:
/// the server binary carries these over its RPC layer, tests carry them
/// in-process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RaftMessage {
    RequestVote {
        term: Term,
        candidate: NodeId,
        last_log_index: LogIndex,
        last_log_term: Term,
    },
    RequestVoteResponse {
        term: Term,
        granted: bool,
    },
    AppendEntries {
        term: Term,
        leader: NodeId,
        prev_log_index: LogIndex,
        prev_log_term: Term,
        entries: Vec<LogEntry>,
        leader_commit: LogIndex,
    },
    AppendEntriesResponse {
        term: Term,
        success: bool,
        last_log_index: LogIndex,
        conflict_index: Option<LogIndex>,
    },
    /// Reserved for future snapshot transfer; [`crate::node::RaftNode`] does
    /// not implement it (§4.E allows this initially).
    InstallSnapshot {
        term: Term,
        leader: NodeId,
        last_included_index: LogIndex,
        last_included_term: Term,
    },
}
