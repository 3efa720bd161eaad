use rangedb_core::LogIndex;

/// Applied to committed entries in order, once per entry (§4.E: "apply loop
/// idempotent per state machine, `last_applied` follows `commit_index`").
///
/// Implementations live one layer up (the range or cluster metadata store
/// that this Raft group is replicating) and decode `command` themselves.
pub trait StateMachine {
    fn apply(&mut self, index: LogIndex, command: &[u8]);
}
