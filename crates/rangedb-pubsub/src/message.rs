use rangedb_hlc::HlcTimestamp;
use serde::{Deserialize, Serialize};

/// A delivered publish (§4.J's literal field list). `id` is the committed
/// Raft log index of the `PUBLISH` command, which is what makes delivery
/// exactly-once per committed entry — replaying the same log index can
/// never produce two distinct messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub channel: String,
    pub data: Vec<u8>,
    pub ts: HlcTimestamp,
    pub id: u64,
}
