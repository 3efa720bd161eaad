//! Newtype identifiers shared across crate boundaries.
//!
//! Pattern grounded on `claudefs_meta::types`'s `InodeId`/`NodeId`/`ShardId`/
//! `Term`/`LogIndex` newtypes: a tuple struct with `new`/`as_u64` accessors,
//! `Ord` derived for natural numeric ordering, `Display` for log lines.

use std::fmt;

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(
            Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name($inner);

        impl $name {
            pub const fn new(v: $inner) -> Self {
                $name(v)
            }

            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(v: $inner) -> Self {
                $name(v)
            }
        }
    };
}

id_newtype!(NodeId, u64);
id_newtype!(ShardId, u32);
id_newtype!(RangeId, u64);

/// A Raft term number. Term 0 is the pre-election term every node starts in (§4.E).
id_newtype!(Term, u64);

/// A 1-based, dense Raft log index. `LogIndex::new(0)` denotes "no entry".
id_newtype!(LogIndex, u64);

impl Term {
    pub const ZERO: Term = Term(0);

    pub fn next(self) -> Term {
        Term(self.0 + 1)
    }
}

impl LogIndex {
    pub const NONE: LogIndex = LogIndex(0);

    pub fn next(self) -> LogIndex {
        LogIndex(self.0 + 1)
    }

    pub fn prev(self) -> LogIndex {
        LogIndex(self.0.saturating_sub(1))
    }
}

/// A plain wall-clock timestamp (seconds + nanoseconds since epoch), used for
/// non-causal bookkeeping fields such as `heartbeat_ts` or a hint's `created_ts`.
/// Causally-ordered event timestamps use `rangedb_hlc::HlcTimestamp` instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Timestamp {
    pub secs: u64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock before unix epoch");
        Self {
            secs: now.as_secs(),
            nanos: now.subsec_nanos(),
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.secs * 1000 + (self.nanos / 1_000_000) as u64
    }
}
