//! Range router (§4.F): ordered key-range routing table, per-range Raft
//! group lifecycle, and split/merge.

mod error;
mod router;

pub use error::{RouterError, RouterResult};
pub use router::RangeRouter;
