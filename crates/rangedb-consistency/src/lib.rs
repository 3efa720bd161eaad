//! Consistency coordinator (§4.H): tunable quorum read/write, scatter/gather
//! dispatch, read repair, and hinted handoff.

mod coordinator;
mod error;
mod handoff;
mod level;

pub use coordinator::{coordinate_read, coordinate_write, ReadOutcome, WriteOutcome};
pub use error::{ConsistencyError, ConsistencyResult};
pub use handoff::HintedHandoff;
pub use level::{required_responses, ConsistencyLevel, DatacenterReplicas};
