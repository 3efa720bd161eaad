//! CRDT layer (§4.I): vector clocks and a last-write-wins element set used
//! by replication paths tagged `CRDT_MERGE` in the WAL.

mod lww;
mod vector_clock;

pub use lww::LwwElementSet;
pub use vector_clock::{ClockOrder, VectorClock};
