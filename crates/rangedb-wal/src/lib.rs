//! Write-ahead log (§4.D): durable ordered mutation record, crash recovery,
//! bounded storage via segment rotation and truncation.

mod error;
mod record;
mod segment;
mod wal;

pub use error::{WalError, WalResult};
pub use record::{WalEntry, WalEntryType};
pub use wal::{Wal, WalConfig, WalStats};
