//! Shard manager (§4.G): shard-per-core placement, per-shard storage,
//! cross-shard coordination, and migration.

mod coordinator;
mod error;
mod manager;
mod migration;
mod placement;
mod routing;
mod store;
mod worker;

pub use coordinator::{OperationRecord, OperationState, ShardCoordinator};
pub use error::{ShardError, ShardResult};
pub use manager::{FallbackRing, ShardManager, ShardManagerConfig};
pub use migration::{MigrationManager, MigrationPlan, ShardMigrationState};
pub use placement::{NumaNode, NumaTopology, PlacementStrategy, ShardPlacer};
pub use routing::key_to_shard;
pub use store::{ShardStore, ShardStoreConfig};
pub use worker::ShardWorker;
