use serde::{Deserialize, Serialize};

use rangedb_core::ShardId;

use crate::error::{ShardError, ShardResult};

/// A shard's migration lifecycle (§4.G: "drains, streams, and cuts over").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardMigrationState {
    Idle,
    Draining,
    Streaming,
    CuttingOver,
    Completed,
    Aborted,
}

impl ShardMigrationState {
    pub fn can_transition_to(&self, target: ShardMigrationState) -> bool {
        use ShardMigrationState::*;
        matches!(
            (self, target),
            (Idle, Draining)
                | (Draining, Streaming)
                | (Draining, Aborted)
                | (Streaming, CuttingOver)
                | (Streaming, Aborted)
                | (CuttingOver, Completed)
                | (CuttingOver, Aborted)
        )
    }
}

/// A planned shard relocation (§4.G's literal field list).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub shard_id: ShardId,
    pub source_node: u32,
    pub target_node: u32,
    pub key_ranges: Vec<(Vec<u8>, Vec<u8>)>,
    pub estimated_size: u64,
    pub priority: u8,
    pub max_downtime_ms: u64,
}

struct Migration {
    plan: MigrationPlan,
    state: ShardMigrationState,
    bytes_streamed: u64,
    started_at_ms: u64,
}

/// Tracks in-flight shard migrations and enforces the drain/stream/cutover
/// state machine. One instance per node; migrations this node is either the
/// source or target of are both tracked here.
#[derive(Default)]
pub struct MigrationManager {
    migrations: std::collections::HashMap<ShardId, Migration>,
}

impl MigrationManager {
    pub fn new() -> Self {
        Self { migrations: std::collections::HashMap::new() }
    }

    pub fn start(&mut self, plan: MigrationPlan, now_ms: u64) -> ShardResult<()> {
        let shard_id = plan.shard_id;
        self.migrations.insert(
            shard_id,
            Migration { plan, state: ShardMigrationState::Idle, bytes_streamed: 0, started_at_ms: now_ms },
        );
        self.transition(shard_id, ShardMigrationState::Draining)
    }

    pub fn state_of(&self, shard_id: ShardId) -> Option<ShardMigrationState> {
        self.migrations.get(&shard_id).map(|m| m.state)
    }

    pub fn plan_of(&self, shard_id: ShardId) -> Option<&MigrationPlan> {
        self.migrations.get(&shard_id).map(|m| &m.plan)
    }

    fn transition(&mut self, shard_id: ShardId, target: ShardMigrationState) -> ShardResult<()> {
        let migration = self.migrations.get_mut(&shard_id).ok_or(ShardError::UnknownShard(shard_id))?;
        if !migration.state.can_transition_to(target) {
            return Err(ShardError::InvalidTransition { from: migration.state, to: target });
        }
        migration.state = target;
        Ok(())
    }

    /// Marks draining complete and begins streaming data to the target node.
    pub fn begin_streaming(&mut self, shard_id: ShardId) -> ShardResult<()> {
        self.transition(shard_id, ShardMigrationState::Streaming)
    }

    pub fn record_progress(&mut self, shard_id: ShardId, bytes_streamed: u64) -> ShardResult<()> {
        let migration = self.migrations.get_mut(&shard_id).ok_or(ShardError::UnknownShard(shard_id))?;
        migration.bytes_streamed = bytes_streamed;
        Ok(())
    }

    pub fn progress_percent(&self, shard_id: ShardId) -> Option<f64> {
        self.migrations.get(&shard_id).map(|m| {
            if m.plan.estimated_size == 0 {
                100.0
            } else {
                (m.bytes_streamed as f64 / m.plan.estimated_size as f64 * 100.0).min(100.0)
            }
        })
    }

    /// Attempts cutover. Aborts (keeping the source authoritative) if
    /// `now_ms - started_at_ms` has exceeded the plan's `max_downtime_ms`.
    pub fn attempt_cutover(&mut self, shard_id: ShardId, now_ms: u64) -> ShardResult<bool> {
        self.transition(shard_id, ShardMigrationState::CuttingOver)?;
        let migration = self.migrations.get(&shard_id).ok_or(ShardError::UnknownShard(shard_id))?;
        let elapsed = now_ms.saturating_sub(migration.started_at_ms);
        if elapsed > migration.plan.max_downtime_ms {
            self.transition(shard_id, ShardMigrationState::Aborted)?;
            return Ok(false);
        }
        self.transition(shard_id, ShardMigrationState::Completed)?;
        Ok(true)
    }

    pub fn abort(&mut self, shard_id: ShardId) -> ShardResult<()> {
        self.transition(shard_id, ShardMigrationState::Aborted)
    }

    pub fn remove(&mut self, shard_id: ShardId) {
        self.migrations.remove(&shard_id);
    }
}
