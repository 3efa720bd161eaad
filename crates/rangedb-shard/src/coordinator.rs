use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rangedb_core::ShardId;

use crate::error::{ShardError, ShardResult};
use crate::worker::ShardWorker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub id: u64,
    pub started_at_ms: u64,
    pub state: OperationState,
    pub shards_involved: Vec<ShardId>,
}

/// Process-wide table of in-flight cross-shard operations (§4.G). A
/// coordinator shard fans a closure out to every involved shard's worker,
/// gathers the results, and records a single pending/completed/failed entry
/// here for observability — the table itself carries no behavior beyond
/// bookkeeping.
pub struct ShardCoordinator {
    next_id: AtomicU64,
    operations: Mutex<HashMap<u64, OperationRecord>>,
}

impl Default for ShardCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardCoordinator {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), operations: Mutex::new(HashMap::new()) }
    }

    fn begin(&self, shards_involved: Vec<ShardId>, now_ms: u64) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.operations.lock().expect("operations mutex poisoned").insert(
            id,
            OperationRecord { id, started_at_ms: now_ms, state: OperationState::Pending, shards_involved },
        );
        id
    }

    fn finish(&self, id: u64, state: OperationState) {
        if let Some(record) = self.operations.lock().expect("operations mutex poisoned").get_mut(&id) {
            record.state = state;
        }
    }

    pub fn operation(&self, id: u64) -> ShardResult<OperationRecord> {
        self.operations
            .lock()
            .expect("operations mutex poisoned")
            .get(&id)
            .cloned()
            .ok_or(ShardError::UnknownOperation(id))
    }

    pub fn pending_operations(&self) -> Vec<OperationRecord> {
        self.operations
            .lock()
            .expect("operations mutex poisoned")
            .values()
            .filter(|r| r.state == OperationState::Pending)
            .cloned()
            .collect()
    }

    /// Fans `make_job(shard_id)` out to every worker in `workers`, awaits
    /// every submission, and records the aggregate outcome as one operation.
    /// Any per-shard job failing to submit marks the whole operation
    /// failed; per-shard panics are not caught (matching the teacher's
    /// fail-fast closure-submission style elsewhere in the workspace).
    pub async fn scatter_gather<F, T>(
        &self,
        workers: &[&ShardWorker],
        now_ms: u64,
        make_job: F,
    ) -> ShardResult<Vec<T>>
    where
        F: Fn(ShardId) -> Box<dyn FnOnce() -> T + Send> + Send,
        T: Send + 'static,
    {
        let shard_ids: Vec<ShardId> = workers.iter().map(|w| w.shard_id()).collect();
        let id = self.begin(shard_ids, now_ms);

        let mut receivers = Vec::with_capacity(workers.len());
        for worker in workers {
            let job = make_job(worker.shard_id());
            match worker.submit(move || job()) {
                Ok(rx) => receivers.push(rx),
                Err(e) => {
                    self.finish(id, OperationState::Failed);
                    return Err(e);
                }
            }
        }

        let mut results = Vec::with_capacity(receivers.len());
        for rx in receivers {
            match rx.await {
                Ok(value) => results.push(value),
                Err(_) => {
                    self.finish(id, OperationState::Failed);
                    return Err(ShardError::WorkerUnavailable(ShardId::new(0)));
                }
            }
        }

        self.finish(id, OperationState::Completed);
        Ok(results)
    }
}
