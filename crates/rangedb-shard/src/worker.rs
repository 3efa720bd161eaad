use std::sync::mpsc as std_mpsc;
use std::thread;

use rangedb_core::ShardId;
use tracing::{debug, warn};

use crate::error::{ShardError, ShardResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A single shard's dedicated worker thread and its inbound job queue.
///
/// Shard execution is explicitly single-threaded and synchronous (§5):
/// everything touching a shard's [`crate::store::ShardStore`] runs on this
/// one `std::thread`, never inside an async task, so no locking is needed
/// around shard-local state. Callers reach the shard through
/// [`ShardWorker::submit`], which accepts an ordinary closure and returns a
/// `tokio::sync::oneshot::Receiver` the async caller awaits.
pub struct ShardWorker {
    shard_id: ShardId,
    sender: std_mpsc::Sender<Job>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ShardWorker {
    pub fn spawn(shard_id: ShardId) -> Self {
        let (sender, receiver) = std_mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name(format!("shard-{shard_id}"))
            .spawn(move || {
                debug!(%shard_id, "shard worker thread started");
                for job in receiver {
                    job();
                }
                debug!(%shard_id, "shard worker thread exiting");
            })
            .expect("failed to spawn shard worker thread");

        Self { shard_id, sender, handle: Some(handle) }
    }

    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    /// Submits a closure to run on this shard's worker thread. The result is
    /// delivered through the returned oneshot receiver; an async caller
    /// `.await`s it without blocking the executor.
    pub fn submit<F, T>(&self, f: F) -> ShardResult<tokio::sync::oneshot::Receiver<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let job: Job = Box::new(move || {
            let result = f();
            if tx.send(result).is_err() {
                warn!("shard worker result receiver dropped before completion");
            }
        });
        self.sender.send(job).map_err(|_| ShardError::WorkerUnavailable(self.shard_id))?;
        Ok(rx)
    }
}

impl Drop for ShardWorker {
    fn drop(&mut self) {
        // Dropping `sender` (implicit, as a field of `self`) closes the
        // channel; the worker thread's `for job in receiver` loop then ends
        // naturally and the thread exits.
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submitted_job_runs_on_worker_thread_and_returns_result() {
        let worker = ShardWorker::spawn(ShardId::new(0));
        let rx = worker.submit(|| 2 + 2).unwrap();
        assert_eq!(rx.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn jobs_run_in_submission_order() {
        let worker = ShardWorker::spawn(ShardId::new(1));
        let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut receivers = Vec::new();
        for i in 0..10 {
            let order = order.clone();
            receivers.push(worker.submit(move || order.lock().unwrap().push(i)).unwrap());
        }
        for rx in receivers {
            rx.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn shard_id_is_reported() {
        let worker = ShardWorker::spawn(ShardId::new(7));
        assert_eq!(worker.shard_id(), ShardId::new(7));
    }
}
