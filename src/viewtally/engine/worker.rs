//! Fixed worker pool draining a shared task queue
//!
//! The pool is created once at engine construction and never resized. Each
//! worker is a long-lived OS thread parked on a blocking receive from the
//! shared unbounded channel; producers (query submitters) push work items
//! from any thread, and whichever worker wakes first executes the item.
//!
//! A worker survives anything a work item does to it: execution runs under
//! `catch_unwind`, so an unwinding item is logged and the worker returns to
//! its receive loop. The item's barrier guard is released by the unwind
//! itself, which is how the submitting query learns it was interrupted.
//!
//! Workers exit only when the channel disconnects, which happens when the
//! owning engine is dropped; the engine joins them on the way out.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};

use crate::viewtally::engine::error::{EngineError, EngineResult};
use crate::viewtally::engine::metrics::EngineMetrics;
use crate::viewtally::engine::query::WorkItem;

/// Long-lived worker threads plus the sending side of their queue.
#[derive(Debug)]
pub struct WorkerPool {
    sender: Option<Sender<WorkItem>>,
    workers: Vec<JoinHandle<()>>,
    metrics: Arc<EngineMetrics>,
}

impl WorkerPool {
    /// Spawn `workers` threads draining a fresh unbounded queue.
    pub fn new(workers: usize, metrics: Arc<EngineMetrics>) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded::<WorkItem>();

        let handles = (0..workers)
            .map(|id| {
                let receiver = receiver.clone();
                let metrics = Arc::clone(&metrics);
                thread::Builder::new()
                    .name(format!("viewtally-worker-{}", id))
                    .spawn(move || worker_loop(id, receiver, metrics))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        debug!("Worker pool started with {} workers", workers);

        Self {
            sender: Some(sender),
            workers: handles,
            metrics,
        }
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue one work item for the next idle worker.
    pub fn submit(&self, item: WorkItem, query: &'static str) -> EngineResult<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(EngineError::Interrupted { query })?;

        self.metrics.record_submitted();
        sender
            .send(item)
            .map_err(|_| EngineError::Interrupted { query })
    }

    /// Disconnect the queue. Blocked workers wake and exit; every later
    /// submission fails with an interrupted error.
    pub(crate) fn close(&mut self) {
        drop(self.sender.take());
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("Worker pool shut down");
    }
}

fn worker_loop(id: usize, receiver: Receiver<WorkItem>, metrics: Arc<EngineMetrics>) {
    debug!("Worker {} waiting for tasks", id);

    // recv blocks while the queue is empty and errs only on disconnect.
    while let Ok(item) = receiver.recv() {
        let rows = item.rows();
        let started = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| item.execute()));
        metrics.record_task(rows, started.elapsed());

        if outcome.is_err() {
            // The unwind already released the item's barrier guard; the
            // submitter sees an interrupted query. The worker lives on.
            warn!("Worker {}: task aborted by panic, resuming loop", id);
        }
    }

    debug!("Worker {}: queue disconnected, exiting", id);
}
