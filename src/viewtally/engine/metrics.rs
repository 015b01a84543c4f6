//! Engine-wide execution metrics
//!
//! Thread-safe counters updated by workers and query submitters. Purely
//! observational: nothing in the engine changes behavior based on these
//! values. Readers tolerate staleness; all updates are relaxed atomics.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Shared counters for pool and query activity.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Work items executed to completion.
    tasks_executed: AtomicU64,

    /// Query invocations through the public API.
    queries_run: AtomicU64,

    /// Rows scanned across all executed work items.
    rows_scanned: AtomicU64,

    /// Cumulative work-item execution time, in microseconds.
    total_task_micros: AtomicU64,

    /// Work items submitted but not yet executed.
    queue_depth: AtomicUsize,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one executed work item covering `rows` rows.
    pub fn record_task(&self, rows: usize, elapsed: Duration) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.rows_scanned.fetch_add(rows as u64, Ordering::Relaxed);
        self.total_task_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.queue_depth.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record one submitted work item.
    pub fn record_submitted(&self) {
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one public query invocation.
    pub fn record_query(&self) {
        self.queries_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Work items currently waiting on the queue.
    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    /// Total work items executed.
    pub fn tasks_executed(&self) -> u64 {
        self.tasks_executed.load(Ordering::Relaxed)
    }

    /// Total public query invocations.
    pub fn queries_run(&self) -> u64 {
        self.queries_run.load(Ordering::Relaxed)
    }

    /// Average work-item execution time in microseconds.
    pub fn avg_task_micros(&self) -> u64 {
        let tasks = self.tasks_executed();
        if tasks == 0 {
            return 0;
        }
        self.total_task_micros.load(Ordering::Relaxed) / tasks
    }

    /// Immutable snapshot for logging or serialization.
    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            tasks_executed: self.tasks_executed(),
            queries_run: self.queries_run(),
            rows_scanned: self.rows_scanned.load(Ordering::Relaxed),
            avg_task_micros: self.avg_task_micros(),
            queue_depth: self.queue_depth(),
        }
    }
}

/// Point-in-time view of [`EngineMetrics`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineMetricsSnapshot {
    pub tasks_executed: u64,
    pub queries_run: u64,
    pub rows_scanned: u64,
    pub avg_task_micros: u64,
    pub queue_depth: usize,
}

impl EngineMetricsSnapshot {
    /// Format metrics for human-readable logging.
    pub fn format_summary(&self) -> String {
        format!(
            "{} queries, {} tasks, {} rows scanned, avg task {}us, queue depth {}",
            self.queries_run,
            self.tasks_executed,
            self.rows_scanned,
            self.avg_task_micros,
            self.queue_depth
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_accounting() {
        let metrics = EngineMetrics::new();
        metrics.record_submitted();
        metrics.record_submitted();
        assert_eq!(metrics.queue_depth(), 2);

        metrics.record_task(100, Duration::from_micros(40));
        metrics.record_task(50, Duration::from_micros(20));
        assert_eq!(metrics.queue_depth(), 0);
        assert_eq!(metrics.tasks_executed(), 2);
        assert_eq!(metrics.avg_task_micros(), 30);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rows_scanned, 150);
        assert!(snapshot.format_summary().contains("2 tasks"));
    }

    #[test]
    fn avg_is_zero_without_tasks() {
        assert_eq!(EngineMetrics::new().avg_task_micros(), 0);
    }
}
