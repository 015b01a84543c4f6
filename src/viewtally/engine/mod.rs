//! Parallel aggregation engine over the visit-count matrix
//!
//! The engine owns the count matrix and a fixed pool of worker threads.
//! Every query follows the same fan-out/reduce template: partition the row
//! space into `task_count` sub-ranges, submit one work item per sub-range
//! to the shared queue, block on a per-query completion barrier, then sum
//! the per-item partial counts and apply the query's final transform.
//!
//! Queries are synchronous, stateless, and safe to issue concurrently from
//! any number of caller threads; concurrent queries interleave freely on
//! the queue but never share a barrier, so they cannot contaminate each
//! other's counts. Results are invariant to both the partition granularity
//! and the worker count.
//!
//! A query whose fan-out is interrupted (a work item unwound before
//! completing) reports a sentinel value rather than blocking forever or
//! panicking across the public boundary: `false` for boolean queries and
//! `-1` for numeric ones. The sentinel is indistinguishable from a
//! legitimate "no"/zero answer by design; callers that need to tell them
//! apart can use the `try_*` variants, which return the underlying
//! [`EngineError`] instead.

pub mod barrier;
pub mod error;
pub mod matrix;
pub mod metrics;
pub mod partition;
pub mod query;
pub mod worker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::viewtally::load::progress::LoadProgress;
use crate::viewtally::load::Loader;

pub use barrier::CompletionBarrier;
pub use error::{EngineError, EngineResult};
pub use matrix::CountMatrix;
pub use metrics::{EngineMetrics, EngineMetricsSnapshot};
pub use partition::{subranges, RowRange};
pub use query::QueryOp;
pub use worker::WorkerPool;

use query::WorkItem;

/// Sentinel returned by numeric queries whose fan-out was interrupted.
pub const QUERY_FAILED: i64 = -1;

/// Default partition granularity: sub-ranges per query, independent of the
/// worker count so uneven sub-ranges self-balance across the pool.
pub const DEFAULT_TASK_COUNT: usize = 24;

/// Tuning knobs fixed at engine construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker threads in the pool. Defaults to the host's available
    /// parallelism.
    pub workers: usize,

    /// Work items per query fan-out.
    pub task_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            task_count: DEFAULT_TASK_COUNT,
        }
    }
}

impl EngineConfig {
    /// Override the partition granularity.
    pub fn with_task_count(mut self, task_count: usize) -> Self {
        self.task_count = task_count;
        self
    }

    /// Override the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Small configuration for tests.
    pub fn fast_test() -> Self {
        Self {
            workers: 2,
            task_count: 4,
        }
    }
}

/// Aggregation engine: matrix, worker pool, and the query surface.
#[derive(Debug)]
pub struct Engine {
    matrix: Arc<CountMatrix>,
    pool: WorkerPool,
    progress: Arc<LoadProgress>,
    metrics: Arc<EngineMetrics>,
    task_count: usize,
}

impl Engine {
    /// Allocate a zeroed `rows x cols` matrix and start the worker pool
    /// with default configuration.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_config(rows, cols, EngineConfig::default())
    }

    /// Allocate the matrix and start the pool with explicit configuration.
    pub fn with_config(rows: usize, cols: usize, config: EngineConfig) -> Self {
        info!(
            "Starting engine: {}x{} matrix, {} workers, {} tasks per query",
            rows, cols, config.workers, config.task_count
        );

        let metrics = Arc::new(EngineMetrics::new());
        Self {
            matrix: Arc::new(CountMatrix::new(rows, cols)),
            pool: WorkerPool::new(config.workers, Arc::clone(&metrics)),
            progress: Arc::new(LoadProgress::new(rows)),
            metrics,
            task_count: config.task_count.max(1),
        }
    }

    /// Total subject rows.
    pub fn total_rows(&self) -> usize {
        self.matrix.rows()
    }

    /// Category columns.
    pub fn total_categories(&self) -> usize {
        self.matrix.cols()
    }

    /// Rows the loader has finished so far. Monotonic; readers tolerate
    /// staleness.
    pub fn rows_loaded(&self) -> usize {
        self.progress.rows_loaded()
    }

    /// Shared load-progress tracker, for pollers such as progress bars.
    pub fn progress(&self) -> Arc<LoadProgress> {
        Arc::clone(&self.progress)
    }

    /// Execution metrics snapshot.
    pub fn metrics_snapshot(&self) -> EngineMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Build a loader with write access to this engine's matrix and
    /// progress counter.
    pub fn loader(&self) -> Loader {
        Loader::new(Arc::clone(&self.matrix), Arc::clone(&self.progress))
    }

    /// Checked cell write, for collaborators loading untrusted indices.
    pub fn set_cell(&self, row: usize, col: usize, value: u32) -> EngineResult<()> {
        self.matrix.try_set(row, col, value)
    }

    /// Checked cell read.
    pub fn get_cell(&self, row: usize, col: usize) -> EngineResult<u32> {
        self.matrix.try_get(row, col)
    }

    // ---- query surface --------------------------------------------------

    /// Subjects with at least `threshold` visits to `category`.
    /// Returns [`QUERY_FAILED`] if interrupted.
    pub fn count_at_least(&self, category: usize, threshold: u32) -> i64 {
        self.numeric(self.try_count_at_least(category, threshold))
    }

    /// Whether strictly more than `bound` subjects visited `category` at
    /// least once. Returns `false` if interrupted.
    pub fn count_query(&self, bound: u64, category: usize) -> bool {
        self.boolean(self.try_count_query(bound, category))
    }

    /// Percentage of subjects (0..=100) visiting `category` at least once.
    /// Returns `-1.0` if interrupted.
    pub fn percentage_count_query(&self, category: usize) -> f64 {
        self.float(self.try_percentage_count_query(category))
    }

    /// Whether strictly more subjects visited `category_a` than
    /// `category_b` at least once. Equal counts compare `false` in both
    /// directions. Returns `false` if interrupted.
    pub fn comparison_query(&self, category_a: usize, category_b: usize) -> bool {
        self.boolean(self.try_comparison_query(category_a, category_b))
    }

    /// Subjects with at least `threshold` visits to `category`, as a raw
    /// count. Returns [`QUERY_FAILED`] if interrupted.
    pub fn count_threshold_query(&self, threshold: u32, category: usize) -> i64 {
        self.numeric(self.try_count_at_least(category, threshold))
    }

    /// Percentage of subjects whose `category_a` count strictly exceeds
    /// their `category_b` count. Returns `-1.0` if interrupted.
    pub fn compare_percentage_query(&self, category_a: usize, category_b: usize) -> f64 {
        self.float(self.try_compare_percentage_query(category_a, category_b))
    }

    // ---- fallible variants ----------------------------------------------

    /// [`Engine::count_at_least`] with the error surfaced.
    pub fn try_count_at_least(&self, category: usize, threshold: u32) -> EngineResult<u64> {
        self.run_count(
            QueryOp::CountAtLeast {
                category,
                threshold,
            },
            "count_at_least",
        )
    }

    /// [`Engine::count_query`] with the error surfaced.
    pub fn try_count_query(&self, bound: u64, category: usize) -> EngineResult<bool> {
        Ok(self.try_count_at_least(category, 1)? > bound)
    }

    /// [`Engine::percentage_count_query`] with the error surfaced.
    pub fn try_percentage_count_query(&self, category: usize) -> EngineResult<f64> {
        let matches = self.try_count_at_least(category, 1)?;
        Ok(self.as_percentage(matches))
    }

    /// [`Engine::comparison_query`] with the error surfaced.
    ///
    /// Runs two full sequential fan-outs, one per category, and compares
    /// the counts.
    pub fn try_comparison_query(&self, category_a: usize, category_b: usize) -> EngineResult<bool> {
        let count_a = self.try_count_at_least(category_a, 1)?;
        let count_b = self.try_count_at_least(category_b, 1)?;
        Ok(count_a > count_b)
    }

    /// [`Engine::compare_percentage_query`] with the error surfaced.
    pub fn try_compare_percentage_query(
        &self,
        category_a: usize,
        category_b: usize,
    ) -> EngineResult<f64> {
        let matches = self.run_count(
            QueryOp::CountGreater {
                category_a,
                category_b,
            },
            "compare_percentage_query",
        )?;
        Ok(self.as_percentage(matches))
    }

    // ---- fan-out/reduce template ----------------------------------------

    /// Fan one counting predicate out over the whole row space and sum the
    /// per-range partial counts.
    fn run_count(&self, op: QueryOp, query: &'static str) -> EngineResult<u64> {
        // Category bounds are the caller's contract; a violation is a
        // programmer error, surfaced here rather than from inside a worker.
        assert!(
            op.max_category() < self.matrix.cols() || self.matrix.rows() == 0,
            "category {} out of range for {} categories",
            op.max_category(),
            self.matrix.cols()
        );

        self.metrics.record_query();

        let ranges = subranges(self.matrix.rows(), self.task_count);
        let barrier = CompletionBarrier::new(ranges.len());
        let mut slots = Vec::with_capacity(ranges.len());

        debug!("{}: fanning out {} work items", query, ranges.len());

        for range in ranges {
            let result = Arc::new(AtomicU64::new(0));
            slots.push(Arc::clone(&result));
            let item = WorkItem::new(
                range,
                op,
                Arc::clone(&self.matrix),
                result,
                barrier.guard(),
            );
            self.pool.submit(item, query)?;
        }

        barrier.wait(query)?;

        Ok(slots.iter().map(|slot| slot.load(Ordering::Relaxed)).sum())
    }

    fn as_percentage(&self, matches: u64) -> f64 {
        let rows = self.matrix.rows();
        if rows == 0 {
            return 0.0;
        }
        matches as f64 / rows as f64 * 100.0
    }

    // ---- sentinel conversion --------------------------------------------

    fn numeric(&self, result: EngineResult<u64>) -> i64 {
        match result {
            Ok(count) => count as i64,
            Err(err) => {
                warn!("Query failed, reporting sentinel: {}", err);
                QUERY_FAILED
            }
        }
    }

    fn boolean(&self, result: EngineResult<bool>) -> bool {
        match result {
            Ok(answer) => answer,
            Err(err) => {
                warn!("Query failed, reporting sentinel: {}", err);
                false
            }
        }
    }

    fn float(&self, result: EngineResult<f64>) -> f64 {
        match result {
            Ok(value) => value,
            Err(err) => {
                warn!("Query failed, reporting sentinel: {}", err);
                QUERY_FAILED as f64
            }
        }
    }
}
