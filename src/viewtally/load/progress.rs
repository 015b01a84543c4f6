//! Load-progress tracking
//!
//! A single shared tracker written by the loader and polled by any number
//! of observers (console loops, progress bars). Only the loader writes, so
//! plain relaxed atomics suffice; readers tolerate staleness. Queries
//! issued before loading completes may see undercounted rows, which is why
//! callers are expected to consult this tracker first.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};

/// Shared rows-completed counter for one load operation.
#[derive(Debug)]
pub struct LoadProgress {
    total_rows: usize,
    rows_loaded: AtomicUsize,
    started_at: Instant,
}

impl LoadProgress {
    /// Create a tracker expecting `total_rows` rows.
    pub fn new(total_rows: usize) -> Self {
        Self {
            total_rows,
            rows_loaded: AtomicUsize::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record one fully loaded row.
    pub fn add_row(&self) {
        self.rows_loaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Rows finished so far.
    pub fn rows_loaded(&self) -> usize {
        self.rows_loaded.load(Ordering::Relaxed)
    }

    /// Rows expected in total.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Whether every expected row has been loaded.
    pub fn is_complete(&self) -> bool {
        self.rows_loaded() >= self.total_rows
    }

    /// Point-in-time snapshot with derived rates.
    pub fn snapshot(&self) -> LoadProgressSnapshot {
        let rows_loaded = self.rows_loaded();
        let elapsed = self.started_at.elapsed();
        let elapsed_secs = elapsed.as_secs_f64();

        let rows_per_sec = if elapsed_secs > 0.0 {
            rows_loaded as f64 / elapsed_secs
        } else {
            0.0
        };

        let progress_percentage = if self.total_rows > 0 {
            (rows_loaded as f64 / self.total_rows as f64 * 100.0).min(100.0)
        } else {
            100.0
        };

        LoadProgressSnapshot {
            rows_loaded,
            total_rows: self.total_rows,
            progress_percentage,
            rows_per_sec,
            started_at: Utc::now() - chrono::Duration::from_std(elapsed).unwrap_or_default(),
        }
    }
}

/// Immutable view of load progress, serializable for dashboards and the
/// CLI's `--json` output.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LoadProgressSnapshot {
    pub rows_loaded: usize,
    pub total_rows: usize,
    pub progress_percentage: f64,
    pub rows_per_sec: f64,
    pub started_at: DateTime<Utc>,
}

impl LoadProgressSnapshot {
    /// Format progress for human-readable logging.
    pub fn format_summary(&self) -> String {
        format!(
            "{} out of {} rows ({:.1}%, {:.0} rows/sec)",
            self.rows_loaded, self.total_rows, self.progress_percentage, self.rows_per_sec
        )
    }
}
