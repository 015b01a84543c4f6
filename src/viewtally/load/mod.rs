//! Visit-log loader
//!
//! Parses the fixed-schema visit log into the engine's count matrix. The
//! format is one line per subject: whitespace-separated 1-based category
//! codes, one code per visit, in any order and with repeats. Code `k`
//! increments column `k - 1` of that subject's row.
//!
//! The loader is the only writer to the matrix. It finalizes one row at a
//! time, never revisits a row, and bumps the shared progress counter once
//! per completed line, so observers polling progress see a monotonic
//! rows-completed count. Queries issued while a load is in flight read
//! whatever rows are populated so far.

pub mod progress;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::viewtally::engine::matrix::CountMatrix;

pub use progress::{LoadProgress, LoadProgressSnapshot};

/// Errors produced while parsing the visit log.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Underlying file or stream failure.
    #[error("visit log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line contained a token that is not a valid category code.
    #[error("bad record at line {line}: token '{token}' {reason}")]
    BadRecord {
        line: usize,
        token: String,
        reason: String,
    },

    /// The log contained more subject lines than the matrix has rows.
    #[error("visit log has more than {expected} subject lines")]
    TooManyRows { expected: usize },
}

/// Outcome of a successful load.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LoadSummary {
    /// Subject lines consumed.
    pub rows_loaded: usize,

    /// Individual visit codes recorded.
    pub visits_recorded: u64,

    /// Wall-clock load duration.
    pub duration: Duration,
}

/// Writes parsed visit records into the engine's matrix.
///
/// Obtained from [`Engine::loader`]; holds shared handles to the matrix
/// and the progress counter, so it can run on its own thread while the
/// engine is polled or queried.
///
/// [`Engine::loader`]: crate::viewtally::engine::Engine::loader
#[derive(Debug)]
pub struct Loader {
    matrix: Arc<CountMatrix>,
    progress: Arc<LoadProgress>,
}

impl Loader {
    pub(crate) fn new(matrix: Arc<CountMatrix>, progress: Arc<LoadProgress>) -> Self {
        Self { matrix, progress }
    }

    /// Load the visit log at `path`.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<LoadSummary, LoadError> {
        let path = path.as_ref();
        info!("Loading visit log from {}", path.display());
        self.load_reader(BufReader::new(File::open(path)?))
    }

    /// Load the visit log from any buffered reader.
    pub fn load_reader<R: BufRead>(&self, reader: R) -> Result<LoadSummary, LoadError> {
        let started = Instant::now();
        let rows = self.matrix.rows();
        let cols = self.matrix.cols();

        let mut row = 0usize;
        let mut visits_recorded = 0u64;

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            if row >= rows {
                warn!("Visit log continues past row {}, aborting load", rows);
                return Err(LoadError::TooManyRows { expected: rows });
            }

            for token in line.split_whitespace() {
                let code: usize =
                    token
                        .parse()
                        .map_err(|_| LoadError::BadRecord {
                            line: line_idx + 1,
                            token: token.to_string(),
                            reason: "is not an integer".to_string(),
                        })?;

                // Codes are 1-based in the log, columns 0-based in memory.
                if code == 0 || code > cols {
                    return Err(LoadError::BadRecord {
                        line: line_idx + 1,
                        token: token.to_string(),
                        reason: format!("is outside category range 1..={}", cols),
                    });
                }

                self.matrix.add(row, code - 1, 1);
                visits_recorded += 1;
            }

            // The row is final from here on; publish it before moving on.
            row += 1;
            self.progress.add_row();
        }

        let summary = LoadSummary {
            rows_loaded: row,
            visits_recorded,
            duration: started.elapsed(),
        };
        info!(
            "Load complete: {} rows, {} visits in {:?}",
            summary.rows_loaded, summary.visits_recorded, summary.duration
        );
        Ok(summary)
    }
}
