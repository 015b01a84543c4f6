//! Dense subject-by-category count matrix
//!
//! The matrix is the only data shared between the loader and query workers.
//! Rows are subjects, columns are page categories, and each cell holds the
//! number of visits by that subject to that category.
//!
//! Cells are relaxed atomics rather than plain integers: the loader may
//! still be appending rows while queries scan earlier rows. The design
//! accepts that a query issued mid-load can observe undercounted cells;
//! callers are expected to poll load progress before trusting results.
//! Atomics keep that overlap well-defined without any locking on the
//! read path.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::viewtally::engine::error::{EngineError, EngineResult};

/// Dense `rows x cols` table of visit counts.
///
/// Dimensions are fixed at construction and every cell starts at zero.
/// Storage is a single contiguous row-major buffer (`row * cols + col`),
/// so both accessors are a bounds check plus one indexed atomic op.
#[derive(Debug)]
pub struct CountMatrix {
    rows: usize,
    cols: usize,
    cells: Box<[AtomicU32]>,
}

impl CountMatrix {
    /// Allocate a zeroed matrix with the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        cells.resize_with(rows * cols, || AtomicU32::new(0));

        Self {
            rows,
            cols,
            cells: cells.into_boxed_slice(),
        }
    }

    /// Number of subject rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of category columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "index ({}, {}) out of range for {}x{} matrix",
            row,
            col,
            self.rows,
            self.cols
        );
        row * self.cols + col
    }

    /// Read the visit count at `(row, col)`.
    ///
    /// Panics if either index is out of bounds; the partitioner guarantees
    /// the engine itself never produces such an access.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[self.index(row, col)].load(Ordering::Relaxed)
    }

    /// Overwrite the visit count at `(row, col)`.
    ///
    /// Panics if either index is out of bounds.
    #[inline]
    pub fn set(&self, row: usize, col: usize, value: u32) {
        self.cells[self.index(row, col)].store(value, Ordering::Relaxed);
    }

    /// Add `delta` visits at `(row, col)`. Used by the loader, which only
    /// ever increments.
    #[inline]
    pub fn add(&self, row: usize, col: usize, delta: u32) {
        self.cells[self.index(row, col)].fetch_add(delta, Ordering::Relaxed);
    }

    /// Checked read for collaborators working with untrusted indices.
    pub fn try_get(&self, row: usize, col: usize) -> EngineResult<u32> {
        self.check_bounds(row, col)?;
        Ok(self.get(row, col))
    }

    /// Checked write for collaborators working with untrusted indices.
    pub fn try_set(&self, row: usize, col: usize, value: u32) -> EngineResult<()> {
        self.check_bounds(row, col)?;
        self.set(row, col, value);
        Ok(())
    }

    fn check_bounds(&self, row: usize, col: usize) -> EngineResult<()> {
        if row >= self.rows || col >= self.cols {
            return Err(EngineError::OutOfRange {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }
}
