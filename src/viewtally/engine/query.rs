//! Work items and per-row counting predicates
//!
//! A work item is one unit of parallel work: scan one row sub-range of the
//! shared matrix, count the rows matching the query's predicate, publish
//! the partial count into the item's result slot, and signal the query's
//! completion barrier. The submitting caller sums the slots after the
//! barrier releases; summation is order-independent, so no ordering is
//! required among a query's items.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::viewtally::engine::barrier::BarrierGuard;
use crate::viewtally::engine::matrix::CountMatrix;
use crate::viewtally::engine::partition::RowRange;

/// Per-row predicate evaluated by a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    /// Row matches when its visit count for `category` is at least
    /// `threshold`.
    CountAtLeast { category: usize, threshold: u32 },

    /// Row matches when its visit count for `category_a` strictly exceeds
    /// its count for `category_b`.
    CountGreater {
        category_a: usize,
        category_b: usize,
    },
}

impl QueryOp {
    /// Largest category index this predicate reads.
    pub fn max_category(&self) -> usize {
        match *self {
            QueryOp::CountAtLeast { category, .. } => category,
            QueryOp::CountGreater {
                category_a,
                category_b,
            } => category_a.max(category_b),
        }
    }

    #[inline]
    fn matches(&self, matrix: &CountMatrix, row: usize) -> bool {
        match *self {
            QueryOp::CountAtLeast {
                category,
                threshold,
            } => matrix.get(row, category) >= threshold,
            QueryOp::CountGreater {
                category_a,
                category_b,
            } => matrix.get(row, category_a) > matrix.get(row, category_b),
        }
    }
}

/// One row sub-range of one query, consumed exactly once by one worker.
#[derive(Debug)]
pub struct WorkItem {
    range: RowRange,
    op: QueryOp,
    matrix: Arc<CountMatrix>,
    result: Arc<AtomicU64>,
    // Held for its Drop impl: signals the barrier once this item is done,
    // whether it executed, unwound, or was discarded unrun.
    #[allow(dead_code)]
    guard: BarrierGuard,
}

impl WorkItem {
    pub fn new(
        range: RowRange,
        op: QueryOp,
        matrix: Arc<CountMatrix>,
        result: Arc<AtomicU64>,
        guard: BarrierGuard,
    ) -> Self {
        Self {
            range,
            op,
            matrix,
            result,
            guard,
        }
    }

    /// Rows this item will scan.
    pub fn rows(&self) -> usize {
        self.range.len()
    }

    /// Scan the sub-range and publish the match count.
    ///
    /// Consumes the item; the barrier guard is released on return (or on
    /// unwind) by drop.
    pub fn execute(self) {
        let mut matches = 0u64;
        for row in self.range.start..self.range.end {
            if self.op.matches(&self.matrix, row) {
                matches += 1;
            }
        }
        self.result.store(matches, Ordering::Relaxed);
    }
}
