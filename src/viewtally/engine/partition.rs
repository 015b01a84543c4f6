//! Row-range partitioning for query fan-out
//!
//! Splits `[0, rows)` into a fixed number of sub-ranges, one work item per
//! sub-range. The partition granularity is independent of the worker count:
//! with more ranges than workers, slow and fast ranges self-balance across
//! the pool instead of one straggler range pinning a worker.
//!
//! Sub-range size is `ceil(rows / task_count)`, so `task_count * size`
//! generally overshoots `rows`. Boundaries past the end are clamped back to
//! `rows`, which leaves the trailing sub-ranges legitimately empty rather
//! than erroring. Every row is covered by exactly one sub-range.

/// Half-open row range `[start, end)` assigned to one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    /// Number of rows in this range.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True if this range covers no rows.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split `[0, rows)` into `task_count` clamped sub-ranges.
///
/// A `task_count` of zero is treated as one. The returned ranges are
/// non-overlapping, in row order, and cover every row exactly once; ranges
/// whose computed boundaries fall past `rows` collapse to empty.
pub fn subranges(rows: usize, task_count: usize) -> Vec<RowRange> {
    let task_count = task_count.max(1);
    let size = rows.div_ceil(task_count);

    (0..task_count)
        .map(|i| {
            let start = (i * size).min(rows);
            let end = ((i + 1) * size).min(rows);
            RowRange { start, end }
        })
        .collect()
}
