//! Error types for the aggregation engine
//!
//! The engine distinguishes two failure classes: index-range violations,
//! which are programmer errors and surface as hard failures at the access
//! site, and interrupted queries, which are converted to sentinel values at
//! the public query boundary so callers always receive a well-formed result.

/// Errors produced by the aggregation engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// A row or column index fell outside the matrix bounds.
    #[error("index ({row}, {col}) out of range for {rows}x{cols} matrix")]
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// A query's fan-out or barrier wait was interrupted before every
    /// work item finished. Callers see this as the query's sentinel value.
    #[error("query '{query}' interrupted before completion")]
    Interrupted { query: &'static str },
}

/// Convenience alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
