//! # viewtally
//!
//! A parallel aggregation engine for fixed-schema page-view event logs.
//! Ingests one record per subject (a variable-length list of category-visit
//! codes) into a dense in-memory count matrix, then answers aggregate
//! questions about that matrix with a fixed pool of worker threads.
//!
//! ## Features
//!
//! - **Dense count matrix**: contiguous row-major storage, O(1) cell access
//! - **Fan-out/reduce queries**: row-range partitioning with per-query
//!   completion barriers; results invariant to granularity and worker count
//! - **Concurrent loading**: query while the loader is still streaming rows
//!   in, with a pollable progress counter
//! - **Sentinel failure semantics**: interrupted queries report `false`/`-1`
//!   instead of panicking or blocking forever
//!
//! ## Quick Start
//!
//! ```rust
//! use viewtally::{Engine, EngineConfig};
//! use std::io::Cursor;
//!
//! // 4 subjects, 3 page categories
//! let engine = Engine::with_config(4, 3, EngineConfig::fast_test());
//!
//! // One line per subject; 1-based category codes, one per visit
//! let loader = engine.loader();
//! loader.load_reader(Cursor::new("1 1 2\n3\n1\n2 2\n")).unwrap();
//! assert_eq!(engine.rows_loaded(), 4);
//!
//! // Subjects that visited category 1 at least once: rows 0 and 2
//! assert_eq!(engine.count_threshold_query(1, 0), 2);
//! assert_eq!(engine.percentage_count_query(0), 50.0);
//! ```

pub mod viewtally;

// Re-export main API at crate root for easy access
pub use viewtally::{
    CountMatrix, Engine, EngineConfig, EngineError, EngineMetricsSnapshot, EngineResult,
    LoadError, LoadProgress, LoadProgressSnapshot, LoadSummary, Loader, DEFAULT_TASK_COUNT,
    QUERY_FAILED,
};
