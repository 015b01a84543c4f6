pub mod engine;
pub mod load;

// Re-export the main surface for callers and tests
pub use engine::{
    CountMatrix, Engine, EngineConfig, EngineError, EngineMetricsSnapshot, EngineResult,
    DEFAULT_TASK_COUNT, QUERY_FAILED,
};
pub use load::{LoadError, LoadProgress, LoadProgressSnapshot, LoadSummary, Loader};
