//! Integration tests for the aggregation engine's query surface.

use viewtally::{Engine, EngineConfig};

/// 62 subjects x 17 categories with a known distribution on category 0:
/// exactly 12 rows have at least one visit, and exactly 2 of those have at
/// least five.
fn msnbc_shaped_engine(config: EngineConfig) -> Engine {
    let engine = Engine::with_config(62, 17, config);
    for row in 0..10 {
        engine.set_cell(row, 0, 1).unwrap();
    }
    engine.set_cell(10, 0, 5).unwrap();
    engine.set_cell(11, 0, 9).unwrap();
    engine
}

#[test]
fn cells_start_zero_and_roundtrip() {
    let engine = Engine::with_config(5, 3, EngineConfig::fast_test());
    for row in 0..5 {
        for col in 0..3 {
            assert_eq!(engine.get_cell(row, col).unwrap(), 0);
        }
    }

    engine.set_cell(4, 2, 42).unwrap();
    assert_eq!(engine.get_cell(4, 2).unwrap(), 42);
    assert!(engine.get_cell(5, 0).is_err());
    assert!(engine.set_cell(0, 3, 1).is_err());
}

#[test]
fn results_invariant_to_granularity_and_workers() {
    let mut answers = Vec::new();
    for task_count in [1, 4, 24, 64] {
        for workers in [1, 2, 8] {
            let engine = msnbc_shaped_engine(EngineConfig {
                workers,
                task_count,
            });
            answers.push((
                task_count,
                workers,
                engine.count_threshold_query(1, 0),
                engine.percentage_count_query(0),
                engine.count_query(11, 0),
            ));
        }
    }

    for (task_count, workers, count, percentage, over_11) in answers {
        assert_eq!(
            count, 12,
            "count wrong for task_count={}, workers={}",
            task_count, workers
        );
        assert_eq!(percentage, 12.0 / 62.0 * 100.0);
        assert!(over_11, "12 > 11 should hold");
    }
}

#[test]
fn queries_are_idempotent() {
    let engine = msnbc_shaped_engine(EngineConfig::default());
    let first = engine.count_threshold_query(5, 0);
    for _ in 0..10 {
        assert_eq!(engine.count_threshold_query(5, 0), first);
    }
}

#[test]
fn reduction_matches_sequential_count() {
    let engine = Engine::with_config(100, 4, EngineConfig::fast_test());
    // Visits to category 2 on every third row
    for row in (0..100).step_by(3) {
        engine.set_cell(row, 2, (row % 7 + 1) as u32).unwrap();
    }

    let expected = (0..100)
        .filter(|row| engine.get_cell(*row, 2).unwrap() >= 1)
        .count() as i64;
    assert_eq!(engine.count_threshold_query(1, 2), expected);
}

#[test]
fn msnbc_shaped_scenario() {
    let engine = msnbc_shaped_engine(EngineConfig::default());
    assert_eq!(engine.percentage_count_query(0), 12.0 / 62.0 * 100.0);
    assert_eq!(engine.count_threshold_query(5, 0), 2);
    assert_eq!(engine.count_threshold_query(1, 0), 12);
}

#[test]
fn count_query_boundary_is_strict() {
    // Exactly 4 subjects visiting category 1 at least once
    let engine = Engine::with_config(62, 17, EngineConfig::default());
    for row in 20..24 {
        engine.set_cell(row, 1, 3).unwrap();
    }
    assert!(engine.count_query(3, 1));
    assert!(!engine.count_query(4, 1));

    // With exactly 3 visitors the same bound fails
    let engine = Engine::with_config(62, 17, EngineConfig::default());
    for row in 20..23 {
        engine.set_cell(row, 1, 1).unwrap();
    }
    assert!(!engine.count_query(3, 1));
}

#[test]
fn comparison_is_antisymmetric_and_false_on_ties() {
    let engine = Engine::with_config(30, 4, EngineConfig::fast_test());
    // 5 visitors to category 0, 3 to category 1, 3 to category 2
    for row in 0..5 {
        engine.set_cell(row, 0, 1).unwrap();
    }
    for row in 0..3 {
        engine.set_cell(row, 1, 2).unwrap();
        engine.set_cell(row + 10, 2, 1).unwrap();
    }

    assert!(engine.comparison_query(0, 1));
    assert!(!engine.comparison_query(1, 0));

    // Equal visitor counts compare false in both directions
    assert!(!engine.comparison_query(1, 2));
    assert!(!engine.comparison_query(2, 1));
}

#[test]
fn compare_percentage_counts_strict_per_row_wins() {
    let engine = Engine::with_config(10, 2, EngineConfig::fast_test());
    // Rows 0..4: category 0 ahead. Row 5: tie. Rows 6..: category 1 ahead.
    for row in 0..4 {
        engine.set_cell(row, 0, 3).unwrap();
        engine.set_cell(row, 1, 1).unwrap();
    }
    engine.set_cell(5, 0, 2).unwrap();
    engine.set_cell(5, 1, 2).unwrap();
    for row in 6..10 {
        engine.set_cell(row, 1, 4).unwrap();
    }

    assert_eq!(engine.compare_percentage_query(0, 1), 40.0);
    assert_eq!(engine.compare_percentage_query(1, 0), 40.0);
}

#[test]
fn uneven_partition_covers_every_row_exactly_once() {
    // 62 rows over 24 tasks: size ceil(62/24) = 3, trailing ranges clamp
    // to empty. Every row visited exactly once means the total is exact.
    let engine = Engine::with_config(62, 17, EngineConfig::default().with_task_count(24));
    for row in 0..62 {
        engine.set_cell(row, 3, 1).unwrap();
    }
    assert_eq!(engine.count_threshold_query(1, 3), 62);
    assert_eq!(engine.percentage_count_query(3), 100.0);
}

#[test]
fn concurrent_callers_get_consistent_answers() {
    use std::sync::Arc;
    use std::thread;

    let engine = Arc::new(msnbc_shaped_engine(EngineConfig::default()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..20 {
                    if i % 2 == 0 {
                        assert_eq!(engine.count_threshold_query(1, 0), 12);
                    } else {
                        assert_eq!(engine.percentage_count_query(0), 12.0 / 62.0 * 100.0);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn empty_matrix_queries() {
    let engine = Engine::with_config(0, 3, EngineConfig::fast_test());
    assert_eq!(engine.count_threshold_query(1, 0), 0);
    assert_eq!(engine.percentage_count_query(0), 0.0);
    assert!(!engine.count_query(0, 0));
    assert!(!engine.comparison_query(0, 1));
}
