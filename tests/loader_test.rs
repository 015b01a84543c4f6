//! Integration tests for the visit-log loader and progress reporting.

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use viewtally::{Engine, EngineConfig, LoadError};

#[test]
fn load_from_file_and_query() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    // 5 subjects, 3 categories; subjects 0, 1 and 4 visit category 1
    writeln!(file, "1 1 2").unwrap();
    writeln!(file, "1").unwrap();
    writeln!(file, "3").unwrap();
    writeln!(file, "2 3 3").unwrap();
    writeln!(file, "1 3").unwrap();
    file.flush().unwrap();

    let engine = Engine::with_config(5, 3, EngineConfig::fast_test());
    let summary = engine.loader().load_path(file.path()).unwrap();

    assert_eq!(summary.rows_loaded, 5);
    assert_eq!(summary.visits_recorded, 10);
    assert_eq!(engine.rows_loaded(), 5);
    assert_eq!(engine.total_rows(), 5);

    // Category codes are 1-based in the file, 0-based in queries
    assert_eq!(engine.count_threshold_query(1, 0), 3);
    assert_eq!(engine.count_threshold_query(2, 0), 1); // "1 1 2" only
    assert_eq!(engine.count_threshold_query(1, 2), 3);
    assert!(engine.comparison_query(0, 1));
}

#[test]
fn bad_file_reports_line_number() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "1 2").unwrap();
    writeln!(file, "2 nine").unwrap();
    file.flush().unwrap();

    let engine = Engine::with_config(5, 3, EngineConfig::fast_test());
    let err = engine.loader().load_path(file.path()).unwrap_err();
    match err {
        LoadError::BadRecord { line, token, .. } => {
            assert_eq!(line, 2);
            assert_eq!(token, "nine");
        }
        other => panic!("expected BadRecord, got {:?}", other),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let engine = Engine::with_config(2, 2, EngineConfig::fast_test());
    let err = engine
        .loader()
        .load_path("/nonexistent/viewtally-datafile.txt")
        .unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}

#[test]
fn progress_is_observable_during_load() {
    // A log big enough that the loader visibly advances row by row.
    let rows = 20_000;
    let mut log = String::new();
    for i in 0..rows {
        log.push_str(if i % 2 == 0 { "1 2\n" } else { "2\n" });
    }

    let engine = Arc::new(Engine::with_config(rows, 2, EngineConfig::fast_test()));
    let loader = engine.loader();
    let load_thread = thread::spawn(move || loader.load_reader(std::io::Cursor::new(log)));

    // Poll like the presentation layer would; queries issued mid-load are
    // allowed and may undercount, but must never fail or block forever.
    let progress: Arc<viewtally::LoadProgress> = engine.progress();
    while !progress.is_complete() {
        let snapshot = progress.snapshot();
        assert!(snapshot.rows_loaded <= rows);
        let mid_load = engine.count_threshold_query(1, 0);
        assert!((0..=rows as i64).contains(&mid_load));
        thread::sleep(Duration::from_millis(1));
    }

    load_thread.join().unwrap().unwrap();
    assert_eq!(engine.rows_loaded(), rows);
    assert_eq!(engine.count_threshold_query(1, 0), rows as i64 / 2);
    assert_eq!(engine.count_threshold_query(1, 1), rows as i64);
}

#[test]
fn progress_snapshot_serializes() {
    let engine = Engine::with_config(4, 2, EngineConfig::fast_test());
    engine
        .loader()
        .load_reader(std::io::Cursor::new("1\n2\n"))
        .unwrap();

    let snapshot = engine.progress().snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"rows_loaded\":2"));
    assert!(json.contains("\"total_rows\":4"));
}
