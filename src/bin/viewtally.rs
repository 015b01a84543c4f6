//! viewtally CLI — load a visit log and run aggregate queries
//!
//! Loads the log on a background thread while the main thread polls and
//! prints load progress, then runs the requested query against the fully
//! loaded matrix.
//!
//! ## Usage
//!
//! ```bash
//! # Did more than 1000 subjects visit category 3 at least once?
//! viewtally --file datafile.txt --rows 989818 --categories 17 count --bound 1000 --category 3
//!
//! # Percentage of subjects visiting category 1
//! viewtally --file datafile.txt --rows 989818 --categories 17 percentage --category 1
//!
//! # Subjects with at least 5 visits to category 7, as JSON
//! viewtally --file datafile.txt --rows 989818 --categories 17 --json threshold --threshold 5 --category 7
//! ```
//!
//! Categories on the command line are 1-based, matching the log format.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use viewtally::{Engine, EngineConfig};

#[derive(Parser)]
#[command(name = "viewtally")]
#[command(about = "Parallel aggregation queries over page-view event logs")]
#[command(version)]
struct Cli {
    /// Visit log file: one line per subject, 1-based category codes
    #[arg(short, long)]
    file: String,

    /// Total subject rows in the log
    #[arg(short, long)]
    rows: usize,

    /// Number of page categories
    #[arg(short, long)]
    categories: usize,

    /// Work items per query fan-out
    #[arg(long, default_value_t = viewtally::DEFAULT_TASK_COUNT)]
    task_count: usize,

    /// Emit the result (and metrics) as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Did strictly more than BOUND subjects visit CATEGORY at least once?
    Count {
        #[arg(short, long)]
        bound: u64,
        #[arg(short, long)]
        category: usize,
    },

    /// Percentage of subjects that visited CATEGORY at least once
    Percentage {
        #[arg(short, long)]
        category: usize,
    },

    /// Did strictly more subjects visit CATEGORY_A than CATEGORY_B?
    Compare {
        category_a: usize,
        category_b: usize,
    },

    /// Subjects with at least THRESHOLD visits to CATEGORY
    Threshold {
        #[arg(short, long)]
        threshold: u32,
        #[arg(short, long)]
        category: usize,
    },

    /// Percentage of subjects visiting CATEGORY_A more often than CATEGORY_B
    ComparePercentage {
        category_a: usize,
        category_b: usize,
    },
}

/// Convert a 1-based command-line category to a 0-based column index.
fn column(category: usize, categories: usize) -> Result<usize, String> {
    if category == 0 || category > categories {
        return Err(format!(
            "category {} is outside 1..={}",
            category, categories
        ));
    }
    Ok(category - 1)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let engine = Arc::new(Engine::with_config(
        cli.rows,
        cli.categories,
        EngineConfig::default().with_task_count(cli.task_count),
    ));

    // Load on a background thread; poll and print progress from here.
    let loader = engine.loader();
    let file = cli.file.clone();
    let load_thread = thread::spawn(move || loader.load_path(&file));

    let progress = engine.progress();
    while !progress.is_complete() && !load_thread.is_finished() {
        eprintln!("{}", progress.snapshot().format_summary());
        thread::sleep(Duration::from_millis(400));
    }

    match load_thread.join() {
        Ok(Ok(summary)) => {
            eprintln!(
                "loaded {} rows ({} visits) in {:?}",
                summary.rows_loaded, summary.visits_recorded, summary.duration
            );
        }
        Ok(Err(err)) => {
            eprintln!("load failed: {}", err);
            return ExitCode::FAILURE;
        }
        Err(_) => {
            eprintln!("load thread panicked");
            return ExitCode::FAILURE;
        }
    }

    let result = match run_query(&engine, &cli.command, cli.categories) {
        Ok(value) => value,
        Err(message) => {
            eprintln!("error: {}", message);
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        let output = json!({
            "result": result,
            "metrics": engine.metrics_snapshot(),
        });
        println!("{}", output);
    } else {
        println!("{}", result);
        eprintln!("{}", engine.metrics_snapshot().format_summary());
    }

    ExitCode::SUCCESS
}

fn run_query(
    engine: &Engine,
    command: &Commands,
    categories: usize,
) -> Result<serde_json::Value, String> {
    let value = match *command {
        Commands::Count { bound, category } => {
            json!(engine.count_query(bound, column(category, categories)?))
        }
        Commands::Percentage { category } => {
            json!(engine.percentage_count_query(column(category, categories)?))
        }
        Commands::Compare {
            category_a,
            category_b,
        } => json!(engine.comparison_query(
            column(category_a, categories)?,
            column(category_b, categories)?
        )),
        Commands::Threshold {
            threshold,
            category,
        } => json!(engine.count_threshold_query(threshold, column(category, categories)?)),
        Commands::ComparePercentage {
            category_a,
            category_b,
        } => json!(engine.compare_percentage_query(
            column(category_a, categories)?,
            column(category_b, categories)?
        )),
    };
    Ok(value)
}
