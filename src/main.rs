mod engine;
mod models;
mod operator;
mod storage;
mod types;

use std::io::{stderr, stdout, BufWriter, Write};
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use anyhow::Result;
use tokio::task::spawn_blocking;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::engine::{RunOptions, RunReport, TransferEngine};
use crate::operator::{ConsoleOperator, SilentOperator};
use crate::storage::{load, save};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (flags, positional): (Vec<&String>, Vec<&String>) = args.iter().partition(|arg| arg.starts_with("--"));

    let Some(directory) = positional.first().map(PathBuf::from) else {
        eprintln!("Usage: ledger-inbox [workbook_dir] [log_level:optional] [--auto] [--approve-decodings]");
        eprintln!("Available log levels: error, warn, info, debug, trace (default: error)");
        exit(1);
    };

    let log_level = positional.get(1)
        .map(|s| parse_log_level(s)).unwrap_or_else(|| LevelFilter::ERROR);

    setup_logging(log_level);

    let options = RunOptions {
        auto: flags.iter().any(|flag| *flag == "--auto"),
        approve_new_decodings: flags.iter().any(|flag| *flag == "--approve-decodings"),
        ..RunOptions::default()
    };
    let report_limit = options.report_limit;

    let source = directory.clone();
    let workbook = Arc::new(spawn_blocking(move || load(&source)).await??);
    info!("Loaded workbook from {}", directory.display());

    let report = if options.auto {
        TransferEngine::new(workbook.clone(), SilentOperator).with_options(options).run().await?
    } else {
        TransferEngine::new(workbook.clone(), ConsoleOperator::spawn()).with_options(options).run().await?
    };

    let target = directory.clone();
    spawn_blocking(move || save(&workbook, &target)).await??;
    info!("Saved workbook to {}", directory.display());

    write_report_to_stdout(&report, report_limit)?;

    Ok(())
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'error'", level);
            LevelFilter::ERROR
        }
    }
}

fn setup_logging(level: LevelFilter) {
    //NOTE: stdout carries the run report, so logs and prompts go to stderr
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}

fn write_report_to_stdout(report: &RunReport, limit: usize) -> Result<()> {
    let mut output = BufWriter::new(stdout().lock());

    writeln!(output, "{}", report.render(limit))?;
    output.flush()?;

    Ok(())
}
