//! Subcommand execution
//!
//! Wires a parsed [`Config`] to a sink, a log service and the [`Ingestor`].
//! Output that belongs on stdout (JSON lines, `detect` listings) goes to the
//! writer passed in, so the whole command can be exercised from tests.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::CommandFactory;
use selene_reports::{Outcome, ReportFormat};
use tracing::{error, info};

use crate::config::{Command, Config, SinkChoice};
use crate::context::BuildContext;
use crate::db::Database;
use crate::ingest::{IngestError, IngestOptions, IngestStats, Ingestor, ProgressEvent};
use crate::log_file::LocalLogService;
use crate::sink::{JsonLinesSink, MemorySink, ResultSink};

/// Run the configured subcommand
///
/// Returns [`ExitCode::FAILURE`] when any report could not be ingested.
///
/// # Errors
///
/// Returns an error if the sink cannot be opened or the command fails as a
/// whole.
pub fn run(config: &Config, out: &mut dyn Write) -> Result<ExitCode> {
    match config.command {
        Some(Command::Ingest {
            ref path,
            ref branch,
            ref build,
            ref stage,
            ref status,
            ref logfile,
            format,
        }) => {
            let context = BuildContext::new(branch.as_str(), build.as_str())?
                .with_stage(stage.clone())
                .with_status(status.clone())
                .with_results_path(path);
            let options = IngestOptions { format };

            let stats = ingest(config, out, path, &context, &options, logfile.as_deref())?;
            if stats.has_failures() {
                for failed in &stats.failed_files {
                    error!(path = %failed.display(), "Report could not be ingested");
                }
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Record {
            ref branch,
            ref build,
            ref test_name,
            result,
            ref log_path,
            ref stage,
        }) => {
            let context =
                BuildContext::new(branch.as_str(), build.as_str())?.with_stage(stage.clone());
            record(config, out, &context, test_name, result, log_path.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Detect { ref files }) => {
            detect(files, out)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            Config::command().write_help(&mut &mut *out)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Ingest a results directory into the configured sink
///
/// # Errors
///
/// Returns an error if the sink cannot be opened or ingestion fails as a
/// whole. Individual report failures are reported in the stats instead.
pub fn ingest(
    config: &Config,
    out: &mut dyn Write,
    path: &Path,
    context: &BuildContext,
    options: &IngestOptions,
    logfile: Option<&Path>,
) -> Result<IngestStats> {
    let logs = match logfile {
        Some(logfile) => LocalLogService::with_log_file(logfile),
        None => LocalLogService::new(),
    };

    let stats = with_sink(config, out, |sink| {
        Ingestor::new(sink, logs)
            .with_progress(Box::new(log_progress))
            .ingest_path(path, context, options)
    })?;

    info!(
        parsed = stats.files_parsed,
        failed = stats.failed_files.len(),
        records = stats.records_submitted,
        "Ingestion finished"
    );
    Ok(stats)
}

/// Record one manually specified result into the configured sink
///
/// # Errors
///
/// Returns an error if the sink cannot be opened or the record is invalid.
pub fn record(
    config: &Config,
    out: &mut dyn Write,
    context: &BuildContext,
    test_name: &str,
    result: Outcome,
    log_path: Option<&str>,
) -> Result<()> {
    with_sink(config, out, |sink| {
        Ingestor::new(sink, LocalLogService::new())
            .record_single(context, test_name, result, log_path)
    })?;
    Ok(())
}

/// Print the strategy that would be used for each file
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn detect(files: &[PathBuf], out: &mut dyn Write) -> Result<()> {
    for file in files {
        writeln!(out, "{}\t{}", file.display(), ReportFormat::select(file))?;
    }
    Ok(())
}

fn log_progress(event: &ProgressEvent) {
    match event {
        ProgressEvent::Started { total_files } => {
            info!(files = total_files, "Found reports");
        }
        ProgressEvent::FileParsed {
            path,
            format,
            records,
        } => {
            info!(path = %path.display(), format = %format, records, "Ingested report");
        }
        ProgressEvent::Warning { .. } | ProgressEvent::Completed { .. } => {}
    }
}

/// Open the sink selected by the global flags and run `f` against it
fn with_sink<T>(
    config: &Config,
    out: &mut dyn Write,
    f: impl FnOnce(&mut dyn ResultSink) -> Result<T, IngestError>,
) -> Result<T> {
    match config.sink_choice() {
        SinkChoice::Memory => {
            let mut sink = MemorySink::new();
            let value = f(&mut sink)?;
            let summary = sink.summary();
            info!(
                total = summary.total,
                passed = summary.passed,
                failed = summary.failed,
                critical_failures = summary.critical_failures,
                "Dry run, nothing was stored"
            );
            Ok(value)
        }
        SinkChoice::Sqlite(path) => {
            let mut db = Database::open(&path)
                .with_context(|| format!("Failed to open database {}", path.display()))?;
            db.initialize().context("Failed to initialize database")?;
            Ok(f(&mut db)?)
        }
        SinkChoice::JsonLines(Some(path)) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let mut sink = JsonLinesSink::new(BufWriter::new(file));
            Ok(f(&mut sink)?)
        }
        SinkChoice::JsonLines(None) => {
            let mut sink = JsonLinesSink::new(out);
            Ok(f(&mut sink)?)
        }
    }
}
