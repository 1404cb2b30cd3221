//! Report ingestion
//!
//! The [`Ingestor`] drives a whole run: it records the build, discovers the
//! reports under a results directory, normalizes each one, attaches the
//! build context and log reference, and hands the records to a sink.
//!
//! # Example
//!
//! ```no_run
//! use selene::context::BuildContext;
//! use selene::ingest::{IngestOptions, Ingestor};
//! use selene::log_file::LocalLogService;
//! use selene::sink::MemorySink;
//!
//! let context = BuildContext::new("main", "118").expect("context");
//! let mut ingestor = Ingestor::new(MemorySink::new(), LocalLogService::new());
//!
//! let stats = ingestor
//!     .ingest_path("results", &context, &IngestOptions::default())
//!     .expect("ingest");
//! println!("Submitted {} records", stats.records_submitted);
//! ```

use std::path::{Path, PathBuf};

use selene_reports::{Outcome, ReportError, ReportFile, ReportFormat, TestRecord};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::BuildContext;
use crate::discover::{DiscoverError, discover_reports};
use crate::log_file::{LogFileError, LogService};
use crate::sink::{ResultSink, SinkError};

// ============================================================================
// Error Types
// ============================================================================

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestError {
    /// Results directory could not be scanned
    #[error("Discovery error: {0}")]
    Discover(#[from] DiscoverError),

    /// A report could not be normalized
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Log lookup failed
    #[error("Log file error: {0}")]
    LogFile(#[from] LogFileError),

    /// The sink rejected the build or its records
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

// ============================================================================
// Progress Reporting
// ============================================================================

/// Progress callback signature
pub type ProgressCallback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Progress event during ingestion
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Reports were discovered and ingestion is starting
    Started {
        /// Number of report files found
        total_files: usize,
    },
    /// A report was normalized and submitted
    FileParsed {
        /// Report path
        path: PathBuf,
        /// Strategy used
        format: ReportFormat,
        /// Records submitted from this report
        records: usize,
    },
    /// A report was skipped
    Warning {
        /// Report path
        path: PathBuf,
        /// Why it was skipped
        message: String,
    },
    /// Ingestion completed
    Completed {
        /// Statistics from the ingestion
        stats: IngestStats,
    },
}

// ============================================================================
// Options and Statistics
// ============================================================================

/// Options for a directory ingestion
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Force one strategy for every report instead of selecting by file name
    pub format: Option<ReportFormat>,
}

impl IngestOptions {
    /// Force a normalization strategy
    #[must_use]
    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Statistics from an ingestion operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStats {
    /// Report files discovered
    pub files_seen: usize,
    /// Report files normalized and submitted
    pub files_parsed: usize,
    /// Records accepted by the sink
    pub records_submitted: usize,
    /// Report files that failed to normalize
    pub failed_files: Vec<PathBuf>,
}

impl IngestStats {
    /// Whether any report failed
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed_files.is_empty()
    }

    /// Merge stats from another operation
    pub fn merge(&mut self, other: &IngestStats) {
        self.files_seen += other.files_seen;
        self.files_parsed += other.files_parsed;
        self.records_submitted += other.records_submitted;
        self.failed_files.extend(other.failed_files.iter().cloned());
    }
}

// ============================================================================
// Ingestor
// ============================================================================

/// Ingests test reports into a [`ResultSink`]
pub struct Ingestor<S: ResultSink, L: LogService> {
    sink: S,
    logs: L,
    progress: Option<ProgressCallback>,
}

impl<S: ResultSink, L: LogService> Ingestor<S, L> {
    /// Create a new ingestor writing to `sink`
    #[must_use]
    pub fn new(sink: S, logs: L) -> Self {
        Self {
            sink,
            logs,
            progress: None,
        }
    }

    /// Set a progress callback
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    fn report(&self, event: ProgressEvent) {
        if let Some(ref callback) = self.progress {
            callback(&event);
        }
    }

    /// Get reference to the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Get mutable reference to the sink
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the ingestor and return the sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Ingest every report under `root` for one build
    ///
    /// The build is recorded before any of its tests. A report that fails to
    /// normalize is logged, listed in [`IngestStats::failed_files`] and
    /// skipped; the remaining reports are still ingested.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be scanned, a requested log file is
    /// missing, or the sink fails.
    pub fn ingest_path(
        &mut self,
        root: impl AsRef<Path>,
        context: &BuildContext,
        options: &IngestOptions,
    ) -> Result<IngestStats, IngestError> {
        let root = root.as_ref();
        info!(
            path = %root.display(),
            branch = %context.branch_name,
            build = %context.build_name,
            "Starting report ingestion"
        );

        self.sink.record_build(context)?;

        let reports = discover_reports(root)?;
        self.report(ProgressEvent::Started {
            total_files: reports.len(),
        });

        let mut stats = IngestStats {
            files_seen: reports.len(),
            ..Default::default()
        };

        for path in reports {
            match self.ingest_file(&path, context, options) {
                Ok((format, submitted)) => {
                    stats.files_parsed += 1;
                    stats.records_submitted += submitted;
                    self.report(ProgressEvent::FileParsed {
                        path,
                        format,
                        records: submitted,
                    });
                }
                Err(IngestError::Report(e)) => {
                    warn!(path = %path.display(), error = %e, "Skipping report");
                    self.report(ProgressEvent::Warning {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                    stats.failed_files.push(path);
                }
                Err(e) => return Err(e),
            }
        }

        self.sink.finish()?;

        info!(
            files = stats.files_seen,
            parsed = stats.files_parsed,
            records = stats.records_submitted,
            failed = stats.failed_files.len(),
            "Report ingestion complete"
        );

        self.report(ProgressEvent::Completed {
            stats: stats.clone(),
        });

        Ok(stats)
    }

    /// Normalize and submit one report
    fn ingest_file(
        &mut self,
        path: &Path,
        context: &BuildContext,
        options: &IngestOptions,
    ) -> Result<(ReportFormat, usize), IngestError> {
        let log = self.logs.log_reference(path)?;

        let mut report = ReportFile::new(path);
        if let Some(format) = options.format {
            report = report.with_format(format);
        }
        let format = report.format();
        report.parse()?;

        let records: Vec<TestRecord> = report
            .into_tests()
            .into_iter()
            .map(|record| context.apply(record, log.as_deref()))
            .collect();

        let submitted = self.sink.submit(&records)?;
        debug!(
            path = %path.display(),
            format = %format,
            records = submitted,
            log = log.as_deref().unwrap_or("-"),
            "Submitted report"
        );
        Ok((format, submitted))
    }

    /// Submit a single, manually specified result
    ///
    /// The record is critical and has no duration.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the sink fails.
    pub fn record_single(
        &mut self,
        context: &BuildContext,
        name: &str,
        outcome: Outcome,
        log_path: Option<&str>,
    ) -> Result<TestRecord, IngestError> {
        let record = TestRecord::builder()
            .with_name(name)
            .with_result(outcome)
            .with_critical(true)
            .build()?;
        let record = context.apply(record, log_path);

        self.sink.record_build(context)?;
        self.sink.submit(std::slice::from_ref(&record))?;
        self.sink.finish()?;

        info!(test = %record.name, result = %record.result, "Recorded test result");
        Ok(record)
    }
}

// ============================================================================
// Tests
// ============================================================================
