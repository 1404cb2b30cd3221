//! Log artifact lookup
//!
//! Robot Framework writes a human-readable `log.html` next to each
//! `output.xml`. Records from a report point at that log so a failing test
//! can be traced back to its full output.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Log file errors
#[derive(Debug, Error)]
pub enum LogFileError {
    /// An explicitly requested log file does not exist
    #[error("Log file not found: {0}")]
    NotFound(PathBuf),
}

/// Resolves the log artifact that belongs to a report
pub trait LogService {
    /// Log reference to attach to every record of `report`, if any
    ///
    /// # Errors
    ///
    /// Implementations return an error when a log was required but is not
    /// available.
    fn log_reference(&self, report: &Path) -> Result<Option<String>, LogFileError>;
}

/// Derive the sibling log path of a report
///
/// The report path is cut at its first `output` and `log.html` is appended,
/// so `results/smoke/output.xml` maps to `results/smoke/log.html`. Paths
/// without `output` have no derived log.
#[must_use]
pub fn derive_log_path(report: &Path) -> Option<PathBuf> {
    let report = report.to_string_lossy();
    let (prefix, _) = report.split_once("output")?;
    Some(PathBuf::from(format!("{prefix}log.html")))
}

/// Log lookup on the local filesystem
#[derive(Debug, Clone, Default)]
pub struct LocalLogService {
    explicit: Option<PathBuf>,
}

impl LocalLogService {
    /// Derive each report's log from its path
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one log file for every report
    #[must_use]
    pub fn with_log_file(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit: Some(path.into()),
        }
    }
}

impl LogService for LocalLogService {
    fn log_reference(&self, report: &Path) -> Result<Option<String>, LogFileError> {
        if let Some(ref explicit) = self.explicit {
            if !explicit.is_file() {
                return Err(LogFileError::NotFound(explicit.clone()));
            }
            return Ok(Some(explicit.display().to_string()));
        }

        let Some(derived) = derive_log_path(report) else {
            return Ok(None);
        };
        if derived.is_file() {
            debug!(report = %report.display(), log = %derived.display(), "Found log file");
            Ok(Some(derived.display().to_string()))
        } else {
            Ok(None)
        }
    }
}

/// Log service that never attaches a log
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLogService;

impl LogService for NoLogService {
    fn log_reference(&self, _report: &Path) -> Result<Option<String>, LogFileError> {
        Ok(None)
    }
}
