//! Report discovery
//!
//! Finds the XML reports inside a CI results directory. A file is a report
//! when its name ends in `.xml` and contains either `output` (Robot style) or
//! one of the flat-format markers (`TESTS-`, `pytest_xUnit.xml`,
//! `gtest_xUnit.xml`).

use std::path::{Path, PathBuf};

use selene_reports::FLAT_FORMAT_MARKERS;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Discovery errors
#[derive(Debug, Error)]
pub enum DiscoverError {
    /// Results path does not exist
    #[error("Results path not found: {0}")]
    NotFound(PathBuf),

    /// Results path is not a directory
    #[error("Results path is not a directory: {0}")]
    NotDirectory(PathBuf),
}

/// Check whether a file name looks like a test report
#[must_use]
pub fn is_report_file(file_name: &str) -> bool {
    if !file_name.ends_with(".xml") || file_name.starts_with('.') {
        return false;
    }
    file_name.contains("output")
        || FLAT_FORMAT_MARKERS
            .iter()
            .any(|marker| file_name.contains(marker))
}

/// Recursively collect every report under `root`
///
/// The result is sorted and free of duplicates, so a file matching more than
/// one pattern is only ingested once. Unreadable entries are skipped with a
/// warning.
///
/// # Errors
///
/// Returns an error if `root` does not exist or is not a directory.
pub fn discover_reports(root: impl AsRef<Path>) -> Result<Vec<PathBuf>, DiscoverError> {
    let root = root.as_ref();
    if !root.exists() {
        return Err(DiscoverError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(DiscoverError::NotDirectory(root.to_path_buf()));
    }

    let mut reports = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_report_file) {
            reports.push(entry.into_path());
        }
    }

    reports.sort();
    reports.dedup();

    debug!(root = %root.display(), reports = reports.len(), "Discovered reports");
    Ok(reports)
}
