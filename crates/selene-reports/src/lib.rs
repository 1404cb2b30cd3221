// Copyright (c) 2026 - present Selene Contributors
// SPDX-License-Identifier: MIT

//! selene-reports: Test report normalization for selene
//!
//! This library crate turns XML test reports from several runners into one
//! canonical [`TestRecord`] shape. The format is chosen from the file name
//! ([`ReportFormat::select`]); hierarchical Robot Framework style reports
//! flatten their suite path into the test name, JUnit/xUnit style reports use
//! `classname.name` directly.
//!
//! # Example
//!
//! ```no_run
//! use selene_reports::{ReportFile, ReportFormat};
//!
//! let mut report = ReportFile::new("results/output.xml");
//! assert_eq!(report.format(), ReportFormat::NestedSuite);
//!
//! for record in report.parse().unwrap() {
//!     println!("{} {}", record.name, record.result);
//! }
//! ```

pub mod error;
pub mod flat;
pub mod format;
pub mod nested;
pub mod report_file;
pub mod result;
pub mod xml;

pub use error::ReportError;
pub use format::{FLAT_FORMAT_MARKERS, ReportFormat};
pub use report_file::ReportFile;
pub use result::{Outcome, ReportSummary, TestRecord, TestRecordBuilder};

/// Read and normalize a report in one call
///
/// # Errors
///
/// See [`ReportFile::parse`].
pub fn normalize_file(path: impl Into<std::path::PathBuf>) -> Result<Vec<TestRecord>, ReportError> {
    let mut report = ReportFile::new(path);
    report.parse()?;
    Ok(report.into_tests())
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::ReportError;
    pub use crate::format::ReportFormat;
    pub use crate::report_file::ReportFile;
    pub use crate::result::{Outcome, ReportSummary, TestRecord};
}
