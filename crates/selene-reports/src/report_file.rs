// Copyright (c) 2026 - present Selene Contributors
// SPDX-License-Identifier: MIT

//! Report files
//!
//! A [`ReportFile`] ties a path on disk to the [`ReportFormat`] chosen for it
//! and, once parsed, to the records it produced. Until [`ReportFile::parse`]
//! succeeds the record list is empty.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ReportError;
use crate::format::ReportFormat;
use crate::result::{ReportSummary, TestRecord};
use crate::xml::Element;

/// A test report on disk and the records normalized from it
#[derive(Debug, Clone, Default)]
pub struct ReportFile {
    path: PathBuf,
    format: ReportFormat,
    tests: Vec<TestRecord>,
}

impl ReportFile {
    /// Create a report for `path`, selecting the format from its file name
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = ReportFormat::select(&path);
        Self {
            path,
            format,
            tests: Vec::new(),
        }
    }

    /// Force a format instead of the one selected from the file name
    #[must_use]
    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Path of the report
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format that will be (or was) used to normalize the report
    #[must_use]
    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Records from the last successful parse; empty before parsing
    #[must_use]
    pub fn tests(&self) -> &[TestRecord] {
        &self.tests
    }

    /// Take ownership of the parsed records
    #[must_use]
    pub fn into_tests(self) -> Vec<TestRecord> {
        self.tests
    }

    /// Totals over the parsed records
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary::from_records(&self.tests)
    }

    /// Read the file from disk and normalize it
    ///
    /// # Errors
    ///
    /// Returns `ReportError::File` wrapping the IO, XML or report error, so
    /// the failing path is always part of the message.
    pub fn parse(&mut self) -> Result<&[TestRecord], ReportError> {
        let bytes = std::fs::read(&self.path).map_err(|e| ReportError::from(e).in_file(&self.path))?;
        let root = Element::parse_bytes(&bytes).map_err(|e| e.in_file(&self.path))?;
        self.normalize(&root)
    }

    /// Normalize an in-memory document as if it were the content of this file
    ///
    /// # Errors
    ///
    /// See [`ReportFile::parse`].
    pub fn parse_str(&mut self, xml: &str) -> Result<&[TestRecord], ReportError> {
        let root = Element::parse(xml).map_err(|e| e.in_file(&self.path))?;
        self.normalize(&root)
    }

    /// Normalize an already parsed document root
    ///
    /// # Errors
    ///
    /// See [`ReportFile::parse`].
    pub fn normalize(&mut self, root: &Element) -> Result<&[TestRecord], ReportError> {
        let tests = self
            .format
            .normalize(root)
            .map_err(|e| e.in_file(&self.path))?;

        debug!(
            path = %self.path.display(),
            format = %self.format,
            records = tests.len(),
            "Normalized report"
        );

        self.tests = tests;
        Ok(&self.tests)
    }
}
