// Copyright (c) 2026 - present Selene Contributors
// SPDX-License-Identifier: MIT

//! Report format selection
//!
//! The format of a report is decided from its file name alone. Files whose
//! name contains one of [`FLAT_FORMAT_MARKERS`] are JUnit/xUnit style reports
//! made of `testcase` elements; every other file is treated as a nested-suite
//! report. There is no "unknown format": unmatched names fall back to the
//! nested strategy.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ReportError;
use crate::result::TestRecord;
use crate::xml::Element;
use crate::{flat, nested};

/// File name substrings that select [`ReportFormat::FlatTestcase`]
///
/// Matching is exact and case-sensitive.
pub const FLAT_FORMAT_MARKERS: [&str; 3] = ["TESTS-", "pytest_xUnit.xml", "gtest_xUnit.xml"];

/// Normalization strategy for a report document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    /// Suites nest inside suites; test names accumulate suite names
    #[default]
    NestedSuite,
    /// A flat scan for `testcase` elements named by `classname` and `name`
    FlatTestcase,
}

impl ReportFormat {
    /// Pick the strategy for a report file name
    #[must_use]
    pub fn select(filename: impl AsRef<Path>) -> Self {
        let filename = filename.as_ref().to_string_lossy();
        if FLAT_FORMAT_MARKERS
            .iter()
            .any(|marker| filename.contains(marker))
        {
            Self::FlatTestcase
        } else {
            Self::NestedSuite
        }
    }

    /// Run this strategy over a document root
    ///
    /// Records come back in document order as defined by the strategy.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::MalformedReport`, `InvalidTimestamp` or
    /// `InvalidDuration` if the document is missing data the format requires.
    pub fn normalize(self, root: &Element) -> Result<Vec<TestRecord>, ReportError> {
        match self {
            Self::NestedSuite => nested::parse_nested(root),
            Self::FlatTestcase => flat::parse_flat(root),
        }
    }

    /// Short name used on the command line
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NestedSuite => "nested",
            Self::FlatTestcase => "flat",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nested" => Ok(Self::NestedSuite),
            "flat" => Ok(Self::FlatTestcase),
            _ => Err(ReportError::UnknownFormat {
                value: s.to_string(),
            }),
        }
    }
}
