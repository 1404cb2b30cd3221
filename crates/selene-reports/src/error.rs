// Copyright (c) 2026 - present Selene Contributors
// SPDX-License-Identifier: MIT

//! Error types for selene-reports

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading and normalizing a test report
#[derive(Debug, Error)]
pub enum ReportError {
    /// The document is not well-formed XML
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Error reading the report file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document parsed but has no usable element tree
    #[error("Malformed XML document: {message}")]
    MalformedDocument {
        /// Description of the structural problem
        message: String,
    },

    /// An element the report format requires is missing or incomplete
    #[error("Malformed report at {element}: {message}")]
    MalformedReport {
        /// The element that could not be normalized
        element: String,
        /// Description of what is missing
        message: String,
    },

    /// A `starttime`/`endtime` value does not match `YYYYMMDD HH:MM:SS.ffffff`
    #[error("Invalid timestamp '{value}' at {element}")]
    InvalidTimestamp {
        /// The element carrying the timestamp
        element: String,
        /// The raw attribute value
        value: String,
        /// Underlying chrono error; `None` when the fraction has the wrong shape
        source: Option<chrono::ParseError>,
    },

    /// A `time` attribute is not a finite number of seconds
    #[error("Invalid duration '{value}' at {element}")]
    InvalidDuration {
        /// The element carrying the duration
        element: String,
        /// The raw attribute value
        value: String,
        /// Underlying float parse error; `None` for NaN and infinities
        source: Option<std::num::ParseFloatError>,
    },

    /// A format name that is neither `nested` nor `flat`
    #[error("Unknown report format: {value}")]
    UnknownFormat {
        /// The rejected format name
        value: String,
    },

    /// An outcome name that is neither `pass` nor `fail`
    #[error("Unknown test outcome: {value}")]
    UnknownOutcome {
        /// The rejected outcome name
        value: String,
    },

    /// A record was built without one of its required fields
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// Any of the above, attributed to the report file it came from
    #[error("{}: {source}", .path.display())]
    File {
        /// The report file being normalized
        path: PathBuf,
        /// The underlying failure
        #[source]
        source: Box<ReportError>,
    },
}

impl ReportError {
    /// Shorthand for a [`ReportError::MalformedReport`]
    pub(crate) fn malformed(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedReport {
            element: element.into(),
            message: message.into(),
        }
    }

    /// Attach the originating file path to this error
    #[must_use]
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            already @ Self::File { .. } => already,
            other => Self::File {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}
