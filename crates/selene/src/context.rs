//! Build context
//!
//! Normalized records carry only what the report itself knows. The
//! [`BuildContext`] holds the CI-side facts (branch, build, stage, status)
//! that every record from one run shares, and attaches them on the way to a
//! sink.

use std::path::PathBuf;

use selene_reports::TestRecord;
use serde::Serialize;
use thiserror::Error;

/// Build context errors
#[derive(Debug, Error)]
pub enum ContextError {
    /// A required field was empty
    #[error("Missing required build field: {field}")]
    MissingField {
        /// Name of the empty field
        field: &'static str,
    },
}

/// The branch and build that a set of test results belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildContext {
    /// Branch the build ran on
    pub branch_name: String,
    /// Build name or number
    #[serde(rename = "name")]
    pub build_name: String,
    /// Testing stage (e.g. "smoke", "regression")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Overall build status reported by the CI system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Directory the reports were collected from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_path: Option<PathBuf>,
}

impl BuildContext {
    /// Create a context for `branch` / `build`
    ///
    /// # Errors
    ///
    /// Returns `ContextError::MissingField` if either name is empty or blank.
    pub fn new(branch: impl Into<String>, build: impl Into<String>) -> Result<Self, ContextError> {
        let branch_name = branch.into();
        let build_name = build.into();

        if branch_name.trim().is_empty() {
            return Err(ContextError::MissingField { field: "branch" });
        }
        if build_name.trim().is_empty() {
            return Err(ContextError::MissingField { field: "build" });
        }

        Ok(Self {
            branch_name,
            build_name,
            stage: None,
            status: None,
            results_path: None,
        })
    }

    /// Set the testing stage
    #[must_use]
    pub fn with_stage(mut self, stage: Option<String>) -> Self {
        self.stage = stage.filter(|s| !s.is_empty());
        self
    }

    /// Set the CI build status
    #[must_use]
    pub fn with_status(mut self, status: Option<String>) -> Self {
        self.status = status.filter(|s| !s.is_empty());
        self
    }

    /// Set the results directory
    #[must_use]
    pub fn with_results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_path = Some(path.into());
        self
    }

    /// Attach branch, build, stage and log reference to a record
    #[must_use]
    pub fn apply(&self, record: TestRecord, log: Option<&str>) -> TestRecord {
        TestRecord {
            branch_name: Some(self.branch_name.clone()),
            build_name: Some(self.build_name.clone()),
            stage: self.stage.clone(),
            log: log.map(str::to_string),
            ..record
        }
    }
}
