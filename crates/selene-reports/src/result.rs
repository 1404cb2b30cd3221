// Copyright (c) 2026 - present Selene Contributors
// SPDX-License-Identifier: MIT

//! Canonical test record types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// Normalized outcome of a single test
///
/// Runners report richer states (skip, error, not run); anything that is not
/// an explicit pass is recorded as [`Outcome::Fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Test passed
    Pass,
    /// Test failed, errored or was skipped
    Fail,
}

impl Outcome {
    /// Lowercase wire form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pass" => Ok(Self::Pass),
            "fail" => Ok(Self::Fail),
            _ => Err(ReportError::UnknownOutcome {
                value: s.to_string(),
            }),
        }
    }
}

fn default_critical() -> bool {
    true
}

/// One executed test case, independent of the runner that reported it
///
/// Serializes to a flat JSON object; optional fields that are absent are
/// omitted rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    /// Dot-joined test name
    pub name: String,
    /// Pass or fail
    pub result: Outcome,
    /// Branch the test ran on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    /// Build the test ran in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,
    /// Opaque reference to the uploaded log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    /// Pipeline stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Whether a failure blocks the pipeline
    #[serde(default = "default_critical")]
    pub critical: bool,
    /// Elapsed time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_duration: Option<f64>,
}

impl TestRecord {
    /// Start building a record
    #[must_use]
    pub fn builder() -> TestRecordBuilder {
        TestRecordBuilder::new()
    }

    /// Reopen this record as a builder, e.g. to attach branch/build context
    #[must_use]
    pub fn into_builder(self) -> TestRecordBuilder {
        TestRecordBuilder {
            name: Some(self.name),
            result: Some(self.result),
            branch_name: self.branch_name,
            build_name: self.build_name,
            log: self.log,
            stage: self.stage,
            critical: Some(self.critical),
            test_duration: self.test_duration,
        }
    }

    /// Check if the test passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.result == Outcome::Pass
    }

    /// Check if the test failed
    #[must_use]
    pub fn failed(&self) -> bool {
        self.result == Outcome::Fail
    }

    /// Enclosing suite or class path, e.g. `Root.Sub` for `Root.Sub.case`
    #[must_use]
    pub fn suite_path(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(suite, _)| suite)
    }

    /// Last name component, e.g. `case` for `Root.Sub.case`
    #[must_use]
    pub fn leaf_name(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map_or(self.name.as_str(), |(_, leaf)| leaf)
    }

    /// Human readable duration: `850ms`, `1.30s`, or `-` when unknown
    #[must_use]
    pub fn duration_display(&self) -> String {
        match self.test_duration {
            None => "-".to_string(),
            Some(secs) if secs.abs() < 1.0 => format!("{}ms", (secs * 1000.0).round() as i64),
            Some(secs) => format!("{secs:.2}s"),
        }
    }
}

/// Staged constructor for [`TestRecord`]
#[derive(Debug, Clone, Default)]
pub struct TestRecordBuilder {
    name: Option<String>,
    result: Option<Outcome>,
    branch_name: Option<String>,
    build_name: Option<String>,
    log: Option<String>,
    stage: Option<String>,
    critical: Option<bool>,
    test_duration: Option<f64>,
}

impl TestRecordBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dot-joined test name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the outcome
    #[must_use]
    pub fn with_result(mut self, result: Outcome) -> Self {
        self.result = Some(result);
        self
    }

    /// Set the branch name
    #[must_use]
    pub fn with_branch_name(mut self, branch_name: impl Into<String>) -> Self {
        self.branch_name = Some(branch_name.into());
        self
    }

    /// Set the build name
    #[must_use]
    pub fn with_build_name(mut self, build_name: impl Into<String>) -> Self {
        self.build_name = Some(build_name.into());
        self
    }

    /// Set the log reference
    #[must_use]
    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = Some(log.into());
        self
    }

    /// Set the pipeline stage
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Set criticality (defaults to `true`)
    #[must_use]
    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = Some(critical);
        self
    }

    /// Set the duration in seconds
    #[must_use]
    pub fn with_test_duration(mut self, seconds: f64) -> Self {
        self.test_duration = Some(seconds);
        self
    }

    /// Produce the record
    ///
    /// Only the record's own required fields are checked here; callers that
    /// need branch/build/log enforce that themselves.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::MissingField` if the name is missing or empty, or
    /// the result was never set.
    pub fn build(self) -> Result<TestRecord, ReportError> {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or(ReportError::MissingField { field: "name" })?;
        let result = self
            .result
            .ok_or(ReportError::MissingField { field: "result" })?;

        Ok(TestRecord {
            name,
            result,
            branch_name: self.branch_name,
            build_name: self.build_name,
            log: self.log,
            stage: self.stage,
            critical: self.critical.unwrap_or(true),
            test_duration: self.test_duration,
        })
    }
}

/// Totals over the records of one or more reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of records
    pub total: usize,
    /// Records with `result = pass`
    pub passed: usize,
    /// Records with `result = fail`
    pub failed: usize,
    /// Records marked non-critical
    pub non_critical: usize,
    /// Failed records that are critical
    pub critical_failures: usize,
    /// Sum of known durations in seconds
    pub duration_secs: f64,
}

impl ReportSummary {
    /// Summarize a slice of records
    #[must_use]
    pub fn from_records(records: &[TestRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            summary.total += 1;
            if record.passed() {
                summary.passed += 1;
            } else {
                summary.failed += 1;
                if record.critical {
                    summary.critical_failures += 1;
                }
            }
            if !record.critical {
                summary.non_critical += 1;
            }
            summary.duration_secs += record.test_duration.unwrap_or(0.0);
            summary
        })
    }

    /// Check if no critical test failed
    #[must_use]
    pub fn is_green(&self) -> bool {
        self.critical_failures == 0
    }

    /// Get failing records from a slice
    #[must_use]
    pub fn failing_tests(records: &[TestRecord]) -> Vec<&TestRecord> {
        records.iter().filter(|r| r.failed()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn sample_record() -> TestRecord {
        TestRecord::builder()
            .with_name("suite.test")
            .with_result(Outcome::Pass)
            .with_build_name("bar")
            .with_log("log_file.log")
            .with_stage("One")
            .with_critical(true)
            .with_test_duration(1.3)
            .build()
            .expect("build")
    }

    #[test]
    fn test_builder_sets_all_fields() {
        let record = sample_record();
        assert_eq!(record.name, "suite.test");
        assert_eq!(record.result, Outcome::Pass);
        assert_eq!(record.branch_name, None);
        assert_eq!(record.build_name.as_deref(), Some("bar"));
        assert_eq!(record.log.as_deref(), Some("log_file.log"));
        assert_eq!(record.stage.as_deref(), Some("One"));
        assert!(record.critical);
        assert_eq!(record.test_duration, Some(1.3));
    }

    #[test]
    fn test_builder_defaults_critical_to_true() {
        let record = TestRecord::builder()
            .with_name("a.b")
            .with_result(Outcome::Fail)
            .build()
            .expect("build");
        assert!(record.critical);
        assert_eq!(record.test_duration, None);
    }

    #[test]
    fn test_builder_requires_name() {
        let result = TestRecord::builder().with_result(Outcome::Pass).build();
        assert!(matches!(
            result,
            Err(ReportError::MissingField { field: "name" })
        ));
    }

    #[test]
    fn test_builder_rejects_empty_name() {
        let result = TestRecord::builder()
            .with_name("")
            .with_result(Outcome::Pass)
            .build();
        assert!(matches!(
            result,
            Err(ReportError::MissingField { field: "name" })
        ));
    }

    #[test]
    fn test_builder_requires_result() {
        let result = TestRecord::builder().with_name("a.b").build();
        assert!(matches!(
            result,
            Err(ReportError::MissingField { field: "result" })
        ));
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let json = serde_json::to_value(sample_record()).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "name": "suite.test",
                "result": "pass",
                "build_name": "bar",
                "log": "log_file.log",
                "stage": "One",
                "critical": true,
                "test_duration": 1.3,
            })
        );
    }

    #[test]
    fn test_json_key_order() {
        let record = sample_record()
            .into_builder()
            .with_branch_name("main")
            .build()
            .expect("build");
        let json = serde_json::to_string(&record).expect("serialize");
        assert_eq!(
            json,
            r#"{"name":"suite.test","result":"pass","branch_name":"main","build_name":"bar","log":"log_file.log","stage":"One","critical":true,"test_duration":1.3}"#
        );
    }

    #[test]
    fn test_json_null_and_absent_are_equivalent() {
        let with_nulls: TestRecord = serde_json::from_str(
            r#"{"name":"a.b","result":"fail","log":null,"stage":null,"test_duration":null}"#,
        )
        .expect("deserialize");
        let without: TestRecord =
            serde_json::from_str(r#"{"name":"a.b","result":"fail"}"#).expect("deserialize");
        assert_eq!(with_nulls, without);
        assert!(without.critical);
    }

    #[test]
    fn test_json_rejects_unknown_result() {
        let result: Result<TestRecord, _> =
            serde_json::from_str(r#"{"name":"a.b","result":"skip"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_into_builder_preserves_fields() {
        let record = sample_record();
        let rebuilt = record.clone().into_builder().build().expect("build");
        assert_eq!(record, rebuilt);
    }

    #[test]
    fn test_name_helpers() {
        let record = TestRecord::builder()
            .with_name("Root.Sub.case one")
            .with_result(Outcome::Pass)
            .build()
            .expect("build");
        assert_eq!(record.suite_path(), Some("Root.Sub"));
        assert_eq!(record.leaf_name(), "case one");

        let bare = TestRecord::builder()
            .with_name("standalone")
            .with_result(Outcome::Pass)
            .build()
            .expect("build");
        assert_eq!(bare.suite_path(), None);
        assert_eq!(bare.leaf_name(), "standalone");
    }

    #[test]
    fn test_duration_display() {
        let record = |secs: Option<f64>| {
            let builder = TestRecord::builder()
                .with_name("a.b")
                .with_result(Outcome::Pass);
            match secs {
                Some(s) => builder.with_test_duration(s),
                None => builder,
            }
            .build()
            .expect("build")
        };
        assert_eq!(record(Some(0.85)).duration_display(), "850ms");
        assert_eq!(record(Some(1.3)).duration_display(), "1.30s");
        assert_eq!(record(Some(1.0)).duration_display(), "1.00s");
        assert_eq!(record(None).duration_display(), "-");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Pass.to_string(), "pass");
        assert_eq!(Outcome::Fail.to_string(), "fail");
    }

    #[test]
    fn test_outcome_from_str() {
        assert_eq!("pass".parse::<Outcome>().expect("pass"), Outcome::Pass);
        assert_eq!("FAIL".parse::<Outcome>().expect("fail"), Outcome::Fail);
        assert!(matches!(
            "skip".parse::<Outcome>(),
            Err(ReportError::UnknownOutcome { .. })
        ));
    }

    #[test]
    fn test_summary_from_records() {
        let pass = sample_record();
        let critical_fail = TestRecord::builder()
            .with_name("s.fail")
            .with_result(Outcome::Fail)
            .with_test_duration(0.5)
            .build()
            .expect("build");
        let skipped = TestRecord::builder()
            .with_name("s.skip")
            .with_result(Outcome::Fail)
            .with_critical(false)
            .build()
            .expect("build");
        let records = vec![pass, critical_fail, skipped];

        let summary = ReportSummary::from_records(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.non_critical, 1);
        assert_eq!(summary.critical_failures, 1);
        assert!((summary.duration_secs - 1.8).abs() < 1e-9);
        assert!(!summary.is_green());

        let failing = ReportSummary::failing_tests(&records);
        assert_eq!(failing.len(), 2);
        assert_eq!(failing[0].name, "s.fail");
    }

    #[test]
    fn test_empty_summary_is_green() {
        let summary = ReportSummary::from_records(&[]);
        assert_eq!(summary, ReportSummary::default());
        assert!(summary.is_green());
    }
}
