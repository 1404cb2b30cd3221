// Copyright (c) 2026 - present Selene Contributors
// SPDX-License-Identifier: MIT

//! Flat `testcase` report normalization
//!
//! Covers the JUnit-family dialects (Ant `TESTS-*.xml` aggregates, pytest and
//! gtest xUnit output). Every `testcase` element anywhere in the tree becomes
//! one record named `{classname}.{name}`; enclosing `testsuite` elements do
//! not contribute to the name.

use tracing::trace;

use crate::error::ReportError;
use crate::result::{Outcome, TestRecord};
use crate::xml::Element;

/// Normalize every `testcase` element in document order
///
/// # Errors
///
/// Returns `ReportError::MalformedReport` if a testcase lacks `classname`,
/// `name` or `time`, and `ReportError::InvalidDuration` if `time` is not a
/// finite number.
pub fn parse_flat(root: &Element) -> Result<Vec<TestRecord>, ReportError> {
    root.iter()
        .filter(|element| element.name() == "testcase")
        .enumerate()
        .map(|(index, case)| parse_testcase(case, index + 1))
        .collect()
}

/// Normalize one `testcase` element; `position` is its 1-based index among
/// the report's testcases and is only used in error messages
///
/// # Errors
///
/// See [`parse_flat`].
pub fn parse_testcase(case: &Element, position: usize) -> Result<TestRecord, ReportError> {
    let classname = case.attr("classname").ok_or_else(|| {
        ReportError::malformed(format!("testcase #{position}"), "missing 'classname' attribute")
    })?;
    let test_name = case.attr("name").ok_or_else(|| {
        ReportError::malformed(format!("testcase #{position}"), "missing 'name' attribute")
    })?;
    let name = format!("{classname}.{test_name}");
    let element = format!("testcase '{name}'");

    let status = case.attr("status");
    let skipped = case.has_child("skipped") || status == Some("skipped");
    let failed = skipped || case.has_child("failure") || status == Some("failure");

    let raw_time = case
        .attr("time")
        .ok_or_else(|| ReportError::malformed(&element, "missing 'time' attribute"))?;
    let invalid = |source: Option<std::num::ParseFloatError>| ReportError::InvalidDuration {
        element: element.clone(),
        value: raw_time.to_string(),
        source,
    };
    let duration = raw_time
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid(Some(e)))?;
    if !duration.is_finite() {
        return Err(invalid(None));
    }

    let result = if failed { Outcome::Fail } else { Outcome::Pass };
    trace!(test = %name, result = %result, critical = !skipped, duration, "Parsed testcase");

    TestRecord::builder()
        .with_name(name)
        .with_result(result)
        .with_critical(!skipped)
        .with_test_duration(duration)
        .build()
}
