// Copyright (c) 2026 - present Selene Contributors
// SPDX-License-Identifier: MIT

//! Nested-suite report normalization
//!
//! Handles hierarchical reports in the Robot Framework `output.xml` shape:
//!
//! ```xml
//! <robot>
//!   <suite name="Root">
//!     <test name="t1">
//!       <status status="PASS" critical="yes"
//!               starttime="20180826 04:43:00.939" endtime="20180826 04:43:02.239"/>
//!     </test>
//!     <suite name="Child">...</suite>
//!   </suite>
//! </robot>
//! ```
//!
//! Suites are visited depth-first in pre-order. Within a suite, its own tests
//! are emitted before any child suite is entered, so `Root.t1` precedes
//! `Root.Child.t2`.

use chrono::NaiveDateTime;
use tracing::{trace, warn};

use crate::error::ReportError;
use crate::result::{Outcome, TestRecord};
use crate::xml::Element;

/// Layout of the `starttime` / `endtime` attributes
///
/// The fractional seconds are additionally required to be present and
/// [`MAX_FRACTION_DIGITS`] digits at most.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M:%S%.f";

/// Longest fractional-second part accepted in a timestamp (microseconds)
pub const MAX_FRACTION_DIGITS: usize = 6;

/// Normalize every test under the top-level suite of a nested report
///
/// # Errors
///
/// Returns `ReportError::MalformedReport` if the root has no `suite`, a
/// suite or test has no `name`, or a test has no `status` child with the
/// required attributes. Returns `ReportError::InvalidTimestamp` if a start
/// or end time does not match [`TIMESTAMP_FORMAT`] with a fraction of 1 to
/// [`MAX_FRACTION_DIGITS`] digits.
pub fn parse_nested(root: &Element) -> Result<Vec<TestRecord>, ReportError> {
    let suite = root.find("suite").ok_or_else(|| {
        ReportError::malformed(format!("<{}>", root.name()), "missing top-level <suite>")
    })?;

    let mut records = Vec::new();
    collect_suite(suite, None, &mut records)?;
    Ok(records)
}

fn collect_suite(
    suite: &Element,
    parent: Option<&str>,
    records: &mut Vec<TestRecord>,
) -> Result<(), ReportError> {
    let name = suite.attr("name").ok_or_else(|| {
        let location = match parent {
            Some(parent) => format!("suite inside '{parent}'"),
            None => "top-level suite".to_string(),
        };
        ReportError::malformed(location, "missing 'name' attribute")
    })?;

    let qualified = match parent {
        Some(parent) => format!("{parent}.{name}"),
        None => name.to_string(),
    };

    for test in suite.find_all("test") {
        records.push(parse_test(test, &qualified)?);
    }
    for child in suite.find_all("suite") {
        collect_suite(child, Some(&qualified), records)?;
    }

    Ok(())
}

/// Normalize one `test` element belonging to the suite `suite_name`
///
/// # Errors
///
/// See [`parse_nested`].
pub fn parse_test(test: &Element, suite_name: &str) -> Result<TestRecord, ReportError> {
    let test_name = test.attr("name").ok_or_else(|| {
        ReportError::malformed(
            format!("test in suite '{suite_name}'"),
            "missing 'name' attribute",
        )
    })?;
    let name = format!("{suite_name}.{test_name}");
    let element = format!("test '{name}'");

    let status = test
        .find("status")
        .ok_or_else(|| ReportError::malformed(&element, "missing <status> child"))?;
    let state = status
        .attr("status")
        .ok_or_else(|| ReportError::malformed(&element, "<status> missing 'status' attribute"))?
        .to_lowercase();

    let skipped = state == "skip";
    let result = if state == "pass" {
        Outcome::Pass
    } else {
        Outcome::Fail
    };
    let critical = !skipped
        && !status
            .attr("critical")
            .is_some_and(|c| c.eq_ignore_ascii_case("no"));

    let started = timestamp(status, "starttime", &element)?;
    let ended = timestamp(status, "endtime", &element)?;
    let duration = seconds_between(started, ended);
    if duration < 0.0 {
        warn!(test = %name, duration, "Test ends before it starts; keeping negative duration");
    }

    trace!(test = %name, result = %result, critical, duration, "Parsed nested test");

    TestRecord::builder()
        .with_name(name)
        .with_result(result)
        .with_critical(critical)
        .with_test_duration(duration)
        .build()
}

fn timestamp(status: &Element, attr: &str, element: &str) -> Result<NaiveDateTime, ReportError> {
    let value = status.attr(attr).ok_or_else(|| {
        ReportError::malformed(element, format!("<status> missing '{attr}' attribute"))
    })?;
    let invalid = |source: Option<chrono::ParseError>| ReportError::InvalidTimestamp {
        element: element.to_string(),
        value: value.to_string(),
        source,
    };
    // chrono's `%.f` treats the fraction as optional and takes up to 9 digits
    if !has_fraction(value) {
        return Err(invalid(None));
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| invalid(Some(e)))
}

/// Whether `value` ends in `.` followed by 1 to [`MAX_FRACTION_DIGITS`] digits
fn has_fraction(value: &str) -> bool {
    value.rsplit_once('.').is_some_and(|(_, fraction)| {
        (1..=MAX_FRACTION_DIGITS).contains(&fraction.len())
            && fraction.bytes().all(|b| b.is_ascii_digit())
    })
}

/// Elapsed seconds with microsecond precision
fn seconds_between(started: NaiveDateTime, ended: NaiveDateTime) -> f64 {
    let delta = ended - started;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const START: &str = "20180826 04:43:00.939";
    const END: &str = "20180826 04:43:02.239";

    fn status(state: &str) -> Element {
        Element::new("status")
            .with_attribute("status", state)
            .with_attribute("starttime", START)
            .with_attribute("endtime", END)
    }

    fn test_element(name: &str, status: Element) -> Element {
        Element::new("test")
            .with_attribute("name", name)
            .with_child(status)
    }

    fn suite(name: &str) -> Element {
        Element::new("suite").with_attribute("name", name)
    }

    fn names(records: &[TestRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_parse_test_pass() {
        let test = test_element("test", status("pass").with_attribute("critical", "yes"));
        let record = parse_test(&test, "suite").expect("parse");

        assert_eq!(record.name, "suite.test");
        assert_eq!(record.result, Outcome::Pass);
        assert!(record.critical);
        assert_eq!(record.test_duration, Some(1.3));
        assert_eq!(record.branch_name, None);
        assert_eq!(record.log, None);
    }

    #[test]
    fn test_status_is_case_insensitive() {
        let record = parse_test(&test_element("t", status("PASS")), "s").expect("parse");
        assert_eq!(record.result, Outcome::Pass);

        let record = parse_test(&test_element("t", status("Fail")), "s").expect("parse");
        assert_eq!(record.result, Outcome::Fail);
        assert!(record.critical);
    }

    #[test]
    fn test_skip_is_fail_and_non_critical() {
        for critical in [None, Some("yes"), Some("no"), Some("YES")] {
            let mut status = status("SKIP");
            if let Some(value) = critical {
                status = status.with_attribute("critical", value);
            }
            let record = parse_test(&test_element("t", status), "s").expect("parse");
            assert_eq!(record.result, Outcome::Fail);
            assert!(!record.critical, "skip must be non-critical ({critical:?})");
        }
    }

    #[test]
    fn test_critical_no_overrides_pass() {
        let test = test_element("t", status("pass").with_attribute("critical", "No"));
        let record = parse_test(&test, "s").expect("parse");
        assert_eq!(record.result, Outcome::Pass);
        assert!(!record.critical);
    }

    #[test]
    fn test_unknown_status_collapses_to_fail() {
        let record = parse_test(&test_element("t", status("NOT RUN")), "s").expect("parse");
        assert_eq!(record.result, Outcome::Fail);
        assert!(record.critical);
    }

    #[test]
    fn test_negative_duration_is_kept() {
        let status = Element::new("status")
            .with_attribute("status", "PASS")
            .with_attribute("starttime", END)
            .with_attribute("endtime", START);
        let record = parse_test(&test_element("t", status), "s").expect("parse");
        assert_eq!(record.test_duration, Some(-1.3));
    }

    #[test]
    fn test_duration_across_midnight() {
        let status = Element::new("status")
            .with_attribute("status", "PASS")
            .with_attribute("starttime", "20180826 23:59:59.500000")
            .with_attribute("endtime", "20180827 00:00:01.250000");
        let record = parse_test(&test_element("t", status), "s").expect("parse");
        assert_eq!(record.test_duration, Some(1.75));
    }

    #[test]
    fn test_missing_status_is_malformed() {
        let test = Element::new("test").with_attribute("name", "t");
        let err = parse_test(&test, "s").expect_err("should fail");
        match err {
            ReportError::MalformedReport { element, .. } => assert_eq!(element, "test 's.t'"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_endtime_is_malformed() {
        let status = Element::new("status")
            .with_attribute("status", "PASS")
            .with_attribute("starttime", START);
        let result = parse_test(&test_element("t", status), "s");
        assert!(matches!(result, Err(ReportError::MalformedReport { .. })));
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        let status = Element::new("status")
            .with_attribute("status", "PASS")
            .with_attribute("starttime", "N/A")
            .with_attribute("endtime", END);
        let result = parse_test(&test_element("t", status), "s");
        match result {
            Err(ReportError::InvalidTimestamp { value, .. }) => assert_eq!(value, "N/A"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_timestamp_fraction_must_be_one_to_six_digits() {
        for raw in [
            "20180826 04:43:00",
            "20180826 04:43:00.",
            "20180826 04:43:00.1234567",
            "20180826 04:43:00.123456789",
        ] {
            let status = Element::new("status")
                .with_attribute("status", "PASS")
                .with_attribute("starttime", raw)
                .with_attribute("endtime", END);
            match parse_test(&test_element("t", status), "s") {
                Err(ReportError::InvalidTimestamp { value, source, .. }) => {
                    assert_eq!(value, raw);
                    assert!(source.is_none());
                }
                other => panic!("unexpected result for {raw:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_timestamp_fraction_lengths_accepted() {
        for (start, expected) in [
            ("20180826 04:43:02.2", 0.039),
            ("20180826 04:43:02.239000", 0.0),
            ("20180826 04:43:02.238999", 0.000001),
        ] {
            let status = Element::new("status")
                .with_attribute("status", "PASS")
                .with_attribute("starttime", start)
                .with_attribute("endtime", END);
            let record = parse_test(&test_element("t", status), "s").expect("parse");
            let duration = record.test_duration.expect("duration");
            assert!((duration - expected).abs() < 1e-9, "{start}: {duration}");
        }
    }

    #[test]
    fn test_ordering_tests_before_child_suites() {
        let root = Element::new("robot").with_child(
            suite("A")
                .with_child(suite("B").with_child(test_element("t3", status("PASS"))))
                .with_child(test_element("t1", status("PASS")))
                .with_child(test_element("t2", status("FAIL"))),
        );
        let records = parse_nested(&root).expect("parse");
        assert_eq!(names(&records), vec!["A.t1", "A.t2", "A.B.t3"]);
    }

    #[test]
    fn test_name_flattening_three_levels() {
        let root = Element::new("robot").with_child(
            suite("root").with_child(
                suite("mid").with_child(suite("leaf").with_child(test_element("case1", status("PASS")))),
            ),
        );
        let records = parse_nested(&root).expect("parse");
        assert_eq!(names(&records), vec!["root.mid.leaf.case1"]);
    }

    #[test]
    fn test_sibling_suites_in_document_order() {
        let root = Element::new("robot").with_child(
            suite("R")
                .with_child(
                    suite("X")
                        .with_child(test_element("a", status("PASS")))
                        .with_child(suite("Y").with_child(test_element("b", status("PASS")))),
                )
                .with_child(suite("Z").with_child(test_element("c", status("PASS")))),
        );
        let records = parse_nested(&root).expect("parse");
        assert_eq!(names(&records), vec!["R.X.a", "R.X.Y.b", "R.Z.c"]);
    }

    #[test]
    fn test_empty_root_suite() {
        let root = Element::new("robot").with_child(suite("Empty"));
        let records = parse_nested(&root).expect("parse");
        assert!(records.is_empty());
    }

    #[test]
    fn test_only_first_top_level_suite_is_used() {
        let root = Element::new("robot")
            .with_child(suite("First").with_child(test_element("t", status("PASS"))))
            .with_child(suite("Second").with_child(test_element("u", status("PASS"))));
        let records = parse_nested(&root).expect("parse");
        assert_eq!(names(&records), vec!["First.t"]);
    }

    #[test]
    fn test_non_suite_children_are_ignored() {
        let root = Element::new("robot")
            .with_child(
                suite("S")
                    .with_child(Element::new("kw").with_attribute("name", "Setup"))
                    .with_child(test_element("t", status("PASS")))
                    .with_child(Element::new("status").with_attribute("status", "PASS")),
            )
            .with_child(Element::new("statistics"));
        let records = parse_nested(&root).expect("parse");
        assert_eq!(names(&records), vec!["S.t"]);
    }

    #[test]
    fn test_missing_top_level_suite() {
        let root = Element::new("robot");
        let result = parse_nested(&root);
        assert!(matches!(result, Err(ReportError::MalformedReport { .. })));
    }

    #[test]
    fn test_suite_without_name_is_malformed() {
        let root = Element::new("robot").with_child(
            suite("Root").with_child(Element::new("suite").with_child(test_element("t", status("PASS")))),
        );
        let err = parse_nested(&root).expect_err("should fail");
        match err {
            ReportError::MalformedReport { element, .. } => {
                assert_eq!(element, "suite inside 'Root'")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
