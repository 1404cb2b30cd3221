// Copyright (c) 2026 - present Selene Contributors
// SPDX-License-Identifier: MIT

//! Fuzz target for flat testcase (JUnit/xUnit style) normalization

#![no_main]

use libfuzzer_sys::fuzz_target;

use selene_reports::ReportFile;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut report = ReportFile::new("TESTS-fuzz.xml");
        let _ = report.parse_str(input);
    }
});
