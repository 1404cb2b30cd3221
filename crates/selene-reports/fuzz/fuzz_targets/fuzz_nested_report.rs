// Copyright (c) 2026 - present Selene Contributors
// SPDX-License-Identifier: MIT

//! Fuzz target for nested suite (Robot Framework style) normalization

#![no_main]

use libfuzzer_sys::fuzz_target;

use selene_reports::ReportFile;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed reports must surface as errors, never panics
        let mut report = ReportFile::new("output.xml");
        let _ = report.parse_str(input);
    }
});
