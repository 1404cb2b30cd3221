// Copyright (c) 2026 - present Selene Contributors
// SPDX-License-Identifier: MIT

//! Fuzz target for the XML element tree builder
//!
//! This fuzzes `Element::parse_bytes`, which every report goes through
//! before a normalization strategy sees it.

#![no_main]

use libfuzzer_sys::fuzz_target;

use selene_reports::xml::Element;

fuzz_target!(|data: &[u8]| {
    if let Ok(root) = Element::parse_bytes(data) {
        // A successfully built tree must be walkable
        let _ = root.iter().count();
    }
});
