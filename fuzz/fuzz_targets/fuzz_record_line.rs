//! Fuzz target for NDJSON record line parsing.
//!
//! Tests that record parsing handles arbitrary input without panicking.
//! The stream is append-only and externally produced, so malformed lines
//! must always come back as errors, never as crashes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use st_core::record::parse_line;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        // Should never panic, only return an error
        let _ = parse_line(line);
    }
});
