//! Fuzz target for compound identifier scope parsing.
//!
//! `parse_scope` is total: any input must produce a scope, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use st_core::scope::parse_scope;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        let _ = parse_scope(raw);
    }
});
