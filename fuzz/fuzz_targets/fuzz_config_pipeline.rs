//! Fuzz target for pipeline configuration parsing.
//!
//! Tests that JSON config parsing and semantic validation handle
//! arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use st_config::{validate_pipeline, PipelineConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<PipelineConfig>(data) {
        let _ = validate_pipeline(&config);
    }
});
