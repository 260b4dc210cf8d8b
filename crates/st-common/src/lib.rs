//! Signal Triage common types, IDs, and errors.
//!
//! This crate provides foundational types shared across st-core modules:
//! - Insight kind and severity taxonomies
//! - Deterministic insight identifiers and cycle IDs
//! - Common error types with stable codes
//! - Output format specifications

pub mod error;
pub mod id;
pub mod kinds;
pub mod output;

pub use error::{Error, Result, StructuredError};
pub use id::{CycleId, InsightId};
pub use kinds::{BucketSize, InsightKind, Severity};
pub use output::OutputFormat;

/// Schema version for all serialized pipeline output.
pub const SCHEMA_VERSION: &str = "1.0.0";
