//! Error types for Signal Triage.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//!
//! Per-record errors (`ParseError`, `UnknownRecordType`,
//! `MissingRequiredField`) are local by design: the ingestion pipeline
//! counts them and continues the cycle. Per-cycle errors
//! (`SourceUnavailable`) surface as degraded freshness, never as a crash.
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 12,
//!   "category": "ingest",
//!   "message": "record missing required field: type",
//!   "recoverable": true,
//!   "context": { "field": "type" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Signal Triage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Record parsing and ingestion errors.
    Ingest,
    /// Source stream availability errors.
    Source,
    /// Threshold/poller configuration errors.
    Config,
    /// File I/O and serialization errors.
    Io,
    /// Query surface errors.
    Query,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Ingest => write!(f, "ingest"),
            ErrorCategory::Source => write!(f, "source"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Query => write!(f, "query"),
        }
    }
}

/// Unified error type for Signal Triage.
#[derive(Error, Debug)]
pub enum Error {
    // Ingest errors (10-19)
    #[error("malformed record line: {0}")]
    ParseError(String),

    #[error("unknown record type: {record_type}")]
    UnknownRecordType { record_type: String },

    #[error("record missing required field: {field}")]
    MissingRequiredField { field: String },

    // Source errors (20-29)
    #[error("record source unavailable: {0}")]
    SourceUnavailable(String),

    // Config errors (30-39)
    #[error("invalid threshold configuration: {0}")]
    ThresholdConfigInvalid(String),

    #[error("configuration error: {0}")]
    Config(String),

    // Query errors (40-49)
    #[error("insight not found: {id}")]
    InsightNotFound { id: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Ingest errors
    /// - 20-29: Source errors
    /// - 30-39: Config errors
    /// - 40-49: Query errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::ParseError(_) => 10,
            Error::UnknownRecordType { .. } => 11,
            Error::MissingRequiredField { .. } => 12,
            Error::SourceUnavailable(_) => 20,
            Error::ThresholdConfigInvalid(_) => 30,
            Error::Config(_) => 31,
            Error::InsightNotFound { .. } => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ParseError(_)
            | Error::UnknownRecordType { .. }
            | Error::MissingRequiredField { .. } => ErrorCategory::Ingest,

            Error::SourceUnavailable(_) => ErrorCategory::Source,

            Error::ThresholdConfigInvalid(_) | Error::Config(_) => ErrorCategory::Config,

            Error::InsightNotFound { .. } => ErrorCategory::Query,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Every ingest-category error is recoverable by construction: the
    /// offending record is skipped and counted, the cycle continues.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::ParseError(_) => true,
            Error::UnknownRecordType { .. } => true,
            Error::MissingRequiredField { .. } => true,

            // Retried on the next scheduled cycle.
            Error::SourceUnavailable(_) => true,

            // Rejected; the last valid configuration stays in effect.
            Error::ThresholdConfigInvalid(_) => true,
            Error::Config(_) => true,

            Error::InsightNotFound { .. } => false,

            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., field name, source path).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::UnknownRecordType { record_type } => {
                context.insert("record_type".to_string(), serde_json::json!(record_type));
            }
            Error::MissingRequiredField { field } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            Error::InsightNotFound { id } => {
                context.insert("id".to_string(), serde_json::json!(id));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}
