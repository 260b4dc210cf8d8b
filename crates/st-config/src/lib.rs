//! Signal Triage configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the pipeline config file
//! - Adaptive classification thresholds (the knobs the upstream engine
//!   tunes between ingestion cycles)
//! - Schema validation (shape/type checking via serde)
//! - Semantic validation (positive thresholds, sane intervals)
//!
//! Threshold updates are validated before they take effect; a rejected
//! update leaves the last valid configuration in place (the caller in
//! st-core enforces that contract).

pub mod validate;

pub use validate::{validate_pipeline, validate_thresholds, ValidationError};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use st_common::BucketSize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Default poll interval between ingestion cycles (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Adaptive classification thresholds.
///
/// Field names mirror the upstream engine's `adaptive_thresholds` block and
/// are a wire compatibility contract. Values may change between ingestion
/// cycles; classification is a pure function of (metric, confidence, these
/// thresholds) with no hidden state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Z-score threshold for anomaly gating.
    pub z_score_threshold: f64,
    /// Primary-metric threshold for correlation kinds.
    pub correlation_threshold: f64,
    /// Primary-metric threshold for PMI co-occurrence.
    pub pmi_threshold: f64,
    /// Minimum sample/support count for statistical significance.
    pub min_points: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            z_score_threshold: 2.5,
            correlation_threshold: 0.3,
            pmi_threshold: 1.0,
            min_points: 3,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    /// Path to the NDJSON record source.
    pub source: PathBuf,
    /// Interval between ingestion cycles (seconds).
    pub poll_interval_secs: u64,
    /// Time-bucket width used for insight id derivation.
    pub bucket_size: BucketSize,
    /// Adaptive classification thresholds.
    pub thresholds: ThresholdConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("insights.ndjson"),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            bucket_size: BucketSize::default(),
            thresholds: ThresholdConfig::default(),
        }
    }
}

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load and validate a pipeline config from a JSON file.
///
/// A `None` path yields the validated defaults.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let config = match path {
        None => PipelineConfig::default(),
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?
        }
    };

    validate_pipeline(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(validate_pipeline(&config).is_ok());
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.thresholds.min_points, 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/st.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"poll_interval_secs": 10, "thresholds": {{"correlation_threshold": 0.5}}}}"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.poll_interval_secs, 10);
        assert!((config.thresholds.correlation_threshold - 0.5).abs() < 1e-9);
        // Unspecified fields fall back to defaults.
        assert!((config.thresholds.pmi_threshold - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_load_rejects_semantic_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"thresholds": {{"min_points": 0}}}}"#).unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
