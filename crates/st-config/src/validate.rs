//! Semantic validation for configuration values.
//!
//! This module validates that config values are not just syntactically
//! correct but also semantically valid (positive thresholds, non-zero
//! sample minimums, workable poll intervals).

use thiserror::Error;

use crate::{PipelineConfig, ThresholdConfig};

/// Errors that can occur during semantic validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("z_score_threshold must be positive (got {value:.4})")]
    ZScoreNonPositive { value: f64 },

    #[error("correlation_threshold must be in (0, 1] (got {value:.4})")]
    CorrelationThresholdRange { value: f64 },

    #[error("pmi_threshold must be positive (got {value:.4})")]
    PmiThresholdNonPositive { value: f64 },

    #[error("min_points must be at least 1 (got {value})")]
    MinPointsZero { value: u32 },

    #[error("threshold {field} must be finite")]
    NonFinite { field: String },

    #[error("poll_interval_secs must be at least 1 (got {value})")]
    PollIntervalZero { value: u64 },

    #[error("source path must not be empty")]
    SourceEmpty,
}

/// Validate classification thresholds semantically.
pub fn validate_thresholds(thresholds: &ThresholdConfig) -> Result<(), ValidationError> {
    for (field, value) in [
        ("z_score_threshold", thresholds.z_score_threshold),
        ("correlation_threshold", thresholds.correlation_threshold),
        ("pmi_threshold", thresholds.pmi_threshold),
    ] {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite {
                field: field.to_string(),
            });
        }
    }

    if thresholds.z_score_threshold <= 0.0 {
        return Err(ValidationError::ZScoreNonPositive {
            value: thresholds.z_score_threshold,
        });
    }

    if thresholds.correlation_threshold <= 0.0 || thresholds.correlation_threshold > 1.0 {
        return Err(ValidationError::CorrelationThresholdRange {
            value: thresholds.correlation_threshold,
        });
    }

    if thresholds.pmi_threshold <= 0.0 {
        return Err(ValidationError::PmiThresholdNonPositive {
            value: thresholds.pmi_threshold,
        });
    }

    if thresholds.min_points == 0 {
        return Err(ValidationError::MinPointsZero {
            value: thresholds.min_points,
        });
    }

    Ok(())
}

/// Validate a full pipeline config semantically.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<(), ValidationError> {
    if config.poll_interval_secs == 0 {
        return Err(ValidationError::PollIntervalZero {
            value: config.poll_interval_secs,
        });
    }

    if config.source.as_os_str().is_empty() {
        return Err(ValidationError::SourceEmpty);
    }

    validate_thresholds(&config.thresholds)
}
