//! Severity classification.
//!
//! Classification is a pure function of (core stats, threshold
//! configuration, severity context) with no hidden state. It runs on
//! every commit and again whenever thresholds or context change, so a
//! tier is never a one-way transition.
//!
//! Policy:
//! - `critical`: primary metric at or above the critical cut point AND
//!   confidence >= 0. Negative confidence never yields critical, even
//!   when the metric magnitude is large.
//! - `high`: metric at or above the high cut point, below critical.
//! - `medium`: statistically significant but below high.
//! - `low`: everything else, including insignificant records of any raw
//!   magnitude.

use crate::insight::CoreStats;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use st_common::Severity;
use st_config::ThresholdConfig;

/// Severity cut points recommended by the context collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RecommendedThresholds {
    pub critical: f64,
    pub high: f64,
}

impl Default for RecommendedThresholds {
    fn default() -> Self {
        Self {
            critical: 0.8,
            high: 0.6,
        }
    }
}

/// Contextual severity signals from the external severity-context
/// collaborator (system-wide error rate and its recommended cut points).
///
/// Field names mirror the upstream `severity_context` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SeverityContext {
    pub context_level: String,
    pub overall_error_rate: f64,
    pub recommended_thresholds: RecommendedThresholds,
}

impl Default for SeverityContext {
    fn default() -> Self {
        Self {
            context_level: "medium".to_string(),
            overall_error_rate: 0.0,
            recommended_thresholds: RecommendedThresholds::default(),
        }
    }
}

/// True when the record clears its kind's statistical-significance bar.
///
/// Bursts carry an explicit upstream flag; the other kinds gate on their
/// support-like count against `min_points`, and on the kind's metric
/// threshold.
pub fn is_significant(core: &CoreStats, thresholds: &ThresholdConfig) -> bool {
    match core {
        CoreStats::Burst { is_significant, .. } => *is_significant,
        CoreStats::LeadLag {
            sample_size,
            correlation,
            ..
        } => *sample_size >= thresholds.min_points && *correlation >= thresholds.correlation_threshold,
        CoreStats::Pmi {
            support, pmi_score, ..
        } => *support >= thresholds.min_points && *pmi_score >= thresholds.pmi_threshold,
        CoreStats::ChangeAttribution {
            change_count,
            correlation_coefficient,
            ..
        } => {
            *change_count >= thresholds.min_points
                && *correlation_coefficient >= thresholds.correlation_threshold
        }
    }
}

/// Assign a severity tier.
///
/// Deterministic and idempotent for a given (metric, confidence,
/// thresholds, context) tuple. Monotone in the primary metric for fixed
/// non-negative confidence.
pub fn classify(
    core: &CoreStats,
    thresholds: &ThresholdConfig,
    context: &SeverityContext,
) -> Severity {
    let metric = core.primary_metric();
    let confidence = core.confidence();
    let cuts = &context.recommended_thresholds;

    if metric >= cuts.critical && confidence >= 0.0 {
        Severity::Critical
    } else if metric >= cuts.high {
        Severity::High
    } else if is_significant(core, thresholds) {
        Severity::Medium
    } else {
        Severity::Low
    }
}
