//! The unified Insight entity.
//!
//! One Insight is the normalized, classified representation of one
//! correlation/co-occurrence signal. Kind-specific statistics are carried
//! verbatim from the raw record in [`CoreStats`]; computed fields live in
//! [`DerivedMetrics`]; severity and deduplication state are mutable and
//! recomputed by the pipeline, never by hand.

use crate::scope::ScopeRef;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use st_common::{InsightId, InsightKind, Severity};

/// One participant in a correlation pair: the raw identifier plus its
/// parsed scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Participant {
    pub id: String,
    pub scope: ScopeRef,
}

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let scope = crate::scope::parse_scope(&id);
        Participant { id, scope }
    }
}

/// Kind-specific numeric payload, preserved verbatim from input.
///
/// Correlation- and confidence-like fields are NOT clamped to [0, 1]:
/// negative confidence is observed in lead-lag source data and the
/// classifier relies on its sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "stats_kind", rename_all = "snake_case")]
pub enum CoreStats {
    Burst {
        correlation: f64,
        aligned_bursts: u32,
        total_buckets: u32,
        alignment_strength: f64,
        confidence_interval: [f64; 2],
        p_value: f64,
        sample_size: u32,
        is_significant: bool,
        strategy: String,
    },
    LeadLag {
        lag_seconds: f64,
        lag_buckets: i64,
        correlation: f64,
        granger_score: f64,
        precedence_score: f64,
        confidence: f64,
        sample_size: u32,
        direction: String,
    },
    Pmi {
        pmi_score: f64,
        support: u32,
        count_a: u32,
        count_b: u32,
        total_buckets: u32,
        confidence: f64,
        p_a: f64,
        p_b: f64,
        p_ab: f64,
        type_a: String,
        type_b: String,
    },
    ChangeAttribution {
        correlation_coefficient: f64,
        lag_minutes: f64,
        lag_ms: i64,
        change_count: u32,
        effect_count: u32,
        confidence: f64,
        method: String,
    },
}

impl CoreStats {
    /// The primary strength metric the classifier scores on.
    pub fn primary_metric(&self) -> f64 {
        match self {
            CoreStats::Burst { correlation, .. } => *correlation,
            CoreStats::LeadLag { correlation, .. } => *correlation,
            CoreStats::Pmi { pmi_score, .. } => *pmi_score,
            CoreStats::ChangeAttribution {
                correlation_coefficient,
                ..
            } => *correlation_coefficient,
        }
    }

    /// Confidence in the signal. Bursts carry no explicit confidence; the
    /// complement of the p-value stands in for the critical gate.
    pub fn confidence(&self) -> f64 {
        match self {
            CoreStats::Burst { p_value, .. } => 1.0 - p_value,
            CoreStats::LeadLag { confidence, .. } => *confidence,
            CoreStats::Pmi { confidence, .. } => *confidence,
            CoreStats::ChangeAttribution { confidence, .. } => *confidence,
        }
    }

    /// Correlation-like metric, where the kind has one.
    pub fn correlation(&self) -> Option<f64> {
        match self {
            CoreStats::Burst { correlation, .. } => Some(*correlation),
            CoreStats::LeadLag { correlation, .. } => Some(*correlation),
            CoreStats::Pmi { .. } => None,
            CoreStats::ChangeAttribution {
                correlation_coefficient,
                ..
            } => Some(*correlation_coefficient),
        }
    }

    /// Support-like sample count used for significance and sparse flags.
    pub fn support_count(&self) -> u32 {
        match self {
            CoreStats::Burst { sample_size, .. } => *sample_size,
            CoreStats::LeadLag { sample_size, .. } => *sample_size,
            CoreStats::Pmi { support, .. } => *support,
            CoreStats::ChangeAttribution { change_count, .. } => *change_count,
        }
    }
}

/// Computed fields not present verbatim in input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DerivedMetrics {
    /// PMI lift; `None` means undefined (insufficient data), not low lift.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lift: Option<f64>,
    /// Human-readable lag ("simultaneous", "+2.0m").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lag_display: Option<String>,
    /// Change-to-effect span in hours, full precision; rounding is a
    /// presentation concern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f64>,
}

/// Deduplication annotation. Never deletes; only marks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DedupState {
    pub is_semantic_duplicate: bool,
    /// When set, references an existing insight of the same kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<InsightId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Normalized, classified representation of one correlation signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Insight {
    pub id: InsightId,
    pub kind: InsightKind,
    pub participants: [Participant; 2],
    pub core: CoreStats,
    pub derived: DerivedMetrics,
    pub severity: Severity,
    pub dedup: DedupState,
    /// Timestamp of the triggering data window (epoch milliseconds).
    pub observed_at: i64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pmi_stats() -> CoreStats {
        CoreStats::Pmi {
            pmi_score: 2.0,
            support: 5,
            count_a: 10,
            count_b: 10,
            total_buckets: 100,
            confidence: 0.9,
            p_a: 0.1,
            p_b: 0.1,
            p_ab: 0.05,
            type_a: "namespace".to_string(),
            type_b: "event".to_string(),
        }
    }

    #[test]
    fn test_primary_metric_per_kind() {
        assert!((pmi_stats().primary_metric() - 2.0).abs() < 1e-9);

        let burst = CoreStats::Burst {
            correlation: 0.8,
            aligned_bursts: 4,
            total_buckets: 10,
            alignment_strength: 0.8,
            confidence_interval: [0.6, 0.9],
            p_value: 0.01,
            sample_size: 4,
            is_significant: true,
            strategy: "burst_detection".to_string(),
        };
        assert!((burst.primary_metric() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_burst_confidence_from_p_value() {
        let burst = CoreStats::Burst {
            correlation: 0.8,
            aligned_bursts: 4,
            total_buckets: 10,
            alignment_strength: 0.8,
            confidence_interval: [0.6, 0.9],
            p_value: 0.05,
            sample_size: 4,
            is_significant: true,
            strategy: String::new(),
        };
        assert!((burst.confidence() - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_support_count_per_kind() {
        assert_eq!(pmi_stats().support_count(), 5);

        let change = CoreStats::ChangeAttribution {
            correlation_coefficient: 0.7,
            lag_minutes: 4.0,
            lag_ms: 240_000,
            change_count: 3,
            effect_count: 9,
            confidence: 0.8,
            method: "granger".to_string(),
        };
        assert_eq!(change.support_count(), 3);
    }

    #[test]
    fn test_participant_parses_scope() {
        let p = Participant::new("resource:prod/db-pod");
        assert_eq!(p.scope.cluster, "prod");
        assert_eq!(p.scope.pod.as_deref(), Some("db-pod"));
    }
}
