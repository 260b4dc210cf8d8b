//! Insight kind and severity taxonomies.
//!
//! These enums are the shared vocabulary between the normalizer, the
//! classifier, and the query surface. Serialized forms are a compatibility
//! contract with presentation-layer consumers and must stay snake_case.

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four normalized correlation kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// Co-spiking burst alignment between two series.
    BurstCorrelation,
    /// Directed lead-lag relationship between two series.
    LeadLag,
    /// Pointwise-mutual-information co-occurrence between two tokens.
    PmiCooccurrence,
    /// Change event attributed to a downstream effect.
    ChangeAttribution,
}

impl InsightKind {
    /// Stable tag used in insight id derivation and wire output.
    pub fn tag(&self) -> &'static str {
        match self {
            InsightKind::BurstCorrelation => "burst_correlation",
            InsightKind::LeadLag => "lead_lag",
            InsightKind::PmiCooccurrence => "pmi_cooccurrence",
            InsightKind::ChangeAttribution => "change_attribution",
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Severity tier assigned by the classifier.
///
/// Ordering is semantic: `Low < Medium < High < Critical`. The classifier
/// guarantees monotonicity in the primary metric for fixed non-negative
/// confidence, and tests rely on this ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Time-bucket width used to align timestamps for id derivation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    ValueEnum,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum BucketSize {
    /// 30-second buckets.
    ThirtySeconds,
    /// 60-second buckets (default).
    #[default]
    SixtySeconds,
}

impl BucketSize {
    /// Bucket width in milliseconds.
    pub fn as_millis(&self) -> i64 {
        match self {
            BucketSize::ThirtySeconds => 30_000,
            BucketSize::SixtySeconds => 60_000,
        }
    }

    /// Floor a millisecond timestamp into a bucket index.
    ///
    /// The index feeds id derivation only; stored timestamps are never
    /// altered by bucketing.
    pub fn bucket_index(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms.div_euclid(self.as_millis())
    }
}

impl fmt::Display for BucketSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketSize::ThirtySeconds => write!(f, "30s"),
            BucketSize::SixtySeconds => write!(f, "60s"),
        }
    }
}
