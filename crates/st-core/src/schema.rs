//! JSON Schema generation for presentation-facing output types.
//!
//! The query surface speaks JSON to an external presentation layer; these
//! schemas let that layer validate payloads and generate bindings.
//!
//! # Usage
//!
//! ```bash
//! # List available schema types
//! st-core schema --list
//!
//! # Generate schema for a specific type
//! st-core schema Insight
//! st-core schema AggregateStats
//! ```

use schemars::schema_for;
use serde_json::Value;

pub use crate::insight::{CoreStats, DedupState, DerivedMetrics, Insight, Participant};
pub use crate::poller::CycleOutcome;
pub use crate::query::{AggregateStats, InsightFilter, SummaryCounts};
pub use crate::scope::{ScopeRef, SourceKind};

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Insight", "Normalized, classified correlation signal"),
        ("Participant", "Correlation participant with parsed scope"),
        ("ScopeRef", "Cluster/namespace/pod scope reference"),
        ("CoreStats", "Kind-specific statistics payload"),
        ("DerivedMetrics", "Computed fields (lift, lag display)"),
        ("DedupState", "Semantic deduplication annotation"),
        ("InsightFilter", "Query filter configuration"),
        ("SummaryCounts", "Per-listing summary counts"),
        ("AggregateStats", "Store-wide aggregate statistics"),
        ("CycleOutcome", "Ingestion cycle audit record"),
        ("ThresholdConfig", "Adaptive classification thresholds"),
        ("PipelineConfig", "Top-level pipeline configuration"),
    ]
}

/// Generate the JSON Schema for a named type.
pub fn schema_json(name: &str) -> Option<Value> {
    let schema = match name {
        "Insight" => schema_for!(Insight),
        "Participant" => schema_for!(Participant),
        "ScopeRef" => schema_for!(ScopeRef),
        "CoreStats" => schema_for!(CoreStats),
        "DerivedMetrics" => schema_for!(DerivedMetrics),
        "DedupState" => schema_for!(DedupState),
        "InsightFilter" => schema_for!(InsightFilter),
        "SummaryCounts" => schema_for!(SummaryCounts),
        "AggregateStats" => schema_for!(AggregateStats),
        "CycleOutcome" => schema_for!(CycleOutcome),
        "ThresholdConfig" => schema_for!(st_config::ThresholdConfig),
        "PipelineConfig" => schema_for!(st_config::PipelineConfig),
        _ => return None,
    };
    serde_json::to_value(schema).ok()
}
