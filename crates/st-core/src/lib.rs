//! Signal Triage Core Library
//!
//! This library provides the insight normalization and classification
//! pipeline:
//! - Compound identifier parsing into structured scope
//! - Raw record normalization into the unified Insight model
//! - Derived metric computation (lift, lag formatting, durations)
//! - Threshold-driven severity classification
//! - Semantic deduplication
//! - A snapshot-isolated insight store with a filtered query surface
//! - Append-only source polling
//!
//! The binary entry point is in `main.rs`.

pub mod classify;
pub mod dedup;
pub mod derive;
pub mod insight;
pub mod logging;
pub mod normalize;
pub mod poller;
pub mod query;
pub mod record;
pub mod schema;
pub mod scope;
pub mod store;

pub use classify::{classify, SeverityContext};
pub use insight::{CoreStats, Insight, Participant};
pub use normalize::normalize;
pub use poller::{run_cycle, CycleOutcome, Poller, SourceReader};
pub use query::{aggregate_stats, get_insight, list_insights, AggregateStats, InsightFilter};
pub use record::{parse_line, RawRecord};
pub use scope::{parse_scope, ScopeRef, SourceKind};
pub use store::{InsightStore, Snapshot};
