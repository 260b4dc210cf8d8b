//! Threshold filtering and aggregation over store snapshots.
//!
//! This is the only surface the presentation layer consumes. Filtering is
//! a pure function over (snapshot, filter): conjunctive across all set
//! fields, with an unset field meaning "no constraint". Ordering is
//! `observed_at` descending with id ascending tie-break, for
//! deterministic pagination.

use crate::classify;
use crate::insight::Insight;
use crate::store::Snapshot;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use st_common::{BucketSize, InsightId, InsightKind};
use std::collections::BTreeMap;

/// Filter configuration recognized by `list_insights`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InsightFilter {
    /// Restrict to one kind.
    pub kind: Option<InsightKind>,
    /// Minimum correlation-like metric. Kinds without a correlation field
    /// (PMI) never satisfy this constraint.
    pub min_correlation: Option<f64>,
    /// Minimum support-like sample count.
    pub min_support: Option<u32>,
    /// Minimum aligned burst count (burst kind only).
    pub min_aligned_bursts: Option<u32>,
    /// Minimum PMI score (PMI kind only).
    pub min_pmi_score: Option<f64>,
    /// Keep only statistically significant records.
    pub significant_only: bool,
    /// Restrict to a cluster (exact match on either participant scope).
    pub cluster: Option<String>,
    /// Restrict to a namespace (exact match on either participant scope).
    pub namespace: Option<String>,
    /// Case-insensitive substring over participant identifiers.
    pub text_search: Option<String>,
    /// Bucketing view the caller renders under; echoed into the summary.
    pub bucket_size: Option<BucketSize>,
}

/// Summary counts for one filtered listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummaryCounts {
    /// All matching records, duplicates included (audit view).
    pub total: usize,
    /// Matching records excluding semantic duplicates.
    pub unique: usize,
    /// Matching semantic duplicates.
    pub duplicates: usize,
    /// Matching records per kind.
    pub per_kind: BTreeMap<InsightKind, usize>,
    /// Matching statistically significant records.
    pub significant: usize,
    /// Matching records below the sparse-support threshold. Flagged, not
    /// excluded.
    pub sparse: usize,
    /// Bucketing view this summary was computed under.
    pub bucket_size: BucketSize,
}

/// Aggregate statistics over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AggregateStats {
    pub per_kind_counts: BTreeMap<InsightKind, usize>,
    /// Significant share of unique signals, in [0, 1].
    pub significance_rate: f64,
    /// Unique signals below the sparse-support threshold.
    pub sparse_count: usize,
    /// Parsed records over raw lines consumed, in [0, 1].
    pub processing_efficiency: f64,
    /// Seconds since the newest insight was last seen; `None` for an
    /// empty store.
    pub staleness_secs: Option<i64>,
    /// True while the latest cycle failed at the source level.
    pub degraded: bool,
}

fn matches(snapshot: &Snapshot, insight: &Insight, filter: &InsightFilter) -> bool {
    if let Some(kind) = filter.kind {
        if insight.kind != kind {
            return false;
        }
    }

    if let Some(min) = filter.min_correlation {
        match insight.core.correlation() {
            Some(correlation) if correlation >= min => {}
            _ => return false,
        }
    }

    if let Some(min) = filter.min_support {
        if insight.core.support_count() < min {
            return false;
        }
    }

    if let Some(min) = filter.min_aligned_bursts {
        match &insight.core {
            crate::insight::CoreStats::Burst { aligned_bursts, .. } if *aligned_bursts >= min => {}
            _ => return false,
        }
    }

    if let Some(min) = filter.min_pmi_score {
        match &insight.core {
            crate::insight::CoreStats::Pmi { pmi_score, .. } if *pmi_score >= min => {}
            _ => return false,
        }
    }

    if filter.significant_only && !classify::is_significant(&insight.core, &snapshot.thresholds) {
        return false;
    }

    if let Some(cluster) = &filter.cluster {
        if !insight
            .participants
            .iter()
            .any(|p| &p.scope.cluster == cluster)
        {
            return false;
        }
    }

    if let Some(namespace) = &filter.namespace {
        if !insight
            .participants
            .iter()
            .any(|p| p.scope.namespace.as_deref() == Some(namespace.as_str()))
        {
            return false;
        }
    }

    if let Some(needle) = &filter.text_search {
        let needle = needle.to_lowercase();
        if !insight
            .participants
            .iter()
            .any(|p| p.id.to_lowercase().contains(&needle))
        {
            return false;
        }
    }

    true
}

/// Filtered, ordered listing plus summary counts.
pub fn list_insights(snapshot: &Snapshot, filter: &InsightFilter) -> (Vec<Insight>, SummaryCounts) {
    let mut items: Vec<Insight> = snapshot
        .insights
        .values()
        .filter(|i| matches(snapshot, i, filter))
        .cloned()
        .collect();

    items.sort_by(|a, b| {
        b.observed_at
            .cmp(&a.observed_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let sparse_threshold = snapshot.thresholds.min_points;
    let mut summary = SummaryCounts {
        bucket_size: filter.bucket_size.unwrap_or_default(),
        ..SummaryCounts::default()
    };
    for insight in &items {
        summary.total += 1;
        *summary.per_kind.entry(insight.kind).or_default() += 1;
        if insight.dedup.is_semantic_duplicate {
            summary.duplicates += 1;
        } else {
            summary.unique += 1;
        }
        if classify::is_significant(&insight.core, &snapshot.thresholds) {
            summary.significant += 1;
        }
        if insight.core.support_count() < sparse_threshold {
            summary.sparse += 1;
        }
    }

    (items, summary)
}

/// Look up one insight by id. Duplicates stay retrievable here.
pub fn get_insight(snapshot: &Snapshot, id: &InsightId) -> Option<Insight> {
    snapshot.insights.get(id).cloned()
}

/// Store-wide aggregates for badges and freshness indicators.
///
/// Unique-signal counts exclude semantic duplicates; rate ratios are
/// computed here from store-level counters, not stored per insight.
pub fn aggregate_stats(snapshot: &Snapshot, now: DateTime<Utc>) -> AggregateStats {
    let mut per_kind: BTreeMap<InsightKind, usize> = BTreeMap::new();
    let mut unique = 0usize;
    let mut significant = 0usize;
    let mut sparse = 0usize;

    for insight in snapshot.insights.values() {
        if insight.dedup.is_semantic_duplicate {
            continue;
        }
        unique += 1;
        *per_kind.entry(insight.kind).or_default() += 1;
        if classify::is_significant(&insight.core, &snapshot.thresholds) {
            significant += 1;
        }
        if insight.core.support_count() < snapshot.thresholds.min_points {
            sparse += 1;
        }
    }

    let significance_rate = if unique > 0 {
        significant as f64 / unique as f64
    } else {
        0.0
    };

    let processing_efficiency = if snapshot.counters.raw_lines > 0 {
        snapshot.counters.parsed_records as f64 / snapshot.counters.raw_lines as f64
    } else {
        0.0
    };

    let staleness_secs = snapshot
        .newest_last_seen()
        .map(|seen| (now - seen).num_seconds());

    AggregateStats {
        per_kind_counts: per_kind,
        significance_rate,
        sparse_count: sparse,
        processing_efficiency,
        staleness_secs,
        degraded: snapshot.freshness.degraded(),
    }
}
