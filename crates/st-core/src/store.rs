//! Insight store with snapshot isolation.
//!
//! The store holds the current normalized, classified insight set plus
//! ingest counters and freshness state. Each ingestion cycle commits as a
//! single atomic swap of an immutable snapshot: readers clone the `Arc`
//! and observe either the pre- or post-cycle state, never a
//! partially-updated insight. An abandoned cycle simply never swaps, so
//! shutdown cannot leave the store inconsistent.
//!
//! Threshold updates are validated before they take effect; a rejected
//! update leaves the last valid configuration (and every severity derived
//! from it) in place.

use crate::classify::{self, SeverityContext};
use crate::dedup;
use crate::insight::Insight;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use st_common::{CycleId, Error, InsightId, Result};
use st_config::ThresholdConfig;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Running ingest counters, cumulative across cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IngestCounters {
    /// Raw lines consumed from the source.
    pub raw_lines: u64,
    /// Lines that parsed into a known record type.
    pub parsed_records: u64,
    /// Lines skipped for any reason.
    pub rejected_lines: u64,
    /// Malformed (non-JSON / non-object) lines.
    pub parse_errors: u64,
    /// Records with an unrecognized `type`.
    pub unknown_type: u64,
    /// Records missing the `type` discriminant.
    pub missing_field: u64,
}

impl IngestCounters {
    /// Accumulate a per-cycle delta.
    pub fn merge(&mut self, delta: &IngestCounters) {
        self.raw_lines += delta.raw_lines;
        self.parsed_records += delta.parsed_records;
        self.rejected_lines += delta.rejected_lines;
        self.parse_errors += delta.parse_errors;
        self.unknown_type += delta.unknown_type;
        self.missing_field += delta.missing_field;
    }

    /// Record one ingest error in the per-cycle tallies.
    pub fn count_error(&mut self, error: &Error) {
        self.rejected_lines += 1;
        match error {
            Error::ParseError(_) => self.parse_errors += 1,
            Error::UnknownRecordType { .. } => self.unknown_type += 1,
            Error::MissingRequiredField { .. } => self.missing_field += 1,
            _ => {}
        }
    }
}

/// Source freshness as observed by the poller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Freshness {
    pub last_cycle_id: Option<CycleId>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Last cycle-level failure, cleared by the next successful cycle.
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl Freshness {
    /// True while the most recent cycle failed at the source level.
    pub fn degraded(&self) -> bool {
        self.last_error.is_some()
    }
}

/// Immutable view of the store at one commit point.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub insights: BTreeMap<InsightId, Insight>,
    pub counters: IngestCounters,
    pub freshness: Freshness,
    pub thresholds: ThresholdConfig,
    pub context: SeverityContext,
}

impl Snapshot {
    /// Most recent `last_seen_at` across the set, for staleness reporting.
    pub fn newest_last_seen(&self) -> Option<DateTime<Utc>> {
        self.insights.values().map(|i| i.last_seen_at).max()
    }
}

/// Outcome counts for one committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CommitStats {
    pub inserted: usize,
    pub updated: usize,
}

/// Snapshot-isolated insight store.
///
/// All mutation goes through clone-modify-swap under the single mutex;
/// `snapshot()` hands out the current `Arc` and is safe to call
/// concurrently with an in-progress cycle.
#[derive(Debug)]
pub struct InsightStore {
    current: Mutex<Arc<Snapshot>>,
}

impl InsightStore {
    pub fn new(thresholds: ThresholdConfig, context: SeverityContext) -> Self {
        InsightStore {
            current: Mutex::new(Arc::new(Snapshot {
                thresholds,
                context,
                ..Snapshot::default()
            })),
        }
    }

    /// Current snapshot. Readers hold it as long as they like; later
    /// commits never mutate it.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.lock().unwrap().clone()
    }

    /// Commit one ingestion cycle.
    ///
    /// Merges the batch (re-ingestion of a known id updates the record in
    /// place, preserving `first_seen_at`), classifies the touched
    /// insights, re-annotates duplicates, folds in the counter delta, and
    /// swaps the snapshot.
    pub fn commit_cycle(
        &self,
        batch: Vec<Insight>,
        delta: &IngestCounters,
        cycle_id: CycleId,
        now: DateTime<Utc>,
    ) -> CommitStats {
        let mut guard = self.current.lock().unwrap();
        let mut next = (**guard).clone();
        let mut stats = CommitStats::default();

        for mut incoming in batch {
            incoming.severity =
                classify::classify(&incoming.core, &next.thresholds, &next.context);
            match next.insights.get_mut(&incoming.id) {
                Some(existing) => {
                    incoming.first_seen_at = existing.first_seen_at;
                    incoming.last_seen_at = now;
                    *existing = incoming;
                    stats.updated += 1;
                }
                None => {
                    incoming.last_seen_at = now;
                    next.insights.insert(incoming.id.clone(), incoming);
                    stats.inserted += 1;
                }
            }
        }

        dedup::annotate(&mut next.insights);

        next.counters.merge(delta);
        next.freshness = Freshness {
            last_cycle_id: Some(cycle_id),
            last_cycle_at: Some(now),
            last_error: None,
            consecutive_failures: 0,
        };

        *guard = Arc::new(next);
        stats
    }

    /// Record a cycle-level failure (source unavailable) as degraded
    /// freshness. The insight set is untouched.
    pub fn record_cycle_failure(&self, error: &Error, now: DateTime<Utc>) {
        let mut guard = self.current.lock().unwrap();
        let mut next = (**guard).clone();
        next.freshness.last_error = Some(error.to_string());
        next.freshness.last_cycle_at = Some(now);
        next.freshness.consecutive_failures += 1;
        *guard = Arc::new(next);
    }

    /// Apply a threshold change.
    ///
    /// Invalid configurations are rejected with `ThresholdConfigInvalid`
    /// and the last valid configuration stays in effect. A valid change
    /// reclassifies every insight in one swap.
    pub fn update_thresholds(&self, thresholds: ThresholdConfig) -> Result<()> {
        st_config::validate_thresholds(&thresholds)
            .map_err(|e| Error::ThresholdConfigInvalid(e.to_string()))?;

        let mut guard = self.current.lock().unwrap();
        let mut next = (**guard).clone();
        next.thresholds = thresholds;
        for insight in next.insights.values_mut() {
            insight.severity = classify::classify(&insight.core, &next.thresholds, &next.context);
        }
        *guard = Arc::new(next);
        Ok(())
    }

    /// Replace the severity context and reclassify.
    pub fn update_context(&self, context: SeverityContext) {
        let mut guard = self.current.lock().unwrap();
        let mut next = (**guard).clone();
        next.context = context;
        for insight in next.insights.values_mut() {
            insight.severity = classify::classify(&insight.core, &next.thresholds, &next.context);
        }
        *guard = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::record::parse_line;
    use st_common::{BucketSize, Severity};

    fn store() -> InsightStore {
        InsightStore::new(ThresholdConfig::default(), SeverityContext::default())
    }

    fn burst_insight(correlation: f64) -> Insight {
        let line = format!(
            r#"{{"type":"burst","series1":"resource:prod/db","series2":"resource:prod/api","correlation":{correlation},"aligned_bursts":5,"sample_size":5,"is_significant":true,"timestamp":1700000000000}}"#
        );
        let record = parse_line(&line).unwrap();
        normalize(&record, BucketSize::SixtySeconds, Utc::now())
    }

    #[test]
    fn test_reingestion_is_idempotent() {
        let store = store();
        let insight = burst_insight(0.5);
        let id = insight.id.clone();

        let stats = store.commit_cycle(
            vec![insight.clone()],
            &IngestCounters::default(),
            CycleId::new(),
            Utc::now(),
        );
        assert_eq!(stats.inserted, 1);

        let first_seen = store.snapshot().insights[&id].first_seen_at;

        let later = Utc::now() + chrono::Duration::seconds(30);
        let stats = store.commit_cycle(
            vec![insight],
            &IngestCounters::default(),
            CycleId::new(),
            later,
        );
        assert_eq!(stats.inserted, 0);
        assert_eq!(stats.updated, 1);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.insights.len(), 1);
        let stored = &snapshot.insights[&id];
        assert_eq!(stored.first_seen_at, first_seen);
        assert_eq!(stored.last_seen_at, later);
    }

    #[test]
    fn test_snapshot_isolation() {
        let store = store();
        let before = store.snapshot();

        store.commit_cycle(
            vec![burst_insight(0.5)],
            &IngestCounters::default(),
            CycleId::new(),
            Utc::now(),
        );

        // The pre-commit snapshot is untouched by the swap.
        assert!(before.insights.is_empty());
        assert_eq!(store.snapshot().insights.len(), 1);
    }

    #[test]
    fn test_commit_classifies() {
        let store = store();
        store.commit_cycle(
            vec![burst_insight(0.9)],
            &IngestCounters::default(),
            CycleId::new(),
            Utc::now(),
        );
        let snapshot = store.snapshot();
        let insight = snapshot.insights.values().next().unwrap();
        assert_eq!(insight.severity, Severity::Critical);
    }

    #[test]
    fn test_invalid_thresholds_rejected_last_valid_wins() {
        let store = store();
        store.commit_cycle(
            vec![burst_insight(0.7)],
            &IngestCounters::default(),
            CycleId::new(),
            Utc::now(),
        );
        let before = store.snapshot();

        let mut bad = ThresholdConfig::default();
        bad.min_points = 0;
        let err = store.update_thresholds(bad).unwrap_err();
        assert!(matches!(err, Error::ThresholdConfigInvalid(_)));

        let after = store.snapshot();
        assert_eq!(after.thresholds, before.thresholds);
        assert_eq!(
            after.insights.values().next().unwrap().severity,
            before.insights.values().next().unwrap().severity
        );
    }

    #[test]
    fn test_threshold_update_reclassifies() {
        let store = store();
        store.commit_cycle(
            vec![burst_insight(0.5)],
            &IngestCounters::default(),
            CycleId::new(),
            Utc::now(),
        );
        // Significant, below high cut: medium.
        assert_eq!(
            store.snapshot().insights.values().next().unwrap().severity,
            Severity::Medium
        );

        let mut context = SeverityContext::default();
        context.recommended_thresholds.high = 0.4;
        store.update_context(context);

        assert_eq!(
            store.snapshot().insights.values().next().unwrap().severity,
            Severity::High
        );
    }

    #[test]
    fn test_cycle_failure_degrades_freshness() {
        let store = store();
        assert!(!store.snapshot().freshness.degraded());

        store.record_cycle_failure(
            &Error::SourceUnavailable("no such file".into()),
            Utc::now(),
        );
        let snapshot = store.snapshot();
        assert!(snapshot.freshness.degraded());
        assert_eq!(snapshot.freshness.consecutive_failures, 1);

        // A successful cycle clears the degraded state.
        store.commit_cycle(
            vec![],
            &IngestCounters::default(),
            CycleId::new(),
            Utc::now(),
        );
        assert!(!store.snapshot().freshness.degraded());
    }

    #[test]
    fn test_counters_accumulate() {
        let store = store();
        let mut delta = IngestCounters::default();
        delta.raw_lines = 5;
        delta.parsed_records = 4;
        delta.count_error(&Error::ParseError("bad".into()));

        store.commit_cycle(vec![], &delta, CycleId::new(), Utc::now());
        store.commit_cycle(vec![], &delta, CycleId::new(), Utc::now());

        let counters = store.snapshot().counters;
        assert_eq!(counters.raw_lines, 10);
        assert_eq!(counters.parsed_records, 8);
        assert_eq!(counters.parse_errors, 2);
        assert_eq!(counters.rejected_lines, 2);
    }
}
