//! Raw record to Insight normalization.
//!
//! Maps each record variant into the unified Insight shape: participants
//! with parsed scope, kind-specific core stats preserved verbatim, and
//! derived metrics. The time bucket feeds id derivation only; stored
//! timestamps are never altered.
//!
//! Severity is assigned later (at store commit) so that normalization
//! stays independent of the active threshold configuration.

use crate::derive;
use crate::insight::{CoreStats, DedupState, DerivedMetrics, Insight, Participant};
use crate::record::RawRecord;
use chrono::{DateTime, Utc};
use st_common::{BucketSize, InsightId, Severity};

/// Directions that put series2 in the leader position.
fn series2_leads(direction: &str) -> bool {
    matches!(direction, "series2_leads" | "backward")
}

/// Normalize one raw record into an Insight.
///
/// `now` becomes both lifecycle timestamps; the store reconciles them
/// against any prior sighting of the same id at commit.
pub fn normalize(record: &RawRecord, bucket: BucketSize, now: DateTime<Utc>) -> Insight {
    let bucket_index = bucket.bucket_index(record.timestamp());

    match record {
        RawRecord::Burst(r) => {
            let id = InsightId::derive(record.kind(), &r.series1, &r.series2, bucket_index);
            Insight {
                id,
                kind: record.kind(),
                participants: [Participant::new(&r.series1), Participant::new(&r.series2)],
                core: CoreStats::Burst {
                    correlation: r.correlation,
                    aligned_bursts: r.aligned_bursts,
                    total_buckets: r.total_buckets,
                    alignment_strength: r.alignment_strength,
                    confidence_interval: r.confidence_interval,
                    p_value: r.p_value,
                    sample_size: r.sample_size,
                    is_significant: r.is_significant,
                    strategy: r.strategy.clone(),
                },
                derived: DerivedMetrics::default(),
                severity: Severity::Low,
                dedup: DedupState::default(),
                observed_at: r.timestamp,
                first_seen_at: now,
                last_seen_at: now,
            }
        }

        RawRecord::LeadLag(r) => {
            // Leader goes first; a recognized "series2 leads" direction
            // swaps the pair. The raw lag and direction stay verbatim in
            // the core stats.
            let (leader, follower) = if series2_leads(&r.direction) {
                (&r.series2, &r.series1)
            } else {
                (&r.series1, &r.series2)
            };
            // With an explicit direction the leader occupies slot 0; an
            // unlabeled record falls back to the lag sign.
            let first_leads = !r.direction.is_empty() || r.lag_seconds >= 0.0;
            let id = InsightId::derive(record.kind(), leader, follower, bucket_index);
            Insight {
                id,
                kind: record.kind(),
                participants: [Participant::new(leader), Participant::new(follower)],
                core: CoreStats::LeadLag {
                    lag_seconds: r.lag_seconds,
                    lag_buckets: r.lag_buckets,
                    correlation: r.correlation,
                    granger_score: r.granger_score,
                    precedence_score: r.precedence_score,
                    confidence: r.confidence,
                    sample_size: r.sample_size,
                    direction: r.direction.clone(),
                },
                derived: DerivedMetrics {
                    lift: None,
                    lag_display: Some(derive::format_lag(r.lag_seconds, first_leads)),
                    duration_hours: None,
                },
                severity: Severity::Low,
                dedup: DedupState::default(),
                observed_at: r.timestamp,
                first_seen_at: now,
                last_seen_at: now,
            }
        }

        RawRecord::Pmi(r) => {
            let id = InsightId::derive(record.kind(), &r.token_a, &r.token_b, bucket_index);
            let lift = derive::lift(r.p_a, r.p_b, r.p_ab);
            let dedup = match &r.deduplication {
                Some(hint) if hint.semantic => DedupState {
                    is_semantic_duplicate: true,
                    canonical_id: None,
                    note: hint.note.clone(),
                },
                _ => DedupState::default(),
            };
            Insight {
                id,
                kind: record.kind(),
                participants: [Participant::new(&r.token_a), Participant::new(&r.token_b)],
                core: CoreStats::Pmi {
                    pmi_score: r.pmi_score,
                    support: r.support,
                    count_a: r.count_a,
                    count_b: r.count_b,
                    total_buckets: r.total_buckets,
                    confidence: r.confidence,
                    p_a: r.p_a,
                    p_b: r.p_b,
                    p_ab: r.p_ab,
                    type_a: r.type_a.clone(),
                    type_b: r.type_b.clone(),
                },
                derived: DerivedMetrics {
                    lift: (!lift.is_nan()).then_some(lift),
                    lag_display: None,
                    duration_hours: None,
                },
                severity: Severity::Low,
                dedup,
                observed_at: r.timestamp,
                first_seen_at: now,
                last_seen_at: now,
            }
        }

        RawRecord::ChangeAttribution(r) => {
            let id = InsightId::derive(record.kind(), &r.source, &r.target, bucket_index);
            Insight {
                id,
                kind: record.kind(),
                participants: [Participant::new(&r.source), Participant::new(&r.target)],
                core: CoreStats::ChangeAttribution {
                    correlation_coefficient: r.correlation_coefficient,
                    lag_minutes: r.lag_minutes,
                    lag_ms: r.lag_ms,
                    change_count: r.change_count,
                    effect_count: r.effect_count,
                    confidence: r.confidence,
                    method: r.method.clone(),
                },
                derived: DerivedMetrics {
                    lift: None,
                    lag_display: Some(derive::format_lag(r.lag_ms as f64 / 1000.0, true)),
                    duration_hours: Some(derive::duration_hours(r.lag_ms)),
                },
                severity: Severity::Low,
                dedup: DedupState::default(),
                observed_at: r.timestamp,
                first_seen_at: now,
                last_seen_at: now,
            }
        }
    }
}
