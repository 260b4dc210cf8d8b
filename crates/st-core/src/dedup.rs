//! Semantic deduplication.
//!
//! Collapses signals that describe the same real-world entity under
//! different naming conventions. Runs inside the store commit, over the
//! whole insight map, so canonical links always point at insights that
//! exist in the same snapshot.
//!
//! Two sources of equivalence:
//! - PMI records arrive with precomputed hints (`_deduplication`); the
//!   hinted insight is matched to a canonical partner by its
//!   prefix-stripped token pair.
//! - Burst and lead-lag insights are equivalent when their parsed scopes
//!   (cluster+pod, both participants) match across differently-prefixed
//!   raw identifiers (`resource:` vs `monitor:` forms).
//!
//! Canonical choice: earliest `first_seen_at`, ties broken by
//! lexicographically smaller id. Deduplication annotates; it never
//! deletes.

use crate::insight::Insight;
use chrono::{DateTime, Utc};
use st_common::{InsightId, InsightKind};
use std::collections::BTreeMap;

/// Token identifier with its naming-convention prefix stripped.
fn normalized_token(token: &str) -> &str {
    token.split_once(':').map(|(_, rest)| rest).unwrap_or(token)
}

/// Order-insensitive pair key.
fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Canonical ordering: earlier first_seen_at wins, then smaller id.
fn canonical_rank(insight: &Insight) -> (DateTime<Utc>, InsightId) {
    (insight.first_seen_at, insight.id.clone())
}

/// Annotate semantic duplicates across the whole map.
///
/// Re-entrant: each pass recomputes scope-based marks and canonical links
/// from scratch, so annotations stay consistent as insights arrive.
/// Hint-sourced marks (and their notes) on PMI insights are sticky.
pub fn annotate(map: &mut BTreeMap<InsightId, Insight>) {
    // Reset recomputable state.
    for insight in map.values_mut() {
        match insight.kind {
            InsightKind::PmiCooccurrence => {
                insight.dedup.canonical_id = None;
            }
            _ => {
                insight.dedup = Default::default();
            }
        }
    }

    annotate_scope_pairs(map);
    link_hinted_pmi(map);
}

/// Scope-based equivalence for burst and lead-lag kinds.
fn annotate_scope_pairs(map: &mut BTreeMap<InsightId, Insight>) {
    // (kind, scope pair) -> member ids, for fully-resolved participants.
    let mut groups: BTreeMap<(InsightKind, (String, String)), Vec<InsightId>> = BTreeMap::new();

    for insight in map.values() {
        if !matches!(
            insight.kind,
            InsightKind::BurstCorrelation | InsightKind::LeadLag
        ) {
            continue;
        }
        let [a, b] = &insight.participants;
        if !a.scope.is_resolved() || !b.scope.is_resolved() {
            continue;
        }
        let scope_a = format!("{}/{}", a.scope.cluster, a.scope.pod.as_deref().unwrap_or(""));
        let scope_b = format!("{}/{}", b.scope.cluster, b.scope.pod.as_deref().unwrap_or(""));
        groups
            .entry((insight.kind, pair_key(&scope_a, &scope_b)))
            .or_default()
            .push(insight.id.clone());
    }

    for ids in groups.into_values() {
        if ids.len() < 2 {
            continue;
        }

        let mut members: Vec<&Insight> = ids.iter().map(|id| &map[id]).collect();
        members.sort_by_key(|i| canonical_rank(i));

        let canonical_id = members[0].id.clone();
        let canonical_pair = pair_key(&members[0].participants[0].id, &members[0].participants[1].id);

        let mut marks: Vec<InsightId> = Vec::new();
        for member in &members[1..] {
            // The same raw identifiers in a later bucket are a recurrence
            // of the signal, not a renaming of it.
            let member_pair = pair_key(&member.participants[0].id, &member.participants[1].id);
            if member_pair != canonical_pair {
                marks.push(member.id.clone());
            }
        }

        for id in marks {
            let insight = map.get_mut(&id).expect("member id exists");
            insight.dedup.is_semantic_duplicate = true;
            insight.dedup.canonical_id = Some(canonical_id.clone());
        }
    }
}

/// Resolve canonical partners for hint-marked PMI insights.
fn link_hinted_pmi(map: &mut BTreeMap<InsightId, Insight>) {
    // Normalized token pair -> unhinted PMI candidates.
    let mut candidates: BTreeMap<(String, String), Vec<InsightId>> = BTreeMap::new();
    let mut hinted: Vec<(InsightId, (String, String))> = Vec::new();

    for insight in map.values() {
        if insight.kind != InsightKind::PmiCooccurrence {
            continue;
        }
        let key = pair_key(
            normalized_token(&insight.participants[0].id),
            normalized_token(&insight.participants[1].id),
        );
        if insight.dedup.is_semantic_duplicate {
            hinted.push((insight.id.clone(), key));
        } else {
            candidates.entry(key).or_default().push(insight.id.clone());
        }
    }

    for (id, key) in hinted {
        let canonical = candidates.get(&key).and_then(|ids| {
            ids.iter()
                .map(|cid| &map[cid])
                .min_by_key(|i| canonical_rank(i))
                .map(|i| i.id.clone())
        });
        if let Some(canonical_id) = canonical {
            let insight = map.get_mut(&id).expect("hinted id exists");
            insight.dedup.canonical_id = Some(canonical_id);
        }
    }
}
