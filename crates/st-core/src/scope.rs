//! Compound identifier parsing into structured scope.
//!
//! Upstream series and token identifiers arrive as compound strings in
//! several naming conventions (`resource:prod/db-pod`,
//! `monitor:15003|prod,db-pod,production`, `kube_namespace:production`,
//! bare tokens). This module extracts cluster/namespace/pod scope from
//! them on a best-effort basis.
//!
//! Parsing is total: unparseable input yields a scope with
//! `source_kind = Other` and empty fields, never an error. A failed parse
//! must not abort ingestion of the batch the identifier arrived in.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier family a scope was extracted from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// `resource:<cluster>/<pod>` identifiers.
    Resource,
    /// `monitor:<id>|<cluster>,<pod>,<namespace>` identifiers.
    Monitor,
    /// `metric:` prefixed series names.
    Metric,
    /// `evt_name:` prefixed event identifiers.
    Event,
    /// Everything else, including unparseable input.
    #[default]
    Other,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Resource => write!(f, "resource"),
            SourceKind::Monitor => write!(f, "monitor"),
            SourceKind::Metric => write!(f, "metric"),
            SourceKind::Event => write!(f, "event"),
            SourceKind::Other => write!(f, "other"),
        }
    }
}

/// Parsed cluster/namespace/pod context for one participant.
///
/// An empty `cluster` means scope extraction did not succeed for that
/// identifier; such scopes never take part in scope-based deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScopeRef {
    pub cluster: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod: Option<String>,
    pub source_kind: SourceKind,
}

impl ScopeRef {
    /// True when the identifier resolved to a concrete cluster+pod pair.
    pub fn is_resolved(&self) -> bool {
        !self.cluster.is_empty() && self.pod.is_some()
    }
}

/// Parse a compound identifier string into a `ScopeRef`.
///
/// Never fails; unrecognized input maps to the default (Other) scope.
pub fn parse_scope(raw: &str) -> ScopeRef {
    if let Some(rest) = raw.strip_prefix("resource:") {
        return parse_resource(rest);
    }
    if let Some(rest) = raw.strip_prefix("monitor:") {
        return parse_monitor(rest);
    }
    if raw.strip_prefix("metric:").is_some() {
        return ScopeRef {
            source_kind: SourceKind::Metric,
            ..ScopeRef::default()
        };
    }
    if raw.strip_prefix("evt_name:").is_some() {
        return ScopeRef {
            source_kind: SourceKind::Event,
            ..ScopeRef::default()
        };
    }

    // Token-style prefixes seen in PMI identifiers. Only the prefixes that
    // name a scope field capture a value; the rest classify as Other.
    if let Some(value) = nonempty_suffix(raw, &["kube_namespace:", "actual_namespace:", "namespace:"]) {
        return ScopeRef {
            namespace: Some(value.to_string()),
            ..ScopeRef::default()
        };
    }
    if let Some(value) = nonempty_suffix(raw, &["pod_name:", "pod:"]) {
        return ScopeRef {
            pod: Some(value.to_string()),
            ..ScopeRef::default()
        };
    }
    if let Some(value) = nonempty_suffix(raw, &["cluster:"]) {
        return ScopeRef {
            cluster: value.to_string(),
            ..ScopeRef::default()
        };
    }

    ScopeRef::default()
}

/// `<cluster>/<pod>`; the pod segment may itself contain `/` and is kept
/// as an opaque path.
fn parse_resource(rest: &str) -> ScopeRef {
    if rest.is_empty() {
        return ScopeRef::default();
    }
    match rest.split_once('/') {
        Some((cluster, pod)) if !cluster.is_empty() => ScopeRef {
            cluster: cluster.to_string(),
            namespace: None,
            pod: (!pod.is_empty()).then(|| pod.to_string()),
            source_kind: SourceKind::Resource,
        },
        Some(_) => ScopeRef::default(),
        None => ScopeRef {
            cluster: rest.to_string(),
            namespace: None,
            pod: None,
            source_kind: SourceKind::Resource,
        },
    }
}

/// `<id>|<cluster>,<pod>,<namespace>`; fewer than three comma-separated
/// fields leaves the missing ones empty rather than erroring.
fn parse_monitor(rest: &str) -> ScopeRef {
    let Some((_id, fields)) = rest.split_once('|') else {
        return ScopeRef {
            source_kind: SourceKind::Monitor,
            ..ScopeRef::default()
        };
    };

    let mut parts = fields.split(',');
    let cluster = parts.next().unwrap_or("").trim().to_string();
    let pod = parts.next().map(str::trim).filter(|s| !s.is_empty());
    let namespace = parts.next().map(str::trim).filter(|s| !s.is_empty());

    ScopeRef {
        cluster,
        namespace: namespace.map(str::to_string),
        pod: pod.map(str::to_string),
        source_kind: SourceKind::Monitor,
    }
}

fn nonempty_suffix<'a>(raw: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    for prefix in prefixes {
        if let Some(rest) = raw.strip_prefix(prefix) {
            if !rest.is_empty() {
                return Some(rest);
            }
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_round_trip() {
        let scope = parse_scope("resource:prod-cluster/database-main-pod");
        assert_eq!(scope.cluster, "prod-cluster");
        assert_eq!(scope.pod.as_deref(), Some("database-main-pod"));
        assert_eq!(scope.namespace, None);
        assert_eq!(scope.source_kind, SourceKind::Resource);
    }

    #[test]
    fn test_resource_pod_with_slashes() {
        let scope = parse_scope("resource:prod/workload/db/replica-0");
        assert_eq!(scope.cluster, "prod");
        assert_eq!(scope.pod.as_deref(), Some("workload/db/replica-0"));
    }

    #[test]
    fn test_resource_cluster_only() {
        let scope = parse_scope("resource:prod-cluster");
        assert_eq!(scope.cluster, "prod-cluster");
        assert_eq!(scope.pod, None);
        assert_eq!(scope.source_kind, SourceKind::Resource);
    }

    #[test]
    fn test_monitor_round_trip() {
        let scope = parse_scope("monitor:15003|prod-cluster,database-main-pod,production");
        assert_eq!(scope.cluster, "prod-cluster");
        assert_eq!(scope.pod.as_deref(), Some("database-main-pod"));
        assert_eq!(scope.namespace.as_deref(), Some("production"));
        assert_eq!(scope.source_kind, SourceKind::Monitor);
    }

    #[test]
    fn test_monitor_missing_fields() {
        let scope = parse_scope("monitor:15003|prod-cluster,db-pod");
        assert_eq!(scope.cluster, "prod-cluster");
        assert_eq!(scope.pod.as_deref(), Some("db-pod"));
        assert_eq!(scope.namespace, None);

        let scope = parse_scope("monitor:15003|prod-cluster");
        assert_eq!(scope.cluster, "prod-cluster");
        assert_eq!(scope.pod, None);
    }

    #[test]
    fn test_monitor_without_separator() {
        let scope = parse_scope("monitor:15003");
        assert_eq!(scope.source_kind, SourceKind::Monitor);
        assert!(scope.cluster.is_empty());
    }

    #[test]
    fn test_metric_and_event_prefixes() {
        assert_eq!(parse_scope("metric:cpu.usage").source_kind, SourceKind::Metric);
        assert_eq!(parse_scope("evt_name:oom_killed").source_kind, SourceKind::Event);
    }

    #[test]
    fn test_namespace_tokens() {
        let scope = parse_scope("kube_namespace:production");
        assert_eq!(scope.namespace.as_deref(), Some("production"));
        assert_eq!(scope.source_kind, SourceKind::Other);

        let scope = parse_scope("actual_namespace:production");
        assert_eq!(scope.namespace.as_deref(), Some("production"));
    }

    #[test]
    fn test_pod_tokens() {
        let scope = parse_scope("pod_name:api-7f9c");
        assert_eq!(scope.pod.as_deref(), Some("api-7f9c"));
        assert_eq!(scope.source_kind, SourceKind::Other);
    }

    #[test]
    fn test_unparseable_is_other() {
        let scope = parse_scope("some opaque token");
        assert_eq!(scope, ScopeRef::default());
        assert_eq!(scope.source_kind, SourceKind::Other);
        assert!(scope.cluster.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_scope(""), ScopeRef::default());
        assert_eq!(parse_scope("resource:"), ScopeRef::default());
    }

    #[test]
    fn test_is_resolved() {
        assert!(parse_scope("resource:prod/db").is_resolved());
        assert!(!parse_scope("resource:prod").is_resolved());
        assert!(!parse_scope("metric:cpu").is_resolved());
    }
}
