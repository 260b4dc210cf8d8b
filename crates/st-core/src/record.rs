//! Raw record model for the upstream NDJSON stream.
//!
//! Each line of the source is one record, discriminated by a `type` field.
//! Field names below are a compatibility contract with the upstream
//! analysis engine and must not be renamed.
//!
//! Failure policy: a line that is not valid JSON is a `ParseError`; a
//! record without a `type` is `MissingRequiredField`; an unrecognized
//! `type` is `UnknownRecordType`. Every other absent field defaults to the
//! type's identity element (0 for counts, empty string for text) so that a
//! sparse record still normalizes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use st_common::{Error, InsightKind, Result};

/// A burst co-spike record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BurstRecord {
    pub series1: String,
    pub series2: String,
    pub correlation: f64,
    pub aligned_bursts: u32,
    pub total_buckets: u32,
    pub alignment_strength: f64,
    pub confidence_interval: [f64; 2],
    pub p_value: f64,
    pub sample_size: u32,
    pub is_significant: bool,
    pub strategy: String,
    #[serde(alias = "observedAt")]
    pub timestamp: i64,
}

/// A directed lead-lag record.
///
/// `confidence` is observed outside [0, 1] in source data (e.g. -0.161)
/// and is preserved verbatim; the classifier depends on the sign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LeadLagRecord {
    pub series1: String,
    pub series2: String,
    pub lag_seconds: f64,
    pub lag_buckets: i64,
    pub correlation: f64,
    pub granger_score: f64,
    pub precedence_score: f64,
    pub confidence: f64,
    pub sample_size: u32,
    pub direction: String,
    #[serde(alias = "observedAt")]
    pub timestamp: i64,
}

/// Precomputed semantic-deduplication hint carried on PMI records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DedupHint {
    pub semantic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A pointwise-mutual-information co-occurrence record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PmiRecord {
    pub token_a: String,
    pub token_b: String,
    #[serde(alias = "token_a_type")]
    pub type_a: String,
    #[serde(alias = "token_b_type")]
    pub type_b: String,
    pub pmi_score: f64,
    pub support: u32,
    pub count_a: u32,
    pub count_b: u32,
    pub total_buckets: u32,
    pub confidence: f64,
    pub p_a: f64,
    pub p_b: f64,
    pub p_ab: f64,
    #[serde(rename = "_deduplication", skip_serializing_if = "Option::is_none")]
    pub deduplication: Option<DedupHint>,
    #[serde(alias = "observedAt")]
    pub timestamp: i64,
}

/// A change-attribution record linking a change event to an effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChangeAttributionRecord {
    pub source: String,
    pub target: String,
    pub correlation_coefficient: f64,
    pub lag_minutes: f64,
    pub lag_ms: i64,
    pub change_count: u32,
    pub effect_count: u32,
    pub confidence: f64,
    pub method: String,
    #[serde(alias = "observedAt")]
    pub timestamp: i64,
}

/// One raw record from the upstream stream, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawRecord {
    Burst(BurstRecord),
    LeadLag(LeadLagRecord),
    Pmi(PmiRecord),
    ChangeAttribution(ChangeAttributionRecord),
}

impl RawRecord {
    /// The normalized kind this record maps to.
    pub fn kind(&self) -> InsightKind {
        match self {
            RawRecord::Burst(_) => InsightKind::BurstCorrelation,
            RawRecord::LeadLag(_) => InsightKind::LeadLag,
            RawRecord::Pmi(_) => InsightKind::PmiCooccurrence,
            RawRecord::ChangeAttribution(_) => InsightKind::ChangeAttribution,
        }
    }

    /// Record-level observation timestamp (epoch milliseconds).
    pub fn timestamp(&self) -> i64 {
        match self {
            RawRecord::Burst(r) => r.timestamp,
            RawRecord::LeadLag(r) => r.timestamp,
            RawRecord::Pmi(r) => r.timestamp,
            RawRecord::ChangeAttribution(r) => r.timestamp,
        }
    }
}

/// Parse one NDJSON line into a raw record.
///
/// Per-record failures are local: the caller counts the error and moves on
/// to the next line, never aborting the batch.
pub fn parse_line(line: &str) -> Result<RawRecord> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| Error::ParseError(e.to_string()))?;

    let obj = value
        .as_object()
        .ok_or_else(|| Error::ParseError("record line is not a JSON object".to_string()))?;

    let record_type = match obj.get("type") {
        None => {
            return Err(Error::MissingRequiredField {
                field: "type".to_string(),
            })
        }
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(Error::UnknownRecordType {
                record_type: other.to_string(),
            })
        }
    };

    match record_type.as_str() {
        "burst" | "lead_lag" | "pmi" | "change_attribution" => {
            serde_json::from_value::<RawRecord>(value).map_err(|e| Error::ParseError(e.to_string()))
        }
        _ => Err(Error::UnknownRecordType { record_type }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_burst() {
        let line = r#"{"type":"burst","series1":"a","series2":"b","correlation":0.82,"aligned_bursts":7,"total_buckets":12,"alignment_strength":0.82,"is_significant":true,"strategy":"burst_detection","timestamp":1700000000000}"#;
        let record = parse_line(line).unwrap();
        match record {
            RawRecord::Burst(ref b) => {
                assert_eq!(b.series1, "a");
                assert_eq!(b.aligned_bursts, 7);
                assert!(b.is_significant);
            }
            _ => panic!("expected burst"),
        }
        assert_eq!(record.kind(), InsightKind::BurstCorrelation);
        assert_eq!(record.timestamp(), 1_700_000_000_000);
    }

    #[test]
    fn test_parse_lead_lag_negative_confidence() {
        let line = r#"{"type":"lead_lag","series1":"a","series2":"b","lag_seconds":120,"correlation":0.9,"confidence":-0.161,"direction":"series1_leads"}"#;
        match parse_line(line).unwrap() {
            RawRecord::LeadLag(r) => {
                // Negative confidence survives parsing unclamped.
                assert!((r.confidence - (-0.161)).abs() < 1e-9);
                assert!((r.lag_seconds - 120.0).abs() < 1e-9);
            }
            _ => panic!("expected lead_lag"),
        }
    }

    #[test]
    fn test_parse_pmi_with_dedup_hint() {
        let line = r#"{"type":"pmi","token_a":"actual_namespace:production","token_b":"evt_name:oom","pmi_score":2.1,"support":5,"p_a":0.15,"p_b":0.15,"p_ab":0.15,"_deduplication":{"semantic":true,"note":"same namespace under two label conventions"}}"#;
        match parse_line(line).unwrap() {
            RawRecord::Pmi(r) => {
                let hint = r.deduplication.unwrap();
                assert!(hint.semantic);
                assert!(hint.note.unwrap().contains("label conventions"));
            }
            _ => panic!("expected pmi"),
        }
    }

    #[test]
    fn test_parse_change_attribution() {
        let line = r#"{"type":"change_attribution","source":"deploy:abc123","target":"svc:api","correlation_coefficient":0.7,"lag_minutes":4.5,"lag_ms":270000,"change_count":3,"effect_count":9,"confidence":0.8,"method":"granger"}"#;
        match parse_line(line).unwrap() {
            RawRecord::ChangeAttribution(r) => {
                assert_eq!(r.change_count, 3);
                assert_eq!(r.method, "granger");
            }
            _ => panic!("expected change_attribution"),
        }
    }

    #[test]
    fn test_missing_fields_default() {
        let record = parse_line(r#"{"type":"burst"}"#).unwrap();
        match record {
            RawRecord::Burst(b) => {
                assert_eq!(b.series1, "");
                assert_eq!(b.aligned_bursts, 0);
                assert!(!b.is_significant);
                assert_eq!(b.timestamp, 0);
            }
            _ => panic!("expected burst"),
        }
    }

    #[test]
    fn test_missing_type_field() {
        let err = parse_line(r#"{"series1":"a"}"#).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { ref field } if field == "type"));
    }

    #[test]
    fn test_unknown_type() {
        let err = parse_line(r#"{"type":"situation"}"#).unwrap_err();
        assert!(
            matches!(err, Error::UnknownRecordType { ref record_type } if record_type == "situation")
        );
    }

    #[test]
    fn test_malformed_line() {
        let err = parse_line("{not json").unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));

        let err = parse_line(r#"[1, 2, 3]"#).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn test_observed_at_alias() {
        let record = parse_line(r#"{"type":"pmi","observedAt":1700000000000}"#).unwrap();
        assert_eq!(record.timestamp(), 1_700_000_000_000);
    }
}
