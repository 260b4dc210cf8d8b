//! Insight and cycle identity types.
//!
//! An insight id is a deterministic function of (kind, participants, time
//! bucket), so re-ingestion of the same logical signal always resolves to
//! the same id. Cycle ids label one ingestion pass for logging and audit.

use crate::kinds::InsightKind;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hex characters kept from the SHA-256 digest.
const ID_HEX_LEN: usize = 32;

/// Stable identifier for a normalized insight.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct InsightId(pub String);

impl InsightId {
    /// Derive the id for a signal.
    ///
    /// The digest covers the kind tag, both participant identifiers in
    /// their normalized order, and the time-bucket index. Two raw records
    /// describing the same signal in the same bucket collapse to one id.
    pub fn derive(kind: InsightKind, participant_a: &str, participant_b: &str, bucket: i64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.tag().as_bytes());
        hasher.update(b"|");
        hasher.update(participant_a.as_bytes());
        hasher.update(b"|");
        hasher.update(participant_b.as_bytes());
        hasher.update(b"|");
        hasher.update(bucket.to_le_bytes());
        let digest = hasher.finalize();
        InsightId(hex::encode(digest)[..ID_HEX_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InsightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InsightId {
    fn from(s: &str) -> Self {
        InsightId(s.to_string())
    }
}

/// Identifier for one ingestion cycle.
///
/// Format: `cyc-YYYYMMDD-HHMMSS-XXXX`
/// Example: `cyc-20260804-143022-a7xq`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CycleId(pub String);

impl CycleId {
    /// Generate a new cycle ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let suffix = generate_base32_suffix();
        CycleId(format!(
            "cyc-{}-{}-{}",
            now.format("%Y%m%d"),
            now.format("%H%M%S"),
            suffix
        ))
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn generate_base32_suffix() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    let mut value = ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32);
    value &= 0x000F_FFFF;
    let alphabet = b"abcdefghijklmnopqrstuvwxyz234567";
    let mut out = String::with_capacity(4);
    for shift in [15_u32, 10, 5, 0] {
        let idx = ((value >> shift) & 0x1F) as usize;
        out.push(alphabet[idx] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_deterministic() {
        let a = InsightId::derive(InsightKind::BurstCorrelation, "s1", "s2", 42);
        let b = InsightId::derive(InsightKind::BurstCorrelation, "s1", "s2", 42);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), ID_HEX_LEN);
    }

    #[test]
    fn test_id_varies_by_kind() {
        let a = InsightId::derive(InsightKind::BurstCorrelation, "s1", "s2", 42);
        let b = InsightId::derive(InsightKind::LeadLag, "s1", "s2", 42);
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_varies_by_bucket() {
        let a = InsightId::derive(InsightKind::PmiCooccurrence, "t1", "t2", 0);
        let b = InsightId::derive(InsightKind::PmiCooccurrence, "t1", "t2", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_participant_order_matters() {
        // Lead-lag direction is encoded in participant order, so the
        // derivation must not sort the pair.
        let a = InsightId::derive(InsightKind::LeadLag, "s1", "s2", 0);
        let b = InsightId::derive(InsightKind::LeadLag, "s2", "s1", 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_cycle_id_format() {
        let cid = CycleId::new();
        assert!(cid.0.starts_with("cyc-"));
        assert_eq!(cid.0.len(), 24);
    }
}
