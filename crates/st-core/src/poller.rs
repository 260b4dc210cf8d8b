//! Append-only source polling and the ingestion cycle.
//!
//! The poller reads the NDJSON record source from a remembered byte
//! offset, consumes only complete lines (a trailing partial line is
//! deferred to the next cycle), and feeds parsed records through
//! normalize → classify → commit. One cycle runs to completion before the
//! next begins; a scheduled tick that would overlap a still-running cycle
//! is skipped rather than queued.
//!
//! A source-level failure degrades freshness and is retried on the next
//! scheduled cycle. Nothing here is fatal to the process: the worst
//! outcome is "no new data this cycle".

use crate::normalize::normalize;
use crate::record::parse_line;
use crate::store::{CommitStats, IngestCounters, InsightStore};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use st_common::{BucketSize, CycleId, Error, Result};
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Offset-tracking reader over the append-only record source.
#[derive(Debug)]
pub struct SourceReader {
    path: PathBuf,
    offset: u64,
    /// Highest record timestamp seen so far (epoch ms).
    high_water_ts: i64,
}

impl SourceReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SourceReader {
            path: path.into(),
            offset: 0,
            high_water_ts: 0,
        }
    }

    pub fn high_water_ts(&self) -> i64 {
        self.high_water_ts
    }

    /// Record a parsed timestamp; returns true when it advances the high
    /// water mark (the record is new, not a replay).
    pub fn observe_timestamp(&mut self, timestamp_ms: i64) -> bool {
        if timestamp_ms > self.high_water_ts {
            self.high_water_ts = timestamp_ms;
            true
        } else {
            false
        }
    }

    /// Read the complete lines appended since the last call.
    ///
    /// A trailing line without a newline stays unconsumed; the offset only
    /// advances past the last complete line. A source that shrank below
    /// the remembered offset (rotation) is re-read from the start.
    pub fn read_new_lines(&mut self) -> Result<Vec<String>> {
        let mut file = std::fs::File::open(&self.path)
            .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", self.path.display())))?;

        let len = file
            .metadata()
            .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", self.path.display())))?
            .len();
        if len < self.offset {
            self.offset = 0;
        }

        file.seek(SeekFrom::Start(self.offset))
            .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", self.path.display())))?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", self.path.display())))?;

        let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(Vec::new());
        };
        let complete = &buf[..=last_newline];
        self.offset += complete.len() as u64;

        let lines = complete
            .split(|&b| b == b'\n')
            .map(|line| String::from_utf8_lossy(line).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        Ok(lines)
    }
}

/// Outcome of a single ingestion cycle, for logging and audit.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CycleOutcome {
    pub cycle_id: CycleId,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub lines_read: u64,
    pub records_parsed: u64,
    /// Records whose timestamp advanced the high water mark.
    pub new_records: u64,
    pub commit: CommitStats,
    pub rejects: IngestCounters,
    /// Set when the cycle failed at the source level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CycleOutcome {
    pub fn degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Run one ingestion cycle against the store.
///
/// Per-record failures are counted and skipped; they never abort the
/// batch. The commit at the end is the cycle's single atomic effect, so
/// abandoning a cycle mid-flight leaves the store consistent.
pub fn run_cycle(
    store: &InsightStore,
    reader: &mut SourceReader,
    bucket: BucketSize,
) -> CycleOutcome {
    let cycle_id = CycleId::new();
    let started_at = Utc::now();
    let t0 = Instant::now();

    let lines = match reader.read_new_lines() {
        Ok(lines) => lines,
        Err(error) => {
            tracing::warn!(cycle_id = %cycle_id, error = %error, "source read failed");
            store.record_cycle_failure(&error, Utc::now());
            return CycleOutcome {
                cycle_id,
                started_at,
                duration_ms: t0.elapsed().as_millis() as u64,
                lines_read: 0,
                records_parsed: 0,
                new_records: 0,
                commit: CommitStats::default(),
                rejects: IngestCounters::default(),
                error: Some(error.to_string()),
            };
        }
    };

    let mut delta = IngestCounters::default();
    let mut new_records = 0u64;
    let mut batch = Vec::new();
    let now = Utc::now();

    for line in &lines {
        delta.raw_lines += 1;
        match parse_line(line) {
            Ok(record) => {
                delta.parsed_records += 1;
                if reader.observe_timestamp(record.timestamp()) {
                    new_records += 1;
                }
                batch.push(normalize(&record, bucket, now));
            }
            Err(error) => {
                tracing::debug!(cycle_id = %cycle_id, error = %error, "record skipped");
                delta.count_error(&error);
            }
        }
    }

    let commit = store.commit_cycle(batch, &delta, cycle_id.clone(), Utc::now());

    let outcome = CycleOutcome {
        cycle_id,
        started_at,
        duration_ms: t0.elapsed().as_millis() as u64,
        lines_read: delta.raw_lines,
        records_parsed: delta.parsed_records,
        new_records,
        commit,
        rejects: delta,
        error: None,
    };
    tracing::info!(
        cycle_id = %outcome.cycle_id,
        lines = outcome.lines_read,
        parsed = outcome.records_parsed,
        inserted = outcome.commit.inserted,
        updated = outcome.commit.updated,
        rejected = outcome.rejects.rejected_lines,
        "cycle complete"
    );
    outcome
}

/// Periodic ingestion driver.
///
/// Cycles run strictly one at a time on the caller's thread; ticks missed
/// while a long cycle was running are skipped, not queued. Store queries
/// proceed concurrently against the latest committed snapshot.
pub struct Poller {
    store: Arc<InsightStore>,
    reader: SourceReader,
    interval: Duration,
    bucket: BucketSize,
    shutdown: Arc<AtomicBool>,
}

impl Poller {
    pub fn new(
        store: Arc<InsightStore>,
        reader: SourceReader,
        interval: Duration,
        bucket: BucketSize,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Poller {
            store,
            reader,
            interval,
            bucket,
            shutdown,
        }
    }

    /// Run cycles until the shutdown flag is set.
    ///
    /// Shutdown between cycles leaves the store at its last commit; there
    /// are no partial commits to clean up.
    pub fn run(&mut self) {
        let mut next_tick = Instant::now();
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                tracing::info!("poller shutting down");
                return;
            }

            run_cycle(&self.store, &mut self.reader, self.bucket);

            next_tick += self.interval;
            let now = Instant::now();
            let mut skipped = 0u32;
            while next_tick <= now {
                next_tick += self.interval;
                skipped += 1;
            }
            if skipped > 0 {
                tracing::warn!(skipped, "cycle overran interval; skipping scheduled ticks");
            }

            while Instant::now() < next_tick {
                if self.shutdown.load(Ordering::Relaxed) {
                    tracing::info!("poller shutting down");
                    return;
                }
                let remaining = next_tick.saturating_duration_since(Instant::now());
                std::thread::sleep(remaining.min(Duration::from_millis(100)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SeverityContext;
    use st_config::ThresholdConfig;
    use std::io::Write;

    fn store() -> InsightStore {
        InsightStore::new(ThresholdConfig::default(), SeverityContext::default())
    }

    #[test]
    fn test_partial_trailing_line_deferred() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insights.ndjson");
        std::fs::write(&path, "{\"type\":\"burst\"}\n{\"type\":\"pm").unwrap();

        let mut reader = SourceReader::new(&path);
        let lines = reader.read_new_lines().unwrap();
        assert_eq!(lines.len(), 1);

        // Completing the line surfaces it on the next cycle.
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "i\"}}\n").unwrap();
        drop(file);

        let lines = reader.read_new_lines().unwrap();
        assert_eq!(lines, vec![r#"{"type":"pmi"}"#.to_string()]);
    }

    #[test]
    fn test_only_new_lines_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insights.ndjson");
        std::fs::write(&path, "{\"type\":\"burst\"}\n").unwrap();

        let mut reader = SourceReader::new(&path);
        assert_eq!(reader.read_new_lines().unwrap().len(), 1);
        assert!(reader.read_new_lines().unwrap().is_empty());
    }

    #[test]
    fn test_truncated_source_rereads_from_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insights.ndjson");
        std::fs::write(&path, "{\"type\":\"burst\"}\n{\"type\":\"pmi\"}\n").unwrap();

        let mut reader = SourceReader::new(&path);
        assert_eq!(reader.read_new_lines().unwrap().len(), 2);

        std::fs::write(&path, "{\"type\":\"pmi\"}\n").unwrap();
        assert_eq!(reader.read_new_lines().unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_line_resilience() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insights.ndjson");
        let mut content = String::new();
        for i in 0..4 {
            content.push_str(&format!(
                "{{\"type\":\"burst\",\"series1\":\"s{i}\",\"series2\":\"t{i}\",\"correlation\":0.5,\"timestamp\":{}}}\n",
                1_700_000_000_000_i64 + i * 60_000
            ));
        }
        content.push_str("{this is not json}\n");
        std::fs::write(&path, content).unwrap();

        let store = store();
        let mut reader = SourceReader::new(&path);
        let outcome = run_cycle(&store, &mut reader, BucketSize::SixtySeconds);

        assert_eq!(outcome.lines_read, 5);
        assert_eq!(outcome.records_parsed, 4);
        assert_eq!(outcome.commit.inserted, 4);
        assert_eq!(outcome.rejects.parse_errors, 1);
        assert!(!outcome.degraded());
        assert_eq!(store.snapshot().insights.len(), 4);
    }

    #[test]
    fn test_source_unavailable_degrades_not_crashes() {
        let store = store();
        let mut reader = SourceReader::new("/nonexistent/insights.ndjson");
        let outcome = run_cycle(&store, &mut reader, BucketSize::SixtySeconds);

        assert!(outcome.degraded());
        assert!(store.snapshot().freshness.degraded());
        assert!(store.snapshot().insights.is_empty());
    }

    #[test]
    fn test_recovery_after_source_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.ndjson");

        let store = store();
        let mut reader = SourceReader::new(&path);
        assert!(run_cycle(&store, &mut reader, BucketSize::SixtySeconds).degraded());

        std::fs::write(&path, "{\"type\":\"burst\",\"series1\":\"a\",\"series2\":\"b\"}\n").unwrap();
        let outcome = run_cycle(&store, &mut reader, BucketSize::SixtySeconds);
        assert!(!outcome.degraded());
        assert!(!store.snapshot().freshness.degraded());
        assert_eq!(store.snapshot().insights.len(), 1);
    }

    #[test]
    fn test_new_record_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insights.ndjson");
        std::fs::write(
            &path,
            "{\"type\":\"burst\",\"series1\":\"a\",\"series2\":\"b\",\"timestamp\":1700000000000}\n",
        )
        .unwrap();

        let store = store();
        let mut reader = SourceReader::new(&path);
        let outcome = run_cycle(&store, &mut reader, BucketSize::SixtySeconds);
        assert_eq!(outcome.new_records, 1);

        // The same timestamp appended again is a replay, not a new record.
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(
            file,
            "{{\"type\":\"burst\",\"series1\":\"a\",\"series2\":\"b\",\"timestamp\":1700000000000}}"
        )
        .unwrap();
        drop(file);

        let outcome = run_cycle(&store, &mut reader, BucketSize::SixtySeconds);
        assert_eq!(outcome.records_parsed, 1);
        assert_eq!(outcome.new_records, 0);
        assert_eq!(store.snapshot().insights.len(), 1);
    }
}
