//! Execution log of scheduled runs.
//!
//! Every run ends in exactly one [`RunRecord`]. Records are kept in memory
//! for the life of the process and, when a path is configured, appended to a
//! JSON-lines file:
//!
//! ```text
//! {"job_id":"scrape_and_send_email","started_at":"2025-05-06T10:00:00Z","duration_ms":8123,"status":"partial_failure",...}
//! ```
//!
//! Writing the file is best effort. A failed append is logged and the record
//! still lands in memory; the job is never failed because of it.

use crate::models::{DigestResult, RunOutcome, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument, warn};

/// One finished run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunRecord {
    pub job_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: RunStatus,
    pub error_detail: Option<String>,
    pub sites_attempted: usize,
    pub sites_failed: usize,
    pub pairs: usize,
}

impl RunRecord {
    pub fn new(
        job_id: &str,
        started_at: DateTime<Utc>,
        outcome: &RunOutcome,
        digest: Option<&DigestResult>,
    ) -> Self {
        let duration_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
        Self {
            job_id: job_id.to_string(),
            started_at,
            duration_ms,
            status: outcome.status,
            error_detail: outcome.error_detail.clone(),
            sites_attempted: digest.map_or(0, |d| d.sites_attempted),
            sites_failed: digest.map_or(0, |d| d.sites_failed),
            pairs: digest.map_or(0, |d| d.pairs.len()),
        }
    }
}

/// Append-only run history.
#[derive(Debug, Default)]
pub struct OutcomeLog {
    path: Option<PathBuf>,
    history: Mutex<Vec<RunRecord>>,
}

impl OutcomeLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            history: Mutex::new(Vec::new()),
        }
    }

    #[instrument(level = "info", skip_all, fields(job_id = %record.job_id, status = %record.status))]
    pub async fn record(&self, record: RunRecord) {
        match record.status {
            RunStatus::Success => info!(duration_ms = record.duration_ms, pairs = record.pairs, "Run succeeded"),
            RunStatus::PartialFailure => warn!(
                duration_ms = record.duration_ms,
                pairs = record.pairs,
                detail = record.error_detail.as_deref().unwrap_or_default(),
                "Run completed with failed sites"
            ),
            RunStatus::Fatal => error!(
                duration_ms = record.duration_ms,
                detail = record.error_detail.as_deref().unwrap_or_default(),
                "Run failed"
            ),
        }

        if let Some(path) = &self.path {
            if let Err(e) = append_line(path, &record).await {
                error!(path = %path.display(), error = %e, "Failed to append run record");
            }
        }

        match self.history.lock() {
            Ok(mut history) => history.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }

    /// Snapshot of every record so far, oldest first.
    pub fn history(&self) -> Vec<RunRecord> {
        match self.history.lock() {
            Ok(history) => history.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

async fn append_line(path: &Path, record: &RunRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: RunStatus) -> RunRecord {
        RunRecord {
            job_id: "scrape_and_send_email".to_string(),
            started_at: Utc::now(),
            duration_ms: 12,
            status,
            error_detail: None,
            sites_attempted: 2,
            sites_failed: 0,
            pairs: 5,
        }
    }

    #[tokio::test]
    async fn test_records_append_to_history_in_order() {
        let log = OutcomeLog::new(None);
        log.record(record(RunStatus::Success)).await;
        log.record(record(RunStatus::Fatal)).await;

        let statuses: Vec<_> = log.history().iter().map(|r| r.status).collect();
        assert_eq!(statuses, [RunStatus::Success, RunStatus::Fatal]);
    }

    #[tokio::test]
    async fn test_records_append_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");
        let log = OutcomeLog::new(Some(path.clone()));

        log.record(record(RunStatus::Success)).await;
        log.record(record(RunStatus::PartialFailure)).await;

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<RunRecord> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].status, RunStatus::PartialFailure);
        assert_eq!(lines[0].pairs, 5);
    }

    #[tokio::test]
    async fn test_unwritable_log_file_does_not_lose_record() {
        let log = OutcomeLog::new(Some(PathBuf::from("/nonexistent/dir/runs.jsonl")));
        log.record(record(RunStatus::Success)).await;
        assert_eq!(log.history().len(), 1);
    }

    #[test]
    fn test_run_record_copies_digest_counts() {
        let digest = DigestResult {
            pairs: vec![],
            sites_attempted: 3,
            sites_failed: 1,
        };
        let outcome = RunOutcome::delivered(&digest);
        let rec = RunRecord::new("job", Utc::now(), &outcome, Some(&digest));
        assert_eq!(rec.status, RunStatus::PartialFailure);
        assert_eq!(rec.sites_attempted, 3);
        assert_eq!(rec.sites_failed, 1);
    }

    #[test]
    fn test_run_record_without_digest() {
        let rec = RunRecord::new("job", Utc::now(), &RunOutcome::fatal("boom"), None);
        assert_eq!(rec.sites_attempted, 0);
        assert_eq!(rec.error_detail.as_deref(), Some("boom"));
    }
}
