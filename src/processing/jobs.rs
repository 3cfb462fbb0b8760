//! In-process tracking of bulk ingestion jobs.
//!
//! A [`JobRegistry`] is created once at startup and shared between the HTTP handlers and the
//! background drivers. Records live only as long as the process, and finished jobs are
//! dropped once they have been terminal for longer than the registry's retention.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::current_timestamp_rfc3339;

/// How long a finished job stays queryable.
pub const DEFAULT_JOB_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Lifecycle state of a bulk job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Files are still being handled.
    Processing,
    /// Every file was handled; some may have failed individually.
    Done,
    /// The driver aborted before finishing the batch.
    Failed,
}

impl JobStatus {
    /// Whether the job can no longer change.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }
}

/// Read-only view of a job returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    /// Job identifier.
    pub job_id: Uuid,
    /// Identifier of the submitting user.
    #[serde(rename = "userId")]
    pub owner: Option<String>,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Number of files submitted.
    pub total: usize,
    /// Number of files handled so far, successful or not.
    pub processed: usize,
    /// Per-file and driver error messages, in the order they occurred.
    pub errors: Vec<String>,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

#[derive(Debug, Clone)]
struct JobRecord {
    owner: Option<String>,
    status: JobStatus,
    total: usize,
    processed: usize,
    errors: Vec<String>,
    created_at: String,
    finished_at: Option<Instant>,
}

impl JobRecord {
    fn expired(&self, retention: Duration) -> bool {
        self.finished_at
            .is_some_and(|finished| finished.elapsed() >= retention)
    }

    fn finish(&mut self, status: JobStatus) {
        self.status = status;
        self.finished_at = Some(Instant::now());
    }
}

/// Shared registry of bulk jobs keyed by id.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, JobRecord>>>,
    retention: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_JOB_RETENTION)
    }
}

impl JobRegistry {
    /// Create an empty registry keeping finished jobs for [`DEFAULT_JOB_RETENTION`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry keeping finished jobs for `retention`.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Register a new job in the `processing` state, pruning expired finished jobs.
    pub async fn create(&self, total: usize, owner: Option<String>) -> Uuid {
        let id = Uuid::new_v4();
        let record = JobRecord {
            owner,
            status: JobStatus::Processing,
            total,
            processed: 0,
            errors: Vec::new(),
            created_at: current_timestamp_rfc3339(),
            finished_at: None,
        };
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, record| !record.expired(self.retention));
        let pruned = before - jobs.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned finished jobs");
        }
        jobs.insert(id, record);
        tracing::debug!(job_id = %id, total, "Job created");
        id
    }

    /// Count one more file as handled.
    pub async fn increment(&self, id: Uuid) {
        self.update(id, |record| {
            record.processed = (record.processed + 1).min(record.total);
        })
        .await;
    }

    /// Append an error message without changing the status.
    pub async fn record_error(&self, id: Uuid, message: impl Into<String>) {
        let message = message.into();
        self.update(id, |record| record.errors.push(message)).await;
    }

    /// Mark the job as finished.
    pub async fn complete(&self, id: Uuid) {
        self.update(id, |record| record.finish(JobStatus::Done))
            .await;
    }

    /// Mark the job as failed, recording the cause.
    pub async fn fail(&self, id: Uuid, cause: impl Into<String>) {
        let cause = cause.into();
        self.update(id, |record| {
            record.errors.push(cause);
            record.finish(JobStatus::Failed);
        })
        .await;
    }

    /// Snapshot of the job, if it exists and has not expired.
    pub async fn get(&self, id: Uuid) -> Option<JobSnapshot> {
        let jobs = self.jobs.read().await;
        let record = jobs.get(&id).filter(|record| !record.expired(self.retention));
        record.map(|record| JobSnapshot {
            job_id: id,
            owner: record.owner.clone(),
            status: record.status,
            total: record.total,
            processed: record.processed,
            errors: record.errors.clone(),
            created_at: record.created_at.clone(),
        })
    }

    async fn update<F>(&self, id: Uuid, mutate: F)
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(record) if record.status.is_terminal() => {
                tracing::debug!(job_id = %id, status = ?record.status, "Ignoring update to finished job");
            }
            Some(record) => mutate(record),
            None => tracing::warn!(job_id = %id, "Update for unknown job"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn job_progresses_from_processing_to_done() {
        let registry = JobRegistry::new();
        let id = registry.create(3, Some("user-1".into())).await;

        let snapshot = registry.get(id).await.expect("job");
        assert_eq!(snapshot.status, JobStatus::Processing);
        assert_eq!(snapshot.processed, 0);
        assert_eq!(snapshot.owner.as_deref(), Some("user-1"));

        registry.increment(id).await;
        registry.record_error(id, "b.csv: Unsupported file type: .csv").await;
        registry.increment(id).await;
        registry.increment(id).await;
        registry.complete(id).await;

        let snapshot = registry.get(id).await.expect("job");
        assert_eq!(snapshot.status, JobStatus::Done);
        assert_eq!(snapshot.processed, 3);
        assert_eq!(snapshot.errors.len(), 1);
    }

    #[tokio::test]
    async fn terminal_jobs_ignore_further_mutation() {
        let registry = JobRegistry::new();
        let id = registry.create(2, None).await;
        registry.fail(id, "store unreachable").await;
        registry.increment(id).await;
        registry.complete(id).await;

        let snapshot = registry.get(id).await.expect("job");
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.processed, 0);
        assert_eq!(snapshot.errors, vec!["store unreachable".to_string()]);
    }

    #[tokio::test]
    async fn unknown_jobs_are_absent() {
        let registry = JobRegistry::new();
        assert!(registry.get(Uuid::new_v4()).await.is_none());
        registry.increment(Uuid::new_v4()).await;
    }

    #[tokio::test]
    async fn finished_jobs_expire_after_retention_while_running_jobs_stay() {
        let registry = JobRegistry::with_retention(Duration::ZERO);
        let finished = registry.create(1, None).await;
        let failed = registry.create(1, None).await;
        let running = registry.create(2, None).await;
        registry.complete(finished).await;
        registry.fail(failed, "store unreachable").await;

        assert!(registry.get(finished).await.is_none());
        assert!(registry.get(failed).await.is_none());

        let next = registry.create(1, None).await;
        assert_eq!(registry.jobs.read().await.len(), 2);
        assert!(registry.get(running).await.is_some());
        assert!(registry.get(next).await.is_some());
    }

    #[tokio::test]
    async fn default_retention_keeps_finished_jobs_queryable() {
        let registry = JobRegistry::new();
        let id = registry.create(1, None).await;
        registry.complete(id).await;
        registry.create(1, None).await;

        assert_eq!(registry.get(id).await.expect("job").status, JobStatus::Done);
    }

    #[test]
    fn snapshot_serializes_with_camel_case_keys() {
        let snapshot = JobSnapshot {
            job_id: Uuid::nil(),
            owner: None,
            status: JobStatus::Processing,
            total: 1,
            processed: 0,
            errors: Vec::new(),
            created_at: "2025-01-01T00:00:00Z".into(),
        };
        let value = serde_json::to_value(&snapshot).expect("json");
        assert_eq!(value["status"], "processing");
        assert_eq!(value["jobId"], Uuid::nil().to_string());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("userId").is_some());
    }
}
