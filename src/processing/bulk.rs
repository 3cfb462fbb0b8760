//! Asynchronous bulk ingestion driven by [`JobRegistry`] records.

use super::{
    jobs::JobRegistry,
    service::IngestionService,
    types::{BulkFile, ServiceError},
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Response returned as soon as a bulk job is accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAccepted {
    /// Identifier to poll.
    pub job_id: Uuid,
    /// Always `"started"`.
    pub status: &'static str,
    /// Number of files queued.
    pub total: usize,
}

/// Register a job for `files` and process them on a detached task.
pub async fn start_bulk_ingest(
    service: Arc<IngestionService>,
    jobs: JobRegistry,
    files: Vec<BulkFile>,
    owner: Option<String>,
) -> Result<BulkAccepted, ServiceError> {
    if files.is_empty() {
        return Err(ServiceError::Validation("No files provided".into()));
    }

    let total = files.len();
    let job_id = jobs.create(total, owner.clone()).await;
    service.metrics().record_job();
    tracing::info!(job_id = %job_id, total, "Bulk ingestion accepted");

    tokio::spawn(run_bulk_job(service, jobs, job_id, files, owner));

    Ok(BulkAccepted {
        job_id,
        status: "started",
        total,
    })
}

/// Process every file of a job in order, recording progress as each one finishes.
///
/// A failing file is recorded in the job's error list and the batch continues. The job fails
/// only when the store cannot be reached before the batch starts.
pub async fn run_bulk_job(
    service: Arc<IngestionService>,
    jobs: JobRegistry,
    job_id: Uuid,
    files: Vec<BulkFile>,
    owner: Option<String>,
) {
    if let Err(err) = service.store().ping().await {
        tracing::error!(job_id = %job_id, error = %err, "Bulk ingestion aborted");
        jobs.fail(job_id, err.to_string()).await;
        return;
    }

    for file in &files {
        match service.ingest_file(file, owner.as_deref()).await {
            Ok(outcome) => {
                tracing::debug!(
                    job_id = %job_id,
                    filename = %file.filename,
                    duplicate = outcome.duplicate,
                    chunks = outcome.chunks_created,
                    "File handled"
                );
            }
            Err(err) => {
                tracing::warn!(job_id = %job_id, filename = %file.filename, error = %err, "File failed");
                service.metrics().record_file_failure();
                jobs.record_error(job_id, format!("{}: {err}", display_name(file)))
                    .await;
            }
        }
        jobs.increment(job_id).await;
    }

    jobs.complete(job_id).await;
    tracing::info!(job_id = %job_id, total = files.len(), "Bulk ingestion finished");
}

fn display_name(file: &BulkFile) -> &str {
    if file.filename.trim().is_empty() {
        "?"
    } else {
        &file.filename
    }
}
