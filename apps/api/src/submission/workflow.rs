//! Upload-analyze workflow: turns an uploaded resume into a stored, analysed submission.
//!
//! Flow: upload resume → rasterise page 1 → upload preview → new id →
//!       persist (empty feedback) → inference → parse → persist (with feedback).
//!
//! Every step consumes the previous step's output and returns a `Result`;
//! the first failure aborts the run. Nothing is retried and nothing already
//! written is rolled back: uploaded objects and the empty-feedback record stay
//! behind, so a resubmission always starts over with a fresh id.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::inference::{Inference, InferenceResponse};
use crate::kv::KvStore;
use crate::llm_client::strip_json_fences;
use crate::rasterize::DocumentRasterizer;
use crate::storage::{ObjectStorage, StoredFile, UploadFile};
use crate::submission::model::{submission_key, Feedback, SubmissionRecord};
use crate::submission::progress::{
    ProgressReporter, STATUS_ANALYZING, STATUS_COMPLETE, STATUS_CONVERTING, STATUS_PREPARING,
    STATUS_UPLOADING_FILE, STATUS_UPLOADING_IMAGE,
};
use crate::submission::prompts::prepare_instructions;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// One variant per stage. Each carries the message shown to the user.
#[derive(Debug, Error, PartialEq)]
pub enum WorkflowError {
    #[error("{0}")]
    Upload(String),

    #[error("{0}")]
    Conversion(String),

    #[error("{0}")]
    Identifier(String),

    #[error("{0}")]
    Persistence(String),

    #[error("{0}")]
    Inference(String),

    #[error("{0}")]
    Parse(String),
}

impl WorkflowError {
    /// The user-facing status line, e.g. `Error: Failed to upload file`.
    pub fn status(&self) -> String {
        format!("Error: {self}")
    }
}

/// Appends the collaborator's own error, when there is one.
fn with_cause(message: &str, cause: Option<anyhow::Error>) -> String {
    match cause {
        Some(e) => format!("{message}: {e}"),
        None => message.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Collaborators
// ────────────────────────────────────────────────────────────────────────────

pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Everything the workflow talks to, passed in explicitly.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn ObjectStorage>,
    pub kv: Arc<dyn KvStore>,
    pub inference: Arc<dyn Inference>,
    pub rasterizer: Arc<dyn DocumentRasterizer>,
    pub ids: Arc<dyn IdGenerator>,
}

/// A validated submission from the upload form.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub file: UploadFile,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the full pipeline. On success the returned record has both paths and
/// feedback set and has been written twice under `resume:<id>`.
pub async fn analyze_resume(
    collaborators: &Collaborators,
    request: AnalyzeRequest,
    progress: &dyn ProgressReporter,
) -> Result<SubmissionRecord, WorkflowError> {
    progress.report(STATUS_UPLOADING_FILE);
    let resume = upload_resume(collaborators.storage.as_ref(), request.file.clone()).await?;

    progress.report(STATUS_CONVERTING);
    let preview = rasterize(collaborators.rasterizer.as_ref(), &request.file).await?;

    progress.report(STATUS_UPLOADING_IMAGE);
    let image = upload_preview(collaborators.storage.as_ref(), preview).await?;

    progress.report(STATUS_PREPARING);
    let id = generate_id(collaborators.ids.as_ref())?;
    let mut record = SubmissionRecord {
        id,
        resume_path: resume.path,
        image_path: image.path,
        company_name: request.company_name,
        job_title: request.job_title,
        job_description: request.job_description,
        feedback: None,
    };
    persist(collaborators.kv.as_ref(), &record, "Failed to save submission to kv store").await?;
    info!("Submission {} stored, awaiting feedback", record.id);

    progress.report(STATUS_ANALYZING);
    let response = request_feedback(collaborators.inference.as_ref(), &record).await?;
    record.feedback = Some(parse_feedback(response)?);
    debug_assert!(record.is_consistent());
    persist(collaborators.kv.as_ref(), &record, "Failed to save feedback to kv store").await?;

    info!("Submission {} analysed", record.id);
    progress.report(STATUS_COMPLETE);
    Ok(record)
}

async fn upload_resume(storage: &dyn ObjectStorage, file: UploadFile) -> Result<StoredFile, WorkflowError> {
    upload(storage, file, "Failed to upload file").await
}

async fn upload_preview(storage: &dyn ObjectStorage, image: UploadFile) -> Result<StoredFile, WorkflowError> {
    upload(storage, image, "Failed to upload image").await
}

async fn upload(storage: &dyn ObjectStorage, file: UploadFile, failure: &str) -> Result<StoredFile, WorkflowError> {
    let name = file.name.clone();
    let (stored, cause) = match storage.upload(file).await {
        Ok(stored) => (stored, None),
        Err(e) => (None, Some(e)),
    };
    match stored {
        Some(stored) if !stored.path.is_empty() => {
            info!("Uploaded {name} to {}", stored.path);
            Ok(stored)
        }
        _ => {
            let message = with_cause(failure, cause);
            error!("Upload of {name} failed: {message}");
            Err(WorkflowError::Upload(message))
        }
    }
}

async fn rasterize(rasterizer: &dyn DocumentRasterizer, file: &UploadFile) -> Result<UploadFile, WorkflowError> {
    let converted = rasterizer.convert(file).await;
    converted.file.ok_or_else(|| {
        let detail = converted.error.unwrap_or_else(|| "Unknown error".to_string());
        error!("Rasterisation of {} failed: {detail}", file.name);
        WorkflowError::Conversion(format!("Failed to convert PDF to Image - {detail}"))
    })
}

fn generate_id(ids: &dyn IdGenerator) -> Result<String, WorkflowError> {
    let id = ids.generate();
    if id.trim().is_empty() {
        error!("Identifier generator returned an empty value");
        return Err(WorkflowError::Identifier("Failed to generate UUID".to_string()));
    }
    Ok(id)
}

async fn persist(kv: &dyn KvStore, record: &SubmissionRecord, failure: &str) -> Result<(), WorkflowError> {
    let key = submission_key(&record.id);
    let value = serde_json::to_string(record)
        .map_err(|e| WorkflowError::Persistence(format!("{failure}: {e}")))?;

    let (written, cause) = match kv.set(&key, &value).await {
        Ok(written) => (written, None),
        Err(e) => (false, Some(e)),
    };
    if !written {
        let message = with_cause(failure, cause);
        error!("Persisting {key} failed: {message}");
        return Err(WorkflowError::Persistence(message));
    }
    info!("Saved {key} ({} bytes)", value.len());
    Ok(())
}

async fn request_feedback(
    inference: &dyn Inference,
    record: &SubmissionRecord,
) -> Result<InferenceResponse, WorkflowError> {
    let instructions = prepare_instructions(&record.job_title, &record.job_description);
    let (response, cause) = match inference.feedback(&record.resume_path, &instructions).await {
        Ok(response) => (response, None),
        Err(e) => (None, Some(e)),
    };
    response.ok_or_else(|| {
        let message = with_cause("Failed to analyze resume", cause);
        error!("Inference for submission {} failed: {message}", record.id);
        WorkflowError::Inference(message)
    })
}

/// Normalises either content shape to text and parses it as `Feedback`.
pub fn parse_feedback(response: InferenceResponse) -> Result<Feedback, WorkflowError> {
    let text = response
        .into_text()
        .ok_or_else(|| WorkflowError::Parse("Failed to parse feedback: response content is empty".to_string()))?;

    serde_json::from_str(strip_json_fences(&text)).map_err(|e| {
        error!("Feedback is not valid JSON: {e}");
        WorkflowError::Parse(format!("Failed to parse feedback: {e}"))
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
