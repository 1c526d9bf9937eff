//! Axum route handlers for submissions: the dashboard, the upload flow and
//! the per-resume view.

use axum::{
    extract::{Multipart, Path, State},
    Extension, Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;
use crate::submission::model::{submission_key, SubmissionRecord, SUBMISSION_KEY_PREFIX};
use crate::submission::progress::{ProgressReporter, UploadStatus, STATUS_COMPLETE};
use crate::submission::upload::UploadForm;
use crate::submission::workflow::analyze_resume;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SubmissionListResponse {
    pub submissions: Vec<SubmissionRecord>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: String,
    pub redirect: String,
    pub record: SubmissionRecord,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /
///
/// Every stored submission, ordered by id. Entries that no longer parse are
/// skipped rather than failing the whole page.
pub async fn handle_list_submissions(
    State(state): State<AppState>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    let entries = state
        .collaborators
        .kv
        .list(SUBMISSION_KEY_PREFIX)
        .await
        .map_err(|e| AppError::Kv(e.to_string()))?;

    let mut submissions: Vec<SubmissionRecord> = entries
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_str(&value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed submission {key}: {e}");
                None
            }
        })
        .collect();
    submissions.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(Json(SubmissionListResponse { submissions }))
}

/// GET /upload
///
/// The caller's own processing flag and latest status text.
pub async fn handle_upload_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Json<UploadStatus> {
    Json(state.uploads.snapshot(&user.username))
}

/// POST /upload
///
/// Runs the upload-analyze workflow. Each user may have one run in flight; the run
/// itself is detached from the request so a dropped connection cannot stop
/// it between stages.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let request = UploadForm::from_multipart(multipart).await?.into_request()?;

    let guard = state
        .uploads
        .try_begin(&user.username)
        .ok_or_else(|| AppError::Conflict("A resume is already being analyzed".to_string()))?;

    info!(
        "User {} submitted {} for {} at {}",
        user.username, request.file.name, request.job_title, request.company_name
    );

    let collaborators = state.collaborators.clone();
    let outcome = tokio::spawn(async move {
        let result = analyze_resume(&collaborators, request, &guard).await;
        if let Err(e) = &result {
            guard.report(&e.status());
        }
        result
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Workflow task failed: {e}")))?;

    match outcome {
        Ok(record) => Ok(Json(AnalyzeResponse {
            status: STATUS_COMPLETE.to_string(),
            redirect: format!("/resume/{}", record.id),
            record,
        })),
        Err(e) => Err(AppError::Workflow(e.status())),
    }
}

/// GET /resume/:id
pub async fn handle_get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubmissionRecord>, AppError> {
    let value = state
        .collaborators
        .kv
        .get(&submission_key(&id))
        .await
        .map_err(|e| AppError::Kv(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;

    let record = serde_json::from_str(&value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Stored resume {id} is malformed: {e}")))?;

    Ok(Json(record))
}
