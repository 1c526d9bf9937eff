use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::FsItem;
use crate::wipe::{list_files, wipe_app_data, WipeReport};

#[derive(Debug, Serialize)]
pub struct WipeOverviewResponse {
    pub username: String,
    pub files: Vec<FsItem>,
}

/// GET /wipe
pub async fn handle_wipe_overview(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<WipeOverviewResponse>, AppError> {
    let files = list_files(state.collaborators.storage.as_ref()).await?;
    Ok(Json(WipeOverviewResponse {
        username: user.username,
        files,
    }))
}

/// POST /wipe
pub async fn handle_wipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<WipeReport>, AppError> {
    tracing::warn!("User {} requested an app data wipe", user.username);
    let report = wipe_app_data(
        state.collaborators.storage.as_ref(),
        state.collaborators.kv.as_ref(),
    )
    .await?;
    Ok(Json(report))
}
