use std::sync::Arc;

use crate::auth::AuthProvider;
use crate::submission::progress::UploadTracker;
use crate::submission::workflow::Collaborators;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthProvider>,
    /// Storage, KV, inference, rasterizer and id generator, as handed to the workflow.
    pub collaborators: Collaborators,
    /// Processing flag and status text of the upload-analyze workflow.
    pub uploads: UploadTracker,
}
