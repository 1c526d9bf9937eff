pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
    Router,
};

use crate::auth::{handle_auth, require_auth};
use crate::state::AppState;
use crate::submission::handlers as submissions;
use crate::submission::upload::MAX_UPLOAD_BYTES;
use crate::wipe::handlers as wipe;

/// Multipart framing and the text fields on top of the file itself.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    // Views that require a signed-in user
    let protected = Router::new()
        .route("/", get(submissions::handle_list_submissions))
        .route(
            "/upload",
            get(submissions::handle_upload_status)
                .post(submissions::handle_analyze)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/resume/:id", get(submissions::handle_get_submission))
        .route("/wipe", get(wipe::handle_wipe_overview).post(wipe::handle_wipe))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth", get(handle_auth))
        .merge(protected)
        .with_state(state)
}
