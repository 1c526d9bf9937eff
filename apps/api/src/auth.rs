//! Authentication seam and the route guard.
//!
//! Sessions are issued elsewhere; this service only resolves a bearer token
//! to a user. Unauthenticated visitors are sent to `/auth?next=<path>`.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Query, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub username: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolves a bearer token. `None` means the token is unknown.
    async fn authenticate(&self, token: &str) -> Result<Option<AuthUser>>;
}

/// Fixed token table loaded from configuration.
pub struct StaticTokenAuth {
    users_by_token: HashMap<String, String>,
}

impl StaticTokenAuth {
    pub fn new(pairs: &[(String, String)]) -> Self {
        Self {
            users_by_token: pairs
                .iter()
                .map(|(username, token)| (token.clone(), username.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn authenticate(&self, token: &str) -> Result<Option<AuthUser>> {
        Ok(self.users_by_token.get(token).map(|username| AuthUser {
            username: username.clone(),
        }))
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Sends the visitor to `/auth` with `target` (path and query) form-encoded as `next`.
pub fn login_redirect(target: &str) -> Redirect {
    let location = match Url::parse_with_params("http://localhost/auth", &[("next", target)]) {
        Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or_default()),
        Err(_) => "/auth".to_string(),
    };
    Redirect::to(&location)
}

/// Middleware: attaches `AuthUser` to the request or redirects to the auth view.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let token = bearer_token(&request).map(str::to_string);

    let user = match token {
        Some(token) => match state.auth.authenticate(&token).await {
            Ok(user) => user,
            Err(e) => return AppError::Internal(e).into_response(),
        },
        None => None,
    };

    match user {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => {
            debug!("Unauthenticated request to {target}, redirecting");
            login_redirect(&target).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub next: Option<String>,
}

/// GET /auth
///
/// Sign-in happens with the external identity provider; this only tells the
/// client where to come back to.
pub async fn handle_auth(Query(query): Query<AuthQuery>) -> Response {
    let next = query.next.unwrap_or_else(|| "/".to_string());
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {
                "code": "UNAUTHORIZED",
                "message": "Authentication required"
            },
            "next": next
        })),
    )
        .into_response()
}
