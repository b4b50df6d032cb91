//! Bearer-key authentication.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::ApiError;
use super::AppState;

/// Authenticated user, added to request extensions after auth.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(key) => key.trim().to_string(),
            None => {
                return ApiError::unauthorized(
                    "invalid_auth",
                    "Authorization header must use Bearer scheme",
                )
                .into_response()
            }
        },
        None => {
            return ApiError::unauthorized("missing_auth", "Authorization header required")
                .into_response()
        }
    };

    match state.api_keys.resolve(&api_key).await {
        Ok(Some(username)) => {
            request.extensions_mut().insert(AuthUser { username });
            next.run(request).await
        }
        Ok(None) => ApiError::unauthorized("invalid_key", "Invalid API key").into_response(),
        Err(e) => {
            tracing::error!("Failed to resolve API key: {}", e);
            ApiError::internal("failed to check API key").into_response()
        }
    }
}
