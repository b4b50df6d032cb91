use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use grocery_list_core::ListError;

/// JSON error body: `{"error": "...", "message": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(error: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ListError> for ApiError {
    fn from(e: ListError) -> Self {
        let message = e.to_string();
        match e {
            ListError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "not_found", message),
            ListError::InvalidParameter(_) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_parameter", message)
            }
            ListError::Conflict(_) => Self::new(StatusCode::CONFLICT, "conflict", message),
            ListError::Storage(_) => {
                tracing::error!("{}", message);
                Self::internal("storage failure")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
