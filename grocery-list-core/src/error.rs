//! Errors returned by the list service.

use thiserror::Error;

use crate::models::{InvariantError, NameError};
use crate::store::StoreError;

/// Outcome kinds visible to callers of the list service.
///
/// `NotFound` covers both "does not exist" and "exists but you may not see
/// it"; callers cannot tell the two apart.
#[derive(Error, Debug)]
pub enum ListError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ListError {
    pub(crate) fn list_not_found(id: impl std::fmt::Display) -> Self {
        ListError::NotFound(format!("list {}", id))
    }

    pub(crate) fn user_not_found(username: &str) -> Self {
        ListError::NotFound(format!("user '{}'", username))
    }
}

impl From<NameError> for ListError {
    fn from(e: NameError) -> Self {
        ListError::InvalidParameter(e.to_string())
    }
}

impl From<InvariantError> for ListError {
    fn from(e: InvariantError) -> Self {
        ListError::InvalidParameter(e.to_string())
    }
}
