use serde_json::{json, Value};
use thiserror::Error;

use super::StoreError;

/// Errors returned by the short link operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required input is missing
    #[error("{0}")]
    Validation(String),

    /// The requested short code is already taken
    #[error("{0}")]
    Conflict(String),

    /// The short code does not exist
    #[error("{0}")]
    NotFound(String),

    /// Unexpected failure that did not come from the store
    #[error("{0}")]
    Internal(String),

    /// The record store failed; `message` is what the client sees
    #[error("{message}")]
    Store {
        message: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ServiceError {
    pub fn store(message: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| {
            log::error!("{}: {}", message, source);
            ServiceError::Store { message, source }
        }
    }

    /// HTTP status for this error. Conflicts answer 400, not 409.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) | ServiceError::Conflict(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Internal(_) | ServiceError::Store { .. } => 500,
        }
    }

    pub fn body(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Each field carries a single client-facing message
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.clone())
            .map(|m| m.into_owned())
            .unwrap_or_else(|| "Invalid request".to_string());
        ServiceError::Validation(message)
    }
}
