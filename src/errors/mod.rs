use std::io::Error as IoError;

use thiserror::Error;

pub mod config;
pub mod service;
pub mod store;

pub use config::ConfigError;
pub use service::ServiceError;
pub use store::StoreError;

/// Startup and hosting failures. Request-level failures are [`ServiceError`]s.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Server error: {0}")]
    Server(#[from] IoError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Logger error: {0}")]
    Logger(String),
    #[error("Store error: {0}")]
    Store(String),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e.to_string())
    }
}
