//! Unified error handling for the CLI.

use crate::config::ConfigError;
use gymlog_store::Error as StoreError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Log the error and return the message shown to the user.
    pub fn report(&self) -> String {
        match self {
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                storage_message(e)
            }
            AppError::Config(e) => e.to_string(),
            AppError::Csv(e) => {
                tracing::error!("CSV error: {:?}", e);
                format!("Export failed: {}", e)
            }
            AppError::Json(e) => format!("Invalid JSON: {}", e),
            AppError::Io(e) => {
                tracing::error!("I/O error: {:?}", e);
                e.to_string()
            }
            AppError::BadRequest(msg) | AppError::NotFound(msg) => msg.clone(),
        }
    }
}

fn storage_message(err: &StoreError) -> String {
    match err {
        StoreError::NoValidBackup(collection) => format!(
            "Data for '{}' is corrupted and no valid backup is available",
            collection
        ),
        StoreError::Persistence {
            operation,
            attempts,
            source,
        } => format!(
            "Could not complete {} after {} attempts: {}",
            operation, attempts, source
        ),
        StoreError::InvalidSnapshot(reason) => format!("Import rejected: {}", reason),
        other => other.to_string(),
    }
}

/// Result type alias for the CLI.
pub type Result<T> = std::result::Result<T, AppError>;
