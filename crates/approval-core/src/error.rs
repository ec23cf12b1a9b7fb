//! Error types for the approval engine

use thiserror::Error;

/// Main error type for all approval engine operations
#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("approval configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Result type for approval engine operations
pub type Result<T> = std::result::Result<T, ApprovalError>;
