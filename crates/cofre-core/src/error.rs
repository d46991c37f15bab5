//! Error types for Cofre

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or malformed request field. Maps to HTTP 400.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Entity missing or not visible to the caller. Maps to HTTP 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity exists but belongs to another user. Maps to HTTP 403.
    #[error("Forbidden: {0}")]
    Ownership(String),

    /// Double payment or duplicate resource. Maps to HTTP 409.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Debit would overdraw the source balance. Maps to HTTP 400.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The AI webhook is unreachable or returned a non-2xx response.
    /// Maps to HTTP 502.
    #[error("External service error: {0}")]
    External(String),

    /// The AI webhook did not answer in time. Maps to HTTP 504.
    #[error("External service timeout: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, Error>;
