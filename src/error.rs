//! Error types for Better Bible.
//!
//! Only [`BibleError::Validation`] is meant to reach HTTP callers as a
//! failure. Provider, parse and persistence errors are recovered inside the
//! content pipeline; they exist so the recovery sites can log what happened.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum BibleError {
    /// Missing or empty request fields.
    #[error("{0}")]
    Validation(String),

    /// The LLM call failed (network, quota, non-2xx).
    #[error("Provider error: {0}")]
    Provider(String),

    /// LLM output was not well-formed or not schema-shaped.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Cache store read or write failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BibleError {
    /// True for errors the caller caused and can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, BibleError::Validation(_))
    }
}

impl From<tokio_postgres::Error> for BibleError {
    fn from(err: tokio_postgres::Error) -> Self {
        BibleError::Persistence(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for BibleError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        BibleError::Persistence(format!("connection pool: {}", err))
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, BibleError>;
