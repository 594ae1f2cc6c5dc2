//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service.

use crate::config::ConfigError;
use kazusa_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying schema migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The error half of every handler's result.
pub type HttpError = (axum::http::StatusCode, String);

/// Maps a port failure onto a status and message.
///
/// Caller mistakes are reported verbatim. Everything else is logged and
/// replaced with a generic message so storage details never leave the server.
pub fn http_error(err: PortError) -> HttpError {
    use axum::http::StatusCode;

    if !err.is_client_error() {
        tracing::error!("request failed: {}", err);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        );
    }
    match err {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::InvalidFilter(msg) | PortError::MissingPagination(msg) => {
            (StatusCode::BAD_REQUEST, msg)
        }
        other => (StatusCode::BAD_REQUEST, other.to_string()),
    }
}
