//! Error hierarchy for Tessera.

use thiserror::Error;

/// Errors raised by an external model collaborator (generation, speech
/// recognition, captioning, OCR, synthesis).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Server overloaded")]
    Overloaded,

    #[error("Server error: {status} {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{name} is unavailable: {message}")]
    Unavailable { name: String, message: String },

    #[error("{name} failed: {message}")]
    Failed { name: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollaboratorError {
    /// Whether another attempt at the same request might succeed.
    ///
    /// Rate limits, overload, 5xx responses and transport failures are
    /// transient. A response that parsed but made no sense, a missing local
    /// tool or a rejected input fails the same way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            CollaboratorError::RateLimited { .. }
            | CollaboratorError::Overloaded
            | CollaboratorError::Network(_)
            | CollaboratorError::Timeout => true,
            CollaboratorError::Server { status, .. } => *status >= 500,
            CollaboratorError::Auth { .. }
            | CollaboratorError::BadRequest { .. }
            | CollaboratorError::InvalidResponse(_)
            | CollaboratorError::Unavailable { .. }
            | CollaboratorError::Failed { .. }
            | CollaboratorError::Io(_) => false,
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Config file not found: {path}")]
    NotFound { path: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
