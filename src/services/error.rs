//! Service error type shared by every service

/// Error returned by service operations.
///
/// Each variant maps to one HTTP status in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Authenticated, but not allowed to perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Operation conflicts with current state (duplicates, already resolved)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing, invalid or revoked credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Too many requests; `retry_after_secs` is when the caller may try again
    #[error("Rate limited: {message}")]
    RateLimited { message: String, retry_after_secs: i64 },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Rate-limit error, rounding the wait up to whole seconds
    pub fn rate_limited(message: impl Into<String>, retry_after: chrono::Duration) -> Self {
        let millis = retry_after.num_milliseconds().max(0);
        Self::RateLimited {
            message: message.into(),
            retry_after_secs: ((millis + 999) / 1000).max(1),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
