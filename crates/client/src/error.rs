//! Persistence API errors
//!
//! Failures are classified once, at the transport boundary, so callers can
//! tell an unreachable server from a rejected request or a bad sign-in.

use thiserror::Error;

/// Result type for persistence API calls
pub type Result<T> = std::result::Result<T, ApiError>;

/// The generic notice shown for any failed sign-in
pub const SIGN_IN_FAILED: &str = "Sign in failed";

/// Errors that can occur when calling the persistence API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("request failed with status {code}: {message}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Server-provided message, or the raw body
        message: String,
    },

    /// Sign-in named an email with no account
    #[error("no user exists with email '{email}'")]
    UnknownEmail {
        /// The email that was tried
        email: String,
    },

    /// Sign-in used a wrong password
    #[error("wrong password")]
    WrongPassword,

    /// A response body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// The entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `dataset`
        kind: &'static str,
        /// Requested identifier
        id: String,
    },
}

impl ApiError {
    /// Whether this is a rejected sign-in
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ApiError::UnknownEmail { .. }
                | ApiError::WrongPassword
                | ApiError::Status { code: 401, .. }
        )
    }

    /// Message suitable for a transient user notification.
    ///
    /// Sign-in failures collapse to [`SIGN_IN_FAILED`].
    pub fn user_notice(&self) -> String {
        if self.is_auth_failure() {
            SIGN_IN_FAILED.to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Parse(e.to_string())
    }
}
