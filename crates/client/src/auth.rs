//! Sign-in sessions
//!
//! `POST /auth/verify-password` trades an email and password for a bearer
//! token. The server rejects unknown emails and wrong passwords with
//! distinct `401` messages; [`rejection`] maps them back to typed errors.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Lifetime of a token issued by the server (one day)
pub const TOKEN_LIFETIME_MS: u64 = 24 * 60 * 60 * 1000;

/// Sign-in request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Plain-text password
    pub password: String,
}

/// A successful sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// Account creation time, as the server reports it
    #[serde(default)]
    pub created_at: Option<serde_json::Value>,
    /// Account identifier
    #[serde(default)]
    pub user_id: Option<String>,
    /// Account email
    pub email: String,
    /// Bearer token for subsequent requests
    pub id_token: String,
    /// Token lifetime
    #[serde(default = "default_expiry")]
    pub expires_in_ms: u64,
}

fn default_expiry() -> u64 {
    TOKEN_LIFETIME_MS
}

impl AuthSession {
    /// `Authorization` header value for this session
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.id_token)
    }
}

/// Check sign-in input before it is sent.
///
/// Mirrors the server's `400` responses.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() {
        return Err(ApiError::Status {
            code: 400,
            message: "email is required".to_string(),
        });
    }
    if password.is_empty() {
        return Err(ApiError::Status {
            code: 400,
            message: "password is required".to_string(),
        });
    }
    Ok(())
}

/// Map a `401` sign-in response message to a typed error.
pub fn rejection(email: &str, message: &str) -> ApiError {
    if message.contains("no user exists") {
        ApiError::UnknownEmail {
            email: email.to_string(),
        }
    } else if message.contains("wrong password") {
        ApiError::WrongPassword
    } else {
        ApiError::Status {
            code: 401,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_decodes_server_body() {
        let session: AuthSession = serde_json::from_value(json!({
            "createdAt": "2020-01-01T00:00:00.000Z",
            "userId": "u1",
            "email": "a@b.c",
            "idToken": "tok",
            "expiresInMs": 86400000
        }))
        .unwrap();
        assert_eq!(session.id_token, "tok");
        assert_eq!(session.bearer(), "Bearer tok");
        assert_eq!(session.expires_in_ms, TOKEN_LIFETIME_MS);
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            rejection("a@b.c", "no user exists with email 'a@b.c'"),
            ApiError::UnknownEmail {
                email: "a@b.c".to_string()
            }
        );
        assert_eq!(rejection("a@b.c", "wrong password"), ApiError::WrongPassword);
        assert!(matches!(
            rejection("a@b.c", "token expired"),
            ApiError::Status { code: 401, .. }
        ));
    }

    #[test]
    fn test_validate_credentials() {
        assert!(validate_credentials("a@b.c", "pw").is_ok());
        assert!(matches!(
            validate_credentials(" ", "pw"),
            Err(ApiError::Status { code: 400, .. })
        ));
        assert!(validate_credentials("a@b.c", "").is_err());
    }
}
