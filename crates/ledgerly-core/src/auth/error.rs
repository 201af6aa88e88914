use reqwest::StatusCode;
use thiserror::Error;

use crate::api::TransportError;
use crate::models::ErrorBody;

/// Failure of a credential operation or a token refresh.
///
/// `Clone` because a single refresh result is shared by every request that
/// waited on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{message}")]
    Validation { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Session expired: {0}")]
    RefreshFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Classify a non-success response from login or register, preferring
    /// the server's own message over `fallback`.
    pub fn from_failure(status: StatusCode, body: &str, fallback: &str) -> Self {
        let message = ErrorBody::message_from(body).unwrap_or_else(|| fallback.to_string());
        if status.is_server_error() {
            AuthError::Server {
                status: status.as_u16(),
                message,
            }
        } else {
            AuthError::Validation {
                status: status.as_u16(),
                message,
            }
        }
    }

    pub(crate) fn missing_field(field: &str) -> Self {
        AuthError::Validation {
            status: StatusCode::BAD_REQUEST.as_u16(),
            message: format!("{} is required", field),
        }
    }

    /// Inline message for sign-in and sign-up forms
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation { message, .. } => message.clone(),
            AuthError::Network(TransportError::Timeout) => {
                "Connection timed out. Please try again.".to_string()
            }
            AuthError::Network(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            AuthError::Unauthorized | AuthError::RefreshFailed(_) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            AuthError::Server { .. } => "Server is unavailable. Please try again later.".to_string(),
            AuthError::InvalidResponse(_) => "Unexpected response from server.".to_string(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, AuthError::Unauthorized | AuthError::RefreshFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_failure_prefers_server_message() {
        let err = AuthError::from_failure(StatusCode::UNAUTHORIZED, r#"{"message":"Invalid email or password"}"#, "Sign in failed");
        assert_eq!(
            err,
            AuthError::Validation {
                status: 401,
                message: "Invalid email or password".to_string()
            }
        );
        assert_eq!(err.user_message(), "Invalid email or password");
    }

    #[test]
    fn test_from_failure_falls_back() {
        let err = AuthError::from_failure(StatusCode::CONFLICT, "", "Registration failed");
        assert_eq!(err.user_message(), "Registration failed");

        let err = AuthError::from_failure(StatusCode::BAD_GATEWAY, "<html>", "Sign in failed");
        assert!(matches!(err, AuthError::Server { status: 502, .. }));
    }

    #[test]
    fn test_user_messages_for_transport_failures() {
        assert_eq!(
            AuthError::Network(TransportError::Timeout).user_message(),
            "Connection timed out. Please try again."
        );
        assert!(AuthError::Network(TransportError::Connect("refused".into()))
            .user_message()
            .contains("Unable to connect"));
        assert!(AuthError::RefreshFailed("401".into()).is_session_expired());
        assert!(!AuthError::missing_field("Email").is_session_expired());
    }
}
