use serde::{Deserialize, Serialize};

use super::UserIdentity;

/// Success body of the login and register endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub user: UserIdentity,
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

/// Success body of the silent refresh endpoint. Some deployments only
/// rotate the token and leave `user` out.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshPayload {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(default)]
    pub user: Option<UserIdentity>,
}

/// Failure body of the auth endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Extract the server-supplied message, if the body carries one
    pub fn message_from(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignUpRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_payload_without_user() {
        let payload: RefreshPayload =
            serde_json::from_str(r#"{"accessToken":"tok2"}"#).expect("Failed to parse refresh JSON");
        assert_eq!(payload.access_token, "tok2");
        assert!(payload.user.is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            ErrorBody::message_from(r#"{"message":"Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(ErrorBody::message_from(r#"{"message":"  "}"#), None);
        assert_eq!(ErrorBody::message_from("<html>Bad Gateway</html>"), None);
        assert_eq!(ErrorBody::message_from(""), None);
    }
}
