//! Sign-in, sign-up and sign-out.
//!
//! Each call goes straight to the transport rather than through
//! `ApiClient`: a 401 from the login endpoint means bad credentials, not an
//! expired token, and must never trigger a refresh.

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{error, info, warn};

use super::{AuthError, RedirectIntentTracker, TokenStore};
use crate::api::{ApiRequest, HttpTransport};
use crate::config::Endpoints;
use crate::models::payload::{SignInRequest, SignUpRequest};
use crate::models::{AuthPayload, UserIdentity};

pub struct CredentialOperations {
    transport: Arc<dyn HttpTransport>,
    store: Arc<TokenStore>,
    redirect: Arc<RedirectIntentTracker>,
    endpoints: Endpoints,
}

impl CredentialOperations {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<TokenStore>,
        redirect: Arc<RedirectIntentTracker>,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            transport,
            store,
            redirect,
            endpoints,
        }
    }

    /// Authenticate with email and password. The store is only written on
    /// success.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::missing_field("Email"));
        }
        if password.is_empty() {
            return Err(AuthError::missing_field("Password"));
        }

        let request = ApiRequest::post(&self.endpoints.login).json(&SignInRequest { email, password })?;
        let result = self
            .authenticate(request, StatusCode::OK, "Sign in failed")
            .await;

        match &result {
            Ok(user) => info!(user_id = %user.id, "Sign in successful"),
            Err(e) => error!(error = %e, "Sign in failed"),
        }
        result
    }

    /// Create an account and sign in to it.
    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<UserIdentity, AuthError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(AuthError::missing_field("Name"));
        }
        if email.is_empty() {
            return Err(AuthError::missing_field("Email"));
        }
        if password.is_empty() {
            return Err(AuthError::missing_field("Password"));
        }

        let request = ApiRequest::post(&self.endpoints.register)
            .json(&SignUpRequest { name, email, password })?;
        let result = self
            .authenticate(request, StatusCode::CREATED, "Registration failed")
            .await;

        match &result {
            Ok(user) => info!(user_id = %user.id, "Registration successful"),
            Err(e) => error!(error = %e, "Registration failed"),
        }
        result
    }

    /// End the session. The server call is best-effort; local state is
    /// always cleared.
    pub async fn sign_out(&self) {
        let request = ApiRequest::post(&self.endpoints.logout).with_bearer(self.store.access_token());

        match self.transport.execute(&request).await {
            Ok(response) if response.is_success() => {}
            Ok(response) => warn!(status = response.status.as_u16(), "Logout rejected by server"),
            Err(e) => warn!(error = %e, "Logout request failed"),
        }

        self.store.clear();
        self.redirect.clear();
        info!("Signed out");
    }

    async fn authenticate(
        &self,
        request: ApiRequest,
        expected: StatusCode,
        fallback: &str,
    ) -> Result<UserIdentity, AuthError> {
        let _loading = self.store.begin_loading();

        let response = self.transport.execute(&request).await?;
        if response.status != expected {
            return Err(AuthError::from_failure(response.status, &response.body, fallback));
        }

        let payload: AuthPayload = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        self.store.set(payload.user.clone(), payload.access_token);
        Ok(payload.user)
    }
}
