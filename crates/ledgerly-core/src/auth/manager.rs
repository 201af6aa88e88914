//! Application wiring for the session layer.
//!
//! One `TokenStore` is created here and handed explicitly to every
//! component that reads or writes it. Consumers only ever talk to
//! `SessionManager`.

use std::sync::Arc;

use super::{
    AuthError, BootstrapHandle, CredentialOperations, RedirectIntentTracker, RefreshCoordinator, RouteDecision,
    RouteGuard, SessionBootstrapper, SessionWatch, TokenStore,
};
use crate::api::{ApiClient, HttpTransport, ReqwestTransport, TransportError};
use crate::config::Config;
use crate::models::{Session, UserIdentity};

pub struct SessionManager {
    store: Arc<TokenStore>,
    redirect: Arc<RedirectIntentTracker>,
    credentials: CredentialOperations,
    bootstrapper: SessionBootstrapper,
    client: ApiClient,
    guard: RouteGuard,
}

impl SessionManager {
    /// Build against the real API described by `config`
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.api_base_url.clone(), config.request_timeout())?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: &Config) -> Self {
        let store = Arc::new(TokenStore::new());
        let redirect = Arc::new(RedirectIntentTracker::new());

        let refresher = Arc::new(RefreshCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            config.endpoints.refresh.clone(),
        ));
        let client = ApiClient::new(Arc::clone(&transport), Arc::clone(&store), refresher);
        let bootstrapper = SessionBootstrapper::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            config.endpoints.refresh.clone(),
        );
        let credentials = CredentialOperations::new(
            transport,
            Arc::clone(&store),
            Arc::clone(&redirect),
            config.endpoints.clone(),
        );
        let guard = RouteGuard::new(
            Arc::clone(&redirect),
            config.sign_in_route.clone(),
            config.sign_up_route.clone(),
        );

        Self {
            store,
            redirect,
            credentials,
            bootstrapper,
            client,
            guard,
        }
    }

    /// Current `{user, access_token, loading, redirect_path}`
    pub fn snapshot(&self) -> Session {
        let mut session = self.store.get();
        session.redirect_path = self.redirect.peek();
        session
    }

    pub fn subscribe(&self) -> SessionWatch {
        self.store.subscribe()
    }

    /// Recover the session from the refresh cookie. Keep the handle for as
    /// long as the result is wanted; dropping it cancels the call.
    pub fn bootstrap(&self) -> BootstrapHandle {
        self.bootstrapper.start()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError> {
        self.credentials.sign_in(email, password).await
    }

    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<UserIdentity, AuthError> {
        self.credentials.sign_up(name, email, password).await
    }

    pub async fn sign_out(&self) {
        self.credentials.sign_out().await
    }

    pub fn set_redirect_path(&self, path: impl Into<String>) {
        self.redirect.record(path);
    }

    pub fn take_redirect_path(&self) -> Option<String> {
        self.redirect.consume()
    }

    /// Apply the routing rules to a navigation attempt
    pub fn navigate(&self, target: &str) -> RouteDecision {
        self.guard.check(target, &self.store.get())
    }

    /// Destination to replay now that the user is signed in, if any
    pub fn replay_redirect(&self) -> Option<String> {
        self.guard.replay(&self.store.get())
    }

    pub fn route_guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }
}
