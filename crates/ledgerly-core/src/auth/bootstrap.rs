//! Startup session recovery.
//!
//! A silent refresh at startup turns the server-held cookie back into an
//! access token. Each `start()` takes a new epoch and notes the store's
//! write generation. A run only writes the store if its epoch is still
//! current and no sign-in, sign-out or refresh has written the store since
//! it started.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::refresh::request_refresh;
use super::{AuthError, TokenStore};
use crate::api::HttpTransport;
use crate::models::UserIdentity;

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    Restored(UserIdentity),
    Unauthenticated,
    Cancelled,
    /// A credential write landed while the run was in flight and was kept
    Superseded,
}

pub struct SessionBootstrapper {
    transport: Arc<dyn HttpTransport>,
    store: Arc<TokenStore>,
    refresh_path: String,
    epoch: Arc<AtomicU64>,
}

impl SessionBootstrapper {
    pub fn new(transport: Arc<dyn HttpTransport>, store: Arc<TokenStore>, refresh_path: impl Into<String>) -> Self {
        Self {
            transport,
            store,
            refresh_path: refresh_path.into(),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start recovering the session in the background. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) -> BootstrapHandle {
        let ticket = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.store.write_generation();

        let loading = self.store.begin_loading();
        self.store.finish_startup();

        let transport = Arc::clone(&self.transport);
        let store = Arc::clone(&self.store);
        let epoch = Arc::clone(&self.epoch);
        let path = self.refresh_path.clone();

        let task = tokio::spawn(async move {
            let _loading = loading;
            let is_current = || epoch.load(Ordering::SeqCst) == ticket;

            let restored = request_refresh(transport.as_ref(), &path)
                .await
                .and_then(|payload| match payload.user {
                    Some(user) => Ok((user, payload.access_token)),
                    None => Err(AuthError::InvalidResponse("refresh response has no user".to_string())),
                });

            let written = match &restored {
                Ok((user, token)) => store.set_if(generation, is_current, user.clone(), token.clone()),
                Err(_) => store.clear_if(generation, is_current),
            };

            match restored {
                Ok((user, _)) if written => {
                    info!(user_id = %user.id, "Session restored");
                    BootstrapOutcome::Restored(user)
                }
                Err(e) if written => {
                    info!(error = %e, "No session to restore");
                    BootstrapOutcome::Unauthenticated
                }
                _ if epoch.load(Ordering::SeqCst) != ticket => {
                    debug!(ticket, "Discarding stale bootstrap result");
                    BootstrapOutcome::Cancelled
                }
                _ => {
                    debug!(ticket, "Store written during bootstrap; keeping that session");
                    BootstrapOutcome::Superseded
                }
            }
        });

        BootstrapHandle {
            task: Some(task),
            epoch: Arc::clone(&self.epoch),
            ticket,
        }
    }
}

/// Owner of an in-flight bootstrap. Dropping it cancels the run.
pub struct BootstrapHandle {
    task: Option<JoinHandle<BootstrapOutcome>>,
    epoch: Arc<AtomicU64>,
    ticket: u64,
}

impl BootstrapHandle {
    /// Abort the request and discard whatever it would have produced
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = self
                .epoch
                .compare_exchange(self.ticket, self.ticket + 1, Ordering::SeqCst, Ordering::SeqCst);
            task.abort();
            debug!(ticket = self.ticket, "Bootstrap cancelled");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }

    /// Wait for the run to finish. Dropping the returned future drops the
    /// handle with it, which cancels the run.
    pub async fn wait(mut self) -> BootstrapOutcome {
        let Some(task) = self.task.as_mut() else {
            return BootstrapOutcome::Cancelled;
        };
        let result = task.await;
        self.task = None;

        match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => BootstrapOutcome::Cancelled,
            Err(e) => {
                error!(error = %e, "Bootstrap task failed");
                BootstrapOutcome::Cancelled
            }
        }
    }
}

impl Drop for BootstrapHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
