//! Silent refresh against the server-held cookie.
//!
//! `RefreshCoordinator` is single-flight: the first caller starts a refresh
//! task, and every caller that arrives while it is unresolved awaits the
//! same result. The task is spawned, so it completes (and writes the store)
//! even if every waiter goes away, and it releases the in-flight slot itself
//! when it ends.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use super::{AuthError, TokenStore};
use crate::api::{ApiRequest, HttpTransport};
use crate::models::{ErrorBody, RefreshPayload};

type SharedRefresh = Shared<BoxFuture<'static, Result<String, AuthError>>>;

#[derive(Default)]
struct FlightSlot {
    /// Bumped each time a refresh task is started
    generation: u64,
    flight: Option<SharedRefresh>,
}

/// Empties the slot when the refresh task that owns `generation` ends,
/// whether it returns or panics.
struct SlotRelease {
    slot: Arc<Mutex<FlightSlot>>,
    generation: u64,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.generation == self.generation {
            slot.flight = None;
        }
    }
}

/// Issue one refresh call. The body is empty; the transport carries the
/// refresh cookie.
pub(crate) async fn request_refresh(
    transport: &dyn HttpTransport,
    path: &str,
) -> Result<RefreshPayload, AuthError> {
    let response = transport.execute(&ApiRequest::post(path)).await?;

    if !response.is_success() {
        let message = ErrorBody::message_from(&response.body)
            .unwrap_or_else(|| format!("refresh rejected with status {}", response.status.as_u16()));
        return Err(AuthError::RefreshFailed(message));
    }

    response
        .json::<RefreshPayload>()
        .map_err(|e| AuthError::InvalidResponse(format!("refresh body: {}", e)))
}

pub struct RefreshCoordinator {
    transport: Arc<dyn HttpTransport>,
    store: Arc<TokenStore>,
    path: String,
    in_flight: Arc<Mutex<FlightSlot>>,
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<dyn HttpTransport>, store: Arc<TokenStore>, path: impl Into<String>) -> Self {
        Self {
            transport,
            store,
            path: path.into(),
            in_flight: Arc::new(Mutex::new(FlightSlot::default())),
        }
    }

    /// Refresh the access token, joining a refresh already in flight.
    /// Returns the new token, which is already in the store.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let flight = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.flight.as_ref() {
                Some(flight) => {
                    debug!("Joining in-flight token refresh");
                    flight.clone()
                }
                None => {
                    slot.generation += 1;
                    let flight = self.start(slot.generation);
                    slot.flight = Some(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flight
            .is_some()
    }

    /// Spawn the refresh task. Called with the slot locked, so the task
    /// cannot release the slot before `generation`'s flight is stored.
    fn start(&self, generation: u64) -> SharedRefresh {
        let transport = Arc::clone(&self.transport);
        let store = Arc::clone(&self.store);
        let path = self.path.clone();
        let slot = Arc::clone(&self.in_flight);

        let task = tokio::spawn(async move {
            let _release = SlotRelease { slot, generation };
            let _loading = store.begin_loading();
            info!("Refreshing access token");

            let payload = match request_refresh(transport.as_ref(), &path).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "Token refresh failed");
                    return Err(e);
                }
            };

            match payload.user {
                Some(user) => store.set(user, payload.access_token.clone()),
                None => {
                    if !store.replace_token(payload.access_token.clone()) {
                        warn!("Refreshed token arrived with no signed-in user; store left unchanged");
                    }
                }
            }
            Ok(payload.access_token)
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(AuthError::RefreshFailed(format!("refresh task failed: {}", e))))
        }
        .boxed()
        .shared()
    }
}
