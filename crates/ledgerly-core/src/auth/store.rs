//! Process-wide holder of the access token and the signed-in user.
//!
//! The store is a `watch` channel underneath: every write is synchronous and
//! serialized by the channel's lock, and consumers can subscribe to
//! transitions instead of polling. It knows nothing about HTTP.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::models::{Session, UserIdentity};

#[derive(Debug, Clone, Default)]
struct StoreState {
    access_token: Option<String>,
    user: Option<UserIdentity>,
    authenticated_at: Option<DateTime<Utc>>,
    /// Live `LoadingGuard`s
    pending: u32,
    /// True until the first bootstrap takes over the startup loading state
    awaiting_bootstrap: bool,
    /// Bumped by every credential write; loading changes leave it alone
    generation: u64,
}

impl StoreState {
    fn to_session(&self) -> Session {
        Session {
            access_token: self.access_token.clone(),
            user: self.user.clone(),
            loading: self.awaiting_bootstrap || self.pending > 0,
            redirect_path: None,
            authenticated_at: self.authenticated_at,
        }
    }

    fn populate(&mut self, user: UserIdentity, access_token: String) {
        self.user = Some(user);
        self.access_token = Some(access_token);
        self.authenticated_at = Some(Utc::now());
        self.generation += 1;
    }

    /// Drop the credential. Counts as a write even when nothing was held,
    /// so a sign-out outranks a bootstrap that started before it.
    fn reset(&mut self) -> bool {
        let had_session = self.user.is_some() || self.access_token.is_some();
        self.user = None;
        self.access_token = None;
        self.authenticated_at = None;
        self.generation += 1;
        had_session
    }
}

pub struct TokenStore {
    state: watch::Sender<StoreState>,
}

impl TokenStore {
    /// A fresh, unauthenticated store. `loading` stays true until a
    /// bootstrap runs.
    pub fn new() -> Self {
        let (state, _) = watch::channel(StoreState {
            awaiting_bootstrap: true,
            ..StoreState::default()
        });
        Self { state }
    }

    /// Snapshot of the current session (without redirect intent)
    pub fn get(&self) -> Session {
        self.state.borrow().to_session()
    }

    /// Store a freshly issued credential together with its user
    pub fn set(&self, user: UserIdentity, access_token: String) {
        debug!(user_id = %user.id, "Session populated");
        self.state.send_modify(|s| s.populate(user, access_token));
    }

    pub fn clear(&self) {
        self.state.send_if_modified(|s| {
            let cleared = s.reset();
            if cleared {
                debug!("Session cleared");
            }
            cleared
        });
    }

    /// Swap the access token while keeping the current user. Skipped (and
    /// `false` returned) when no user is held, since a token without a user
    /// is never a valid state.
    pub fn replace_token(&self, access_token: String) -> bool {
        self.state.send_if_modified(|s| {
            if s.user.is_none() {
                return false;
            }
            s.access_token = Some(access_token);
            s.authenticated_at = Some(Utc::now());
            s.generation += 1;
            true
        })
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.state.borrow();
        state.user.is_some() && state.access_token.is_some()
    }

    /// Mark a credential operation as in flight until the guard drops
    pub fn begin_loading(self: &Arc<Self>) -> LoadingGuard {
        self.state.send_modify(|s| s.pending += 1);
        LoadingGuard {
            store: Arc::clone(self),
        }
    }

    /// Hand the startup loading state over to a running bootstrap
    pub(crate) fn finish_startup(&self) {
        self.state.send_if_modified(|s| std::mem::replace(&mut s.awaiting_bootstrap, false));
    }

    /// Counter of credential writes, for callers that must not clobber a
    /// write made after they started
    pub(crate) fn write_generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// `set`, applied only if no credential write happened since
    /// `generation` and `is_current` still holds under the write lock
    pub(crate) fn set_if(
        &self,
        generation: u64,
        is_current: impl FnOnce() -> bool,
        user: UserIdentity,
        access_token: String,
    ) -> bool {
        self.state.send_if_modified(|s| {
            if s.generation != generation || !is_current() {
                return false;
            }
            s.populate(user, access_token);
            true
        })
    }

    /// `clear` under the same conditions as `set_if`. Returns whether the
    /// caller was still current.
    pub(crate) fn clear_if(&self, generation: u64, is_current: impl FnOnce() -> bool) -> bool {
        let mut current = false;
        self.state.send_if_modified(|s| {
            current = s.generation == generation && is_current();
            current && s.reset()
        });
        current
    }

    pub fn subscribe(&self) -> SessionWatch {
        SessionWatch {
            rx: self.state.subscribe(),
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps `Session::loading` true while alive.
pub struct LoadingGuard {
    store: Arc<TokenStore>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.store
            .state
            .send_modify(|s| s.pending = s.pending.saturating_sub(1));
    }
}

/// Receiver side of the store for consumers that react to transitions.
pub struct SessionWatch {
    rx: watch::Receiver<StoreState>,
}

impl SessionWatch {
    pub fn current(&self) -> Session {
        self.rx.borrow().to_session()
    }

    /// Wait for the next write. Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Session> {
        self.rx.changed().await.ok()?;
        let session = self.rx.borrow_and_update().to_session();
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::USER_U1;

    fn user() -> UserIdentity {
        serde_json::from_str(USER_U1).expect("Failed to parse user")
    }

    fn assert_paired(session: &Session) {
        assert_eq!(session.user.is_some(), session.access_token.is_some());
    }

    #[test]
    fn test_new_store_is_loading_and_empty() {
        let store = TokenStore::new();
        let session = store.get();
        assert!(session.loading);
        assert!(session.user.is_none());
        assert!(session.access_token.is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_set_and_clear_keep_token_and_user_paired() {
        let store = TokenStore::new();
        store.set(user(), "tok1".to_string());
        let session = store.get();
        assert_paired(&session);
        assert_eq!(session.access_token.as_deref(), Some("tok1"));
        assert_eq!(session.user.as_ref().map(|u| u.id.as_str()), Some("u1"));
        assert!(session.authenticated_at.is_some());

        store.clear();
        let session = store.get();
        assert_paired(&session);
        assert!(session.user.is_none());
        assert!(session.authenticated_at.is_none());
    }

    #[test]
    fn test_replace_token_requires_a_user() {
        let store = TokenStore::new();
        assert!(!store.replace_token("orphan".to_string()));
        assert!(store.access_token().is_none());

        store.set(user(), "tok1".to_string());
        assert!(store.replace_token("tok2".to_string()));
        assert_eq!(store.access_token().as_deref(), Some("tok2"));
        assert_eq!(store.get().user.map(|u| u.id), Some("u1".to_string()));
    }

    #[test]
    fn test_loading_guards_nest() {
        let store = Arc::new(TokenStore::new());
        store.finish_startup();
        assert!(!store.get().loading);

        let outer = store.begin_loading();
        let inner = store.begin_loading();
        drop(inner);
        assert!(store.get().loading);
        drop(outer);
        assert!(!store.get().loading);
    }

    #[test]
    fn test_startup_loading_survives_until_handed_over() {
        let store = Arc::new(TokenStore::new());
        let guard = store.begin_loading();
        store.finish_startup();
        assert!(store.get().loading);
        drop(guard);
        assert!(!store.get().loading);
    }

    #[test]
    fn test_conditional_writes_respect_predicate() {
        let store = TokenStore::new();
        let generation = store.write_generation();
        assert!(!store.set_if(generation, || false, user(), "stale".to_string()));
        assert!(store.access_token().is_none());

        store.set(user(), "tok1".to_string());
        let generation = store.write_generation();
        assert!(!store.clear_if(generation, || false));
        assert!(store.is_authenticated());
        assert!(store.clear_if(generation, || true));
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_conditional_writes_yield_to_later_credential_writes() {
        let store = Arc::new(TokenStore::new());
        let generation = store.write_generation();

        // Loading changes are not credential writes
        drop(store.begin_loading());
        store.finish_startup();
        assert_eq!(store.write_generation(), generation);

        store.set(user(), "tok1".to_string());
        assert!(!store.clear_if(generation, || true));
        assert!(!store.set_if(generation, || true, user(), "stale".to_string()));
        assert_eq!(store.access_token().as_deref(), Some("tok1"));

        // Clearing an already empty store still counts
        store.clear();
        let after_clear = store.write_generation();
        store.clear();
        assert!(store.write_generation() > after_clear);
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let store = TokenStore::new();
        let mut watch = store.subscribe();
        assert!(watch.current().user.is_none());

        store.set(user(), "tok1".to_string());
        let session = watch.changed().await.expect("store dropped");
        assert_eq!(session.access_token.as_deref(), Some("tok1"));
    }
}
