//! Remembering where the user was headed before they had to sign in.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::models::Session;

/// One-slot holder for the last destination attempted while signed out.
#[derive(Debug, Default)]
pub struct RedirectIntentTracker {
    slot: Mutex<Option<String>>,
}

impl RedirectIntentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: impl Into<String>) {
        let path = path.into();
        debug!(path = %path, "Recording redirect intent");
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(path);
    }

    /// Take the recorded path, leaving the slot empty
    pub fn consume(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn peek(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Render the target
    Proceed,
    /// Session state is still resolving; show a loading state
    Wait,
    /// Send the user to the given sign-in route
    RedirectToSignIn(String),
}

/// The routing rules consumers apply on every navigation.
pub struct RouteGuard {
    tracker: Arc<RedirectIntentTracker>,
    sign_in_route: String,
    sign_up_route: String,
}

impl RouteGuard {
    pub fn new(
        tracker: Arc<RedirectIntentTracker>,
        sign_in_route: impl Into<String>,
        sign_up_route: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            sign_in_route: sign_in_route.into(),
            sign_up_route: sign_up_route.into(),
        }
    }

    pub fn sign_in_route(&self) -> &str {
        &self.sign_in_route
    }

    /// Decide what to do with a navigation to `target`. Protected targets
    /// reached while signed out are recorded for replay.
    pub fn check(&self, target: &str, session: &Session) -> RouteDecision {
        if session.loading {
            return RouteDecision::Wait;
        }
        if session.user.is_some() || self.is_auth_route(target) {
            return RouteDecision::Proceed;
        }
        self.tracker.record(target);
        RouteDecision::RedirectToSignIn(self.sign_in_route.clone())
    }

    /// Once signed in and settled, hand back the remembered destination
    /// exactly once.
    pub fn replay(&self, session: &Session) -> Option<String> {
        if session.loading || session.user.is_none() {
            return None;
        }
        self.tracker.consume()
    }

    fn is_auth_route(&self, target: &str) -> bool {
        let path = target.split(['?', '#']).next().unwrap_or(target);
        let path = path.trim_end_matches('/');
        path == self.sign_in_route.trim_end_matches('/') || path == self.sign_up_route.trim_end_matches('/')
    }
}
