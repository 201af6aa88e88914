//! Authentication module for managing the client session.
//!
//! This module provides:
//! - `TokenStore`: the process-wide access token and signed-in user
//! - `CredentialOperations`: sign-in, sign-up and sign-out
//! - `SessionBootstrapper`: cancellable session recovery at startup
//! - `RefreshCoordinator`: single-flight silent refresh
//! - `RedirectIntentTracker` / `RouteGuard`: replaying navigation after sign-in
//! - `SessionManager`: wires all of the above around one store
//!
//! The long-lived refresh credential is an HTTP-only cookie owned by the
//! server; nothing here reads or persists it.

pub mod bootstrap;
pub mod error;
pub mod manager;
pub mod operations;
pub mod redirect;
pub mod refresh;
pub mod store;

pub use bootstrap::{BootstrapHandle, BootstrapOutcome, SessionBootstrapper};
pub use error::AuthError;
pub use manager::SessionManager;
pub use operations::CredentialOperations;
pub use redirect::{RedirectIntentTracker, RouteDecision, RouteGuard};
pub use refresh::RefreshCoordinator;
pub use store::{LoadingGuard, SessionWatch, TokenStore};
