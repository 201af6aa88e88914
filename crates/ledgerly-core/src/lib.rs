//! Session and token lifecycle for the Ledgerly client.
//!
//! `SessionManager` is the entry point: build it once at startup, run
//! `bootstrap()`, and send every API call through `client()`.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse, HttpTransport, ReqwestTransport, TransportError};
pub use auth::{AuthError, BootstrapOutcome, RouteDecision, SessionManager};
pub use config::Config;
pub use models::{Session, UserIdentity};
