//! Data models for the session layer.
//!
//! This module contains:
//!
//! - `UserIdentity`, `BusinessDefaults`: the authenticated account
//! - `Session`: the process-wide snapshot handed to consumers
//! - Wire payloads for the login, register and refresh endpoints

pub mod payload;
pub mod session;
pub mod user;

pub use payload::{AuthPayload, ErrorBody, RefreshPayload};
pub use session::Session;
pub use user::{BusinessDefaults, UserIdentity};
