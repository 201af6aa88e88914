use chrono::{DateTime, Utc};
use serde::Serialize;

use super::UserIdentity;

/// Point-in-time view of the authentication state.
///
/// `access_token` and `user` are either both present or both absent; the
/// store only ever writes them together.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub user: Option<UserIdentity>,
    pub loading: bool,
    pub redirect_path: Option<String>,
    /// When the current credential was last issued or refreshed
    pub authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }

    /// Authenticated and no credential operation pending
    pub fn is_ready(&self) -> bool {
        !self.loading && self.is_authenticated()
    }
}
