//! Auth collaborator seam.
//!
//! Session management lives with the external auth backend; the core only
//! asks it who is signed in and refuses to act for nobody.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an authenticated user, as issued by the auth backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Supplies the currently signed-in user.
pub trait AuthProvider {
    /// `None` when nobody is signed in.
    fn current_user(&self) -> Option<UserId>;
}

/// Fixed identity, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    user: Option<UserId>,
}

impl StaticAuth {
    pub fn signed_in(user: UserId) -> Self {
        Self { user: Some(user) }
    }

    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

impl AuthProvider for StaticAuth {
    fn current_user(&self) -> Option<UserId> {
        self.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parses_and_displays() {
        let raw = "6f1c2b1e-3a4d-4c5e-8f90-1a2b3c4d5e6f";
        let id: UserId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn user_id_rejects_garbage() {
        assert!("not-a-user".parse::<UserId>().is_err());
    }

    #[test]
    fn user_id_serializes_as_plain_uuid() {
        let id = UserId::new(Uuid::nil());
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"00000000-0000-0000-0000-000000000000\""
        );
    }

    #[test]
    fn static_auth_reports_user() {
        let id = UserId::new(Uuid::new_v4());
        assert_eq!(StaticAuth::signed_in(id).current_user(), Some(id));
        assert_eq!(StaticAuth::signed_out().current_user(), None);
    }
}
