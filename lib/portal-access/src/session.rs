//! Session state for a signed-in member.
//!
//! A session pairs the member identity with the bearer token the backend
//! issued at sign-in. It is created by a successful credential exchange or
//! restored from storage at startup, and dropped on sign-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use seed_portal_core::UserId;

use crate::user::PortalUser;

/// Bearer token issued by the portal backend.
///
/// The token is opaque. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self(token)
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the value for an `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: PortalUser,
    token: BearerToken,
    signed_in_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session that starts now.
    #[must_use]
    pub fn new(user: PortalUser, token: BearerToken) -> Self {
        Self::restore(user, token, Utc::now())
    }

    /// Recreates a session read back from storage.
    #[must_use]
    pub fn restore(user: PortalUser, token: BearerToken, signed_in_at: DateTime<Utc>) -> Self {
        Self {
            user,
            token,
            signed_in_at,
        }
    }

    /// Returns the signed-in member.
    #[must_use]
    pub fn user(&self) -> &PortalUser {
        &self.user
    }

    /// Returns the member ID.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        self.user.id()
    }

    /// Returns the bearer token.
    #[must_use]
    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    /// Returns when the member signed in.
    #[must_use]
    pub fn signed_in_at(&self) -> DateTime<Utc> {
        self.signed_in_at
    }
}
