//! Portal member identity.
//!
//! A `PortalUser` is the identity half of a session: who signed in, without
//! any credential material. It is what gets written to the `portal_user`
//! storage key.

use serde::{Deserialize, Serialize};
use seed_portal_core::UserId;

/// The signed-in portal member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalUser {
    /// Member ID as issued by the portal backend.
    id: UserId,
    /// Email address used to sign in.
    email: String,
    /// Name shown in the dashboard header.
    display_name: String,
    /// Contact phone number, if the backend supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
}

impl PortalUser {
    /// Creates a user whose display name defaults to the email's local part.
    #[must_use]
    pub fn new(id: UserId, email: String) -> Self {
        let display_name = fallback_display_name(&email);
        Self {
            id,
            email,
            display_name,
            phone: None,
        }
    }

    /// Sets the display name. Blank names keep the fallback.
    #[must_use]
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        if let Some(name) = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            self.display_name = name;
        }
        self
    }

    /// Sets the phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = phone;
        self
    }

    /// Returns the member ID.
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the phone number, if known.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
}

fn fallback_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
