//! Schools a member can act on behalf of.
//!
//! Organizations are a read-only projection of the backend's membership
//! list. They carry the member's role at that school, which the dashboard
//! shows next to the school name.

use serde::{Deserialize, Serialize};
use seed_portal_core::OrganizationId;

/// The member's role at a school.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRole {
    /// Machine-readable role code (e.g., "admin", "member").
    code: String,
    /// Human-readable label (e.g., "School Admin").
    label: String,
}

impl MemberRole {
    /// Creates a role from its code and label.
    #[must_use]
    pub fn new(code: String, label: String) -> Self {
        Self { code, label }
    }

    /// The role given to memberships that carry no role information.
    #[must_use]
    pub fn member() -> Self {
        Self::new("member".to_string(), "Member".to_string())
    }

    /// Returns the role code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the role label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for MemberRole {
    fn default() -> Self {
        Self::member()
    }
}

/// A school the signed-in member belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    id: OrganizationId,
    display_name: String,
    role: MemberRole,
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    country_name: String,
    #[serde(default)]
    is_primary: bool,
    /// Membership mapping row in the backend, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mapping_id: Option<String>,
    /// Backend entity reference for the school, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entity_id: Option<String>,
}

impl Organization {
    /// Creates a non-primary membership with the default member role.
    #[must_use]
    pub fn new(id: OrganizationId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            role: MemberRole::member(),
            country_code: String::new(),
            country_name: String::new(),
            is_primary: false,
            mapping_id: None,
            entity_id: None,
        }
    }

    /// Sets the member's role at this school.
    #[must_use]
    pub fn with_role(mut self, role: MemberRole) -> Self {
        self.role = role;
        self
    }

    /// Sets the country code and name.
    #[must_use]
    pub fn with_country(mut self, code: String, name: String) -> Self {
        self.country_code = code;
        self.country_name = name;
        self
    }

    /// Marks this school as the member's primary school.
    #[must_use]
    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    /// Sets the backend mapping and entity references.
    #[must_use]
    pub fn with_backend_refs(mut self, mapping_id: Option<String>, entity_id: Option<String>) -> Self {
        self.mapping_id = mapping_id;
        self.entity_id = entity_id;
        self
    }

    /// Returns the school ID.
    #[must_use]
    pub fn id(&self) -> &OrganizationId {
        &self.id
    }

    /// Returns the school name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the member's role at this school.
    #[must_use]
    pub fn role(&self) -> &MemberRole {
        &self.role
    }

    /// Returns the ISO country code, empty when unknown.
    #[must_use]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Returns the country name, empty when unknown.
    #[must_use]
    pub fn country_name(&self) -> &str {
        &self.country_name
    }

    /// Returns true if this is the member's primary school.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Returns the backend membership mapping ID.
    #[must_use]
    pub fn mapping_id(&self) -> Option<&str> {
        self.mapping_id.as_deref()
    }

    /// Returns the backend entity ID.
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }
}
