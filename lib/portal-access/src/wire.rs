//! Backend response parsing.
//!
//! The member API is loose about its shapes: the login body may or may not
//! sit under a `data` envelope, ids arrive as numbers or strings, and a
//! membership's role can be an object or a bare code. Everything is read into
//! raw structs here and converted into typed values, or rejected with a
//! `WireError`. Nothing partially shaped leaves this module.

use serde::Deserialize;
use seed_portal_core::{OrganizationId, UserId};
use std::fmt;

use crate::backend::LoginGrant;
use crate::organization::{MemberRole, Organization};
use crate::session::BearerToken;
use crate::user::PortalUser;

/// A backend body that could not be turned into typed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WireError {
    pub(crate) reason: String,
}

impl WireError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for WireError {}

/// A scalar the backend sends either as a number or as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Number(i64),
    Text(String),
}

impl RawScalar {
    fn into_string(self) -> Option<String> {
        let value = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        };
        (!value.is_empty()).then_some(value)
    }
}

/// A flag the backend sends as a bool, `0`/`1` or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawFlag {
    fn is_set(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "y" | "t"
            ),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawMember {
    #[serde(default)]
    id: Option<RawScalar>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<RawScalar>,
    #[serde(default)]
    schools: Option<Vec<RawMembership>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLoginBody {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default, alias = "member")]
    user: Option<RawMember>,
    #[serde(default, alias = "schools")]
    memberships: Option<Vec<RawMembership>>,
}

#[derive(Debug, Deserialize)]
struct RawLoginResponse {
    #[serde(default)]
    data: Option<RawLoginBody>,
    #[serde(flatten)]
    top: RawLoginBody,
}

#[derive(Debug, Default, Deserialize)]
struct RawCompany {
    #[serde(default)]
    company_id: Option<RawScalar>,
    #[serde(default)]
    entity_id: Option<RawScalar>,
    #[serde(default)]
    organization_name: Option<String>,
    #[serde(default)]
    member_type: Option<String>,
    #[serde(default)]
    member_type_label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRole {
    Record {
        #[serde(default)]
        role: Option<String>,
        #[serde(default)]
        role_name: Option<String>,
    },
    Code(String),
}

#[derive(Debug, Default, Deserialize)]
struct RawCountry {
    #[serde(default)]
    country_name: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMembership {
    #[serde(default)]
    id: Option<RawScalar>,
    #[serde(default)]
    mapping_id: Option<RawScalar>,
    #[serde(default)]
    entity_id: Option<RawScalar>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    company: Option<RawCompany>,
    #[serde(default)]
    role: Option<RawRole>,
    #[serde(default)]
    role_name: Option<String>,
    #[serde(default)]
    country: Option<RawCountry>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    is_primary: Option<RawFlag>,
}

#[derive(Debug, Deserialize)]
struct RawMembersResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    data: Option<Vec<RawMembership>>,
    #[serde(default)]
    message: Option<String>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawProfileResponse {
    #[serde(default)]
    data: Option<RawMember>,
    #[serde(flatten)]
    top: RawMember,
}

#[derive(Debug, Default, Deserialize)]
struct RawErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RawMembership {
    fn into_organization(self) -> Result<Organization, WireError> {
        let company = self.company.unwrap_or_default();

        let raw_id = company
            .company_id
            .and_then(RawScalar::into_string)
            .or_else(|| self.id.and_then(RawScalar::into_string))
            .ok_or_else(|| WireError::new("membership has no school id"))?;
        let id = OrganizationId::new(raw_id).map_err(|e| WireError::new(e.to_string()))?;

        let display_name = non_blank(company.organization_name)
            .or_else(|| non_blank(self.name))
            .unwrap_or_else(|| "Unknown School".to_string());

        let (role_code, role_label) = match self.role {
            Some(RawRole::Record { role, role_name }) => (non_blank(role), non_blank(role_name)),
            Some(RawRole::Code(code)) => (non_blank(Some(code)), None),
            None => (None, None),
        };
        let fallback = MemberRole::member();
        let role = MemberRole::new(
            role_code
                .or_else(|| non_blank(company.member_type))
                .unwrap_or_else(|| fallback.code().to_string()),
            role_label
                .or_else(|| non_blank(self.role_name))
                .or_else(|| non_blank(company.member_type_label))
                .unwrap_or_else(|| fallback.label().to_string()),
        );

        let country = self.country.unwrap_or_default();
        let country_code = non_blank(country.country_code)
            .or_else(|| non_blank(self.country_code))
            .unwrap_or_default();
        let country_name = non_blank(country.country_name).unwrap_or_default();

        let entity_id = company
            .entity_id
            .and_then(RawScalar::into_string)
            .or_else(|| self.entity_id.and_then(RawScalar::into_string));

        Ok(Organization::new(id, display_name)
            .with_role(role)
            .with_country(country_code, country_name)
            .with_primary(self.is_primary.is_some_and(|flag| flag.is_set()))
            .with_backend_refs(self.mapping_id.and_then(RawScalar::into_string), entity_id))
    }
}

fn parse_memberships(raw: Vec<RawMembership>) -> Result<Vec<Organization>, WireError> {
    let mut organizations: Vec<Organization> = Vec::with_capacity(raw.len());
    for membership in raw {
        let organization = membership.into_organization()?;
        // Several mappings can point at the same school.
        if !organizations.iter().any(|o| o.id() == organization.id()) {
            organizations.push(organization);
        }
    }
    Ok(organizations)
}

impl RawMember {
    /// Builds the member record. `fallback_email` covers login responses
    /// that omit the email the member just typed.
    fn into_user(self, fallback_email: Option<&str>) -> Result<PortalUser, WireError> {
        let email = non_blank(self.email)
            .or_else(|| fallback_email.map(str::to_string))
            .ok_or_else(|| WireError::new("member record has no email"))?;
        let raw_id = self
            .id
            .and_then(RawScalar::into_string)
            .unwrap_or_else(|| email.clone());
        let id = UserId::new(raw_id).map_err(|e| WireError::new(e.to_string()))?;

        Ok(PortalUser::new(id, email)
            .with_display_name(non_blank(self.full_name).or_else(|| non_blank(self.name)))
            .with_phone(self.phone.and_then(RawScalar::into_string)))
    }
}

/// Parses a successful credential exchange body.
pub(crate) fn parse_login(body: &str, email: &str) -> Result<LoginGrant, WireError> {
    let raw: RawLoginResponse =
        serde_json::from_str(body).map_err(|e| WireError::new(format!("invalid JSON: {e}")))?;
    let mut data = raw.data.unwrap_or_default();
    let mut top = raw.top;

    let token = non_blank(data.access_token.take())
        .or_else(|| non_blank(top.access_token.take()))
        .or_else(|| non_blank(data.token.take()))
        .or_else(|| non_blank(top.token.take()))
        .ok_or_else(|| WireError::new("login response has no access token"))?;

    let mut member = data.user.take().or_else(|| top.user.take()).unwrap_or_default();
    let inline = data
        .memberships
        .take()
        .or_else(|| top.memberships.take())
        .or_else(|| member.schools.take());
    let organizations = inline.map(parse_memberships).transpose()?;
    let user = member.into_user(Some(email))?;

    Ok(LoginGrant {
        token: BearerToken::new(token),
        user,
        organizations,
    })
}

/// Parses a members-by-email body.
pub(crate) fn parse_members(body: &str) -> Result<Vec<Organization>, WireError> {
    let raw: RawMembersResponse =
        serde_json::from_str(body).map_err(|e| WireError::new(format!("invalid JSON: {e}")))?;
    if !raw.success {
        return Err(WireError::new(
            raw.message
                .unwrap_or_else(|| "backend reported failure".to_string()),
        ));
    }
    parse_memberships(raw.data.unwrap_or_default())
}

/// Parses a profile body.
pub(crate) fn parse_profile(body: &str) -> Result<PortalUser, WireError> {
    let raw: RawProfileResponse =
        serde_json::from_str(body).map_err(|e| WireError::new(format!("invalid JSON: {e}")))?;
    raw.data.unwrap_or(raw.top).into_user(None)
}

/// Extracts a human-readable message from an error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let raw: RawErrorBody = serde_json::from_str(body).ok()?;
    non_blank(raw.message).or_else(|| non_blank(raw.error))
}
