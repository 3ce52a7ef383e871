//! The portal backend as seen by the session manager.
//!
//! `PortalBackend` is the seam between session handling and HTTP: the
//! manager only ever sees typed results, and tests swap in an in-memory
//! implementation.

use async_trait::async_trait;
use rootcause::Report;

use crate::error::{BackendError, SignInError, SignUpError};
use crate::organization::Organization;
use crate::session::BearerToken;
use crate::user::PortalUser;

/// Validated login form input.
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// Validates and normalizes login input.
    ///
    /// The email is trimmed and must look like an address; the password must
    /// be non-empty. Anything else is for the backend to judge.
    pub fn new(email: &str, password: &str) -> Result<Self, SignInError> {
        let email = validate_email(email).map_err(|reason| SignInError::InvalidInput {
            field: "email",
            reason,
        })?;
        if password.is_empty() {
            return Err(SignInError::InvalidInput {
                field: "password",
                reason: "Please enter your password".to_string(),
            });
        }
        Ok(Self {
            email,
            password: password.to_string(),
        })
    }

    /// Returns the normalized email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated sign-up form input.
#[derive(Clone)]
pub struct Registration {
    email: String,
    password: String,
    display_name: String,
}

impl Registration {
    /// Validates sign-up input.
    ///
    /// Same rules as `Credentials`, plus a display name of at least two
    /// characters.
    pub fn new(email: &str, password: &str, display_name: &str) -> Result<Self, SignUpError> {
        let credentials = Credentials::new(email, password).map_err(|e| match e {
            SignInError::InvalidInput { field, reason } => SignUpError::InvalidInput { field, reason },
            other => SignUpError::InvalidInput {
                field: "form",
                reason: other.to_string(),
            },
        })?;
        let display_name = display_name.trim();
        if display_name.chars().count() < 2 {
            return Err(SignUpError::InvalidInput {
                field: "display_name",
                reason: "Please enter your full name".to_string(),
            });
        }
        Ok(Self {
            email: credentials.email,
            password: credentials.password,
            display_name: display_name.to_string(),
        })
    }

    /// Returns the normalized email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("display_name", &self.display_name)
            .finish()
    }
}

fn validate_email(raw: &str) -> Result<String, String> {
    let email = raw.trim();
    if email.is_empty() {
        return Err("Please enter your email address".to_string());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(email.to_string())
        }
        _ => Err("Please enter a valid email address".to_string()),
    }
}

/// What a successful credential exchange yields.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    /// Token for subsequent calls.
    pub token: BearerToken,
    /// The authenticated member.
    pub user: PortalUser,
    /// Schools included inline in the login response, if the backend sent
    /// them. `None` means they must be fetched separately.
    pub organizations: Option<Vec<Organization>>,
}

/// Calls the session manager makes against the portal backend.
///
/// Each call is a single attempt; callers decide whether to retry.
#[async_trait]
pub trait PortalBackend: Send + Sync {
    /// Exchanges credentials for a token and member record.
    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, Report<BackendError>>;

    /// Lists the schools the member with `email` belongs to.
    async fn members_by_email(
        &self,
        token: &BearerToken,
        email: &str,
    ) -> Result<Vec<Organization>, Report<BackendError>>;

    /// Fetches the member record for a token.
    async fn profile(&self, token: &BearerToken) -> Result<PortalUser, Report<BackendError>>;

    /// Creates a new account.
    async fn register(&self, registration: &Registration) -> Result<(), Report<BackendError>>;
}
