//! In-memory `PortalBackend` for tests.

use async_trait::async_trait;
use rootcause::Report;
use seed_portal_core::{OrganizationId, UserId};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::{Credentials, LoginGrant, PortalBackend, Registration};
use crate::error::BackendError;
use crate::organization::Organization;
use crate::session::BearerToken;
use crate::user::PortalUser;

pub(crate) fn org(id: &str) -> Organization {
    Organization::new(
        OrganizationId::new(id).expect("valid id"),
        format!("School {id}"),
    )
}

pub(crate) fn org_id(id: &str) -> OrganizationId {
    OrganizationId::new(id).expect("valid id")
}

pub(crate) fn rejected(status: u16, message: &str) -> BackendError {
    BackendError::Rejected {
        endpoint: "fake".to_string(),
        status,
        message: message.to_string(),
    }
}

pub(crate) fn unreachable() -> BackendError {
    BackendError::Unreachable {
        endpoint: "fake".to_string(),
        reason: "connection refused".to_string(),
    }
}

/// Accepts one email/password pair and serves a configurable school list.
pub(crate) struct FakeBackend {
    email: String,
    password: String,
    user_id: String,
    token: String,
    inline: Option<Vec<Organization>>,
    login_failure: Option<BackendError>,
    members: Mutex<Result<Vec<Organization>, BackendError>>,
    register_failure: Option<BackendError>,
    calls: AtomicUsize,
}

impl FakeBackend {
    pub(crate) fn new(user_id: &str, members: Vec<Organization>) -> Self {
        Self {
            email: "ops@seed.example".to_string(),
            password: "correct horse".to_string(),
            user_id: user_id.to_string(),
            token: format!("token-{user_id}"),
            inline: None,
            login_failure: None,
            members: Mutex::new(Ok(members)),
            register_failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_inline(mut self, organizations: Vec<Organization>) -> Self {
        self.inline = Some(organizations);
        self
    }

    pub(crate) fn failing_login(mut self, err: BackendError) -> Self {
        self.login_failure = Some(err);
        self
    }

    pub(crate) fn failing_register(mut self, err: BackendError) -> Self {
        self.register_failure = Some(err);
        self
    }

    pub(crate) fn set_members(&self, members: Result<Vec<Organization>, BackendError>) {
        *self.members.lock().expect("members lock") = members;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn user(&self) -> PortalUser {
        PortalUser::new(
            UserId::new(self.user_id.clone()).expect("valid id"),
            self.email.clone(),
        )
    }
}

#[async_trait]
impl PortalBackend for FakeBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, Report<BackendError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.login_failure {
            return Err(err.clone().into());
        }
        if credentials.email() != self.email || credentials.password() != self.password {
            return Err(rejected(401, "Invalid login credentials").into());
        }
        Ok(LoginGrant {
            token: BearerToken::new(self.token.clone()),
            user: self.user(),
            organizations: self.inline.clone(),
        })
    }

    async fn members_by_email(
        &self,
        token: &BearerToken,
        email: &str,
    ) -> Result<Vec<Organization>, Report<BackendError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if token.as_str() != self.token || email != self.email {
            return Err(rejected(401, "unauthorized").into());
        }
        self.members
            .lock()
            .expect("members lock")
            .clone()
            .map_err(Report::from)
    }

    async fn profile(&self, token: &BearerToken) -> Result<PortalUser, Report<BackendError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if token.as_str() != self.token {
            return Err(rejected(401, "unauthorized").into());
        }
        Ok(self.user())
    }

    async fn register(&self, _registration: &Registration) -> Result<(), Report<BackendError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.register_failure {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }
}
