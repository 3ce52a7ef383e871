//! `PortalBackend` over HTTP.

use async_trait::async_trait;
use rootcause::Report;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::backend::{Credentials, LoginGrant, PortalBackend, Registration};
use crate::config::PortalApiConfig;
use crate::error::BackendError;
use crate::organization::Organization;
use crate::session::BearerToken;
use crate::user::PortalUser;
use crate::wire;

/// Portal backend client using reqwest.
#[derive(Debug, Clone)]
pub struct HttpPortalBackend {
    client: reqwest::Client,
    config: PortalApiConfig,
}

impl HttpPortalBackend {
    /// Creates a client for the configured endpoints.
    pub fn new(config: PortalApiConfig) -> Result<Self, Report<BackendError>> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| BackendError::Unreachable {
            endpoint: config.base_url().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { client, config })
    }

    /// Creates a client around an existing reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: PortalApiConfig) -> Self {
        Self { client, config }
    }

    /// Returns the endpoint configuration.
    #[must_use]
    pub fn config(&self) -> &PortalApiConfig {
        &self.config
    }

    /// Sends a request and returns the body of a 2xx response.
    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, Report<BackendError>> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| BackendError::Unreachable {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| BackendError::Unreachable {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        debug!(endpoint, status = status.as_u16(), "portal response");

        if !status.is_success() {
            let message = wire::error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            return Err(BackendError::Rejected {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(body)
    }
}

fn malformed(endpoint: &str, err: wire::WireError) -> BackendError {
    BackendError::MalformedResponse {
        endpoint: endpoint.to_string(),
        reason: err.reason,
    }
}

#[async_trait]
impl PortalBackend for HttpPortalBackend {
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, Report<BackendError>> {
        let url = self.config.login_url();
        let request = self.client.post(&url).json(&json!({
            "email": credentials.email(),
            "password": credentials.password(),
        }));
        let body = self.send(&url, request).await?;
        let grant = wire::parse_login(&body, credentials.email()).map_err(|e| {
            warn!(error = %e, "unusable login response");
            malformed(&url, e)
        })?;
        debug!(user_id = %grant.user.id(), "login accepted");
        Ok(grant)
    }

    #[instrument(skip(self, token))]
    async fn members_by_email(
        &self,
        token: &BearerToken,
        email: &str,
    ) -> Result<Vec<Organization>, Report<BackendError>> {
        let url = self.config.members_url();
        let request = self
            .client
            .get(&url)
            .query(&[("email", email)])
            .header(reqwest::header::AUTHORIZATION, token.authorization_header());
        let body = self.send(&url, request).await?;
        let organizations = wire::parse_members(&body).map_err(|e| malformed(&url, e))?;
        debug!(count = organizations.len(), "memberships fetched");
        Ok(organizations)
    }

    #[instrument(skip(self, token))]
    async fn profile(&self, token: &BearerToken) -> Result<PortalUser, Report<BackendError>> {
        let url = self.config.profile_url();
        let request = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, token.authorization_header());
        let body = self.send(&url, request).await?;
        Ok(wire::parse_profile(&body).map_err(|e| malformed(&url, e))?)
    }

    #[instrument(skip(self, registration), fields(email = %registration.email()))]
    async fn register(&self, registration: &Registration) -> Result<(), Report<BackendError>> {
        let url = self.config.register_url();
        let request = self.client.post(&url).json(&json!({
            "email": registration.email(),
            "password": registration.password(),
            "full_name": registration.display_name(),
        }));
        self.send(&url, request).await?;
        debug!("registration accepted");
        Ok(())
    }
}
