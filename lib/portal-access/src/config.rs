//! Portal backend endpoint configuration.
//!
//! The same client can talk to the member API directly or go through the
//! `portal-auth` proxy; only the endpoint paths differ.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for reaching the portal backend.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalApiConfig {
    /// Base URL of the API (e.g., "https://server.seedglobaleducation.com/api").
    base_url: String,
    /// Path of the credential exchange endpoint.
    /// Default: "member-auth/login"
    #[serde(default = "default_login_path")]
    login_path: String,
    /// Path of the membership lookup endpoint. The email is appended as a
    /// query parameter.
    /// Default: "member-auth/members-by-email"
    #[serde(default = "default_members_path")]
    members_path: String,
    /// Path of the profile endpoint.
    /// Default: "member-auth/me"
    #[serde(default = "default_profile_path")]
    profile_path: String,
    /// Path of the registration endpoint.
    /// Default: "member-auth/register"
    #[serde(default = "default_register_path")]
    register_path: String,
    /// Request timeout in seconds. Unset keeps the HTTP client default.
    #[serde(default)]
    request_timeout_seconds: Option<u64>,
}

fn default_login_path() -> String {
    "member-auth/login".to_string()
}

fn default_members_path() -> String {
    "member-auth/members-by-email".to_string()
}

fn default_profile_path() -> String {
    "member-auth/me".to_string()
}

fn default_register_path() -> String {
    "member-auth/register".to_string()
}

impl PortalApiConfig {
    /// Creates a configuration for the member API with default paths.
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self::builder(base_url).build()
    }

    /// Creates a configuration that routes every call through the
    /// `portal-auth` proxy mounted under `base_url`.
    #[must_use]
    pub fn via_proxy(base_url: String) -> Self {
        Self::builder(base_url)
            .login_path("portal-auth?action=login".to_string())
            .members_path("portal-auth?action=members-by-email".to_string())
            .profile_path("portal-auth?action=me".to_string())
            .register_path("portal-auth?action=register".to_string())
            .build()
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(base_url: String) -> PortalApiConfigBuilder {
        PortalApiConfigBuilder::new(base_url)
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the full credential exchange URL.
    #[must_use]
    pub fn login_url(&self) -> String {
        self.join(&self.login_path)
    }

    /// Returns the full membership lookup URL.
    #[must_use]
    pub fn members_url(&self) -> String {
        self.join(&self.members_path)
    }

    /// Returns the full profile URL.
    #[must_use]
    pub fn profile_url(&self) -> String {
        self.join(&self.profile_path)
    }

    /// Returns the full registration URL.
    #[must_use]
    pub fn register_url(&self) -> String {
        self.join(&self.register_path)
    }

    /// Returns the request timeout, if one is configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Builder for `PortalApiConfig`.
#[derive(Debug)]
pub struct PortalApiConfigBuilder {
    base_url: String,
    login_path: String,
    members_path: String,
    profile_path: String,
    register_path: String,
    request_timeout_seconds: Option<u64>,
}

impl PortalApiConfigBuilder {
    /// Creates a new builder with default paths.
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            login_path: default_login_path(),
            members_path: default_members_path(),
            profile_path: default_profile_path(),
            register_path: default_register_path(),
            request_timeout_seconds: None,
        }
    }

    /// Sets the credential exchange path.
    #[must_use]
    pub fn login_path(mut self, path: String) -> Self {
        self.login_path = path;
        self
    }

    /// Sets the membership lookup path.
    #[must_use]
    pub fn members_path(mut self, path: String) -> Self {
        self.members_path = path;
        self
    }

    /// Sets the profile path.
    #[must_use]
    pub fn profile_path(mut self, path: String) -> Self {
        self.profile_path = path;
        self
    }

    /// Sets the registration path.
    #[must_use]
    pub fn register_path(mut self, path: String) -> Self {
        self.register_path = path;
        self
    }

    /// Sets the request timeout in seconds.
    #[must_use]
    pub fn request_timeout_seconds(mut self, seconds: u64) -> Self {
        self.request_timeout_seconds = Some(seconds);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> PortalApiConfig {
        PortalApiConfig {
            base_url: self.base_url,
            login_path: self.login_path,
            members_path: self.members_path,
            profile_path: self.profile_path,
            register_path: self.register_path,
            request_timeout_seconds: self.request_timeout_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_join_cleanly() {
        let config = PortalApiConfig::new("https://portal.example.com/api/".to_string());
        assert_eq!(
            config.login_url(),
            "https://portal.example.com/api/member-auth/login"
        );
        assert_eq!(
            config.members_url(),
            "https://portal.example.com/api/member-auth/members-by-email"
        );
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn proxy_paths_carry_action() {
        let config = PortalApiConfig::via_proxy("http://localhost:8787/functions/v1".to_string());
        assert_eq!(
            config.profile_url(),
            "http://localhost:8787/functions/v1/portal-auth?action=me"
        );
        assert_eq!(
            config.register_url(),
            "http://localhost:8787/functions/v1/portal-auth?action=register"
        );
    }

    #[test]
    fn builder_overrides() {
        let config = PortalApiConfig::builder("http://api".to_string())
            .login_path("/v2/login".to_string())
            .request_timeout_seconds(15)
            .build();
        assert_eq!(config.login_url(), "http://api/v2/login");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: PortalApiConfig =
            serde_json::from_str(r#"{"base_url":"http://api"}"#).expect("deserialize");
        assert_eq!(config.profile_url(), "http://api/member-auth/me");
    }
}
