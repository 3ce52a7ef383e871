//! CLI configuration.
//!
//! Read from `SEED_PORTAL_*` environment variables with `__` separating
//! nested keys, e.g. `SEED_PORTAL_API__BASE_URL` or
//! `SEED_PORTAL_API__REQUEST_TIMEOUT_SECONDS`. Setting
//! `SEED_PORTAL_PROXY_URL` routes every call through the `portal-auth` proxy
//! instead of the member API.

use seed_portal_access::PortalApiConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// CLI configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Member API endpoints.
    #[serde(default = "default_api")]
    pub api: PortalApiConfig,

    /// Base URL of a `portal-auth` proxy. Takes precedence over `api`.
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Session file location. Defaults to the user configuration directory.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
}

fn default_api() -> PortalApiConfig {
    PortalApiConfig::new("http://server.seedglobaleducation.com/api".to_string())
}

impl CliConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(environment())
    }

    fn load(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Endpoints the client should call.
    #[must_use]
    pub fn portal_api(&self) -> PortalApiConfig {
        match &self.proxy_url {
            Some(url) => PortalApiConfig::via_proxy(url.clone()),
            None => self.api.clone(),
        }
    }

    /// Where the session is stored.
    #[must_use]
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.storage_path.clone().or_else(|| {
            dirs::config_dir().map(|dir| dir.join("seed-portal").join("session.json"))
        })
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("SEED_PORTAL")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
