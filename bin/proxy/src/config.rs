//! Proxy configuration.
//!
//! Loaded via the `config` crate from `SEED_PORTAL_*` environment variables,
//! with `__` separating nested keys:
//!
//! - `SEED_PORTAL_BIND_ADDR=0.0.0.0:8080`
//! - `SEED_PORTAL_UPSTREAM__BASE_URL=https://server.seedglobaleducation.com/api`
//! - `SEED_PORTAL_UPSTREAM__REQUEST_TIMEOUT_SECONDS=15`

use seed_portal_access::PortalApiConfig;
use serde::Deserialize;

/// Proxy configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Address the proxy listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// The member API the proxy forwards to.
    #[serde(default = "default_upstream")]
    pub upstream: PortalApiConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_upstream() -> PortalApiConfig {
    PortalApiConfig::new("http://server.seedglobaleducation.com/api".to_string())
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            upstream: default_upstream(),
        }
    }
}

impl ProxyConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(environment())
    }

    fn load(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("SEED_PORTAL")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
