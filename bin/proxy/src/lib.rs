//! `portal-auth` proxy for the SEED portal.
//!
//! Browser clients cannot call the member API directly, so this service
//! exposes the credential exchange, profile, membership lookup and
//! registration endpoints behind one CORS-enabled route.

pub mod config;
pub mod error;
pub mod routes;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use routes::{ProxyState, app};
