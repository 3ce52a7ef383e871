//! Session handling and access control for the SEED portal.
//!
//! This crate provides:
//! - Credential exchange against the portal backend (`PortalBackend`,
//!   `HttpPortalBackend`)
//! - A durable session store (`SessionManager` over a `SessionStorage`)
//! - School resolution (`resolve_selection`, `SelectionState`)
//! - The protected route check (`RouteGate`)
//!
//! # Lifecycle
//!
//! A `SessionManager` is created once, rehydrated from storage before the
//! first navigation, mutated through `sign_in`/`sign_out`, and finally
//! disposed, which hands the storage back to the caller.
//!
//! # Example
//!
//! ```
//! use seed_portal_access::{AccessSnapshot, GateDecision, RouteGate};
//!
//! let gate = RouteGate::default();
//! let decision = gate.decide("/dashboard", &AccessSnapshot::anonymous());
//! assert_eq!(
//!     decision,
//!     GateDecision::RedirectToLogin { return_to: "/dashboard".to_string() }
//! );
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod gate;
pub mod http;
pub mod manager;
pub mod organization;
pub mod selection;
pub mod session;
pub mod storage;
pub mod user;
mod wire;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use backend::{Credentials, LoginGrant, PortalBackend, Registration};
pub use config::{PortalApiConfig, PortalApiConfigBuilder};
pub use error::{BackendError, SessionError, SignInError, SignUpError, StorageError};
pub use gate::{
    AccessSnapshot, AuthStatus, GateDecision, OrganizationsStatus, RouteGate, SelectionRedirect,
};
pub use http::HttpPortalBackend;
pub use manager::{OrganizationStatus, Rehydration, SessionManager, SignInOutcome};
pub use organization::{MemberRole, Organization};
pub use selection::{SelectionSource, SelectionState, SelectionView, resolve_selection};
pub use session::{BearerToken, Session};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use user::PortalUser;
