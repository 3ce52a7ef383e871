//! Core domain types and utilities for the SEED portal.
//!
//! This crate provides the identifiers and error handling shared by the
//! portal access library, the proxy and the command line client.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{OrganizationId, ParseIdError, UserId};
