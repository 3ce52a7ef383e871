//! Proxy error types.
//!
//! Upstream rejections are not errors here: they are relayed with the
//! upstream status. These variants cover requests the proxy refuses on its
//! own and upstream calls that fail outright.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Errors produced by the proxy itself.
#[derive(Debug, Clone)]
pub enum ProxyError {
    /// `me` and `members-by-email` need the caller's bearer token.
    MissingAuthorization,
    /// The `action` query parameter names no known action.
    UnknownAction { action: String },
    /// A required query parameter is absent.
    MissingParameter { name: &'static str },
    /// The request body is not the expected JSON.
    InvalidBody { reason: String },
    /// The upstream could not be reached or answered with something that is
    /// not JSON.
    Upstream { endpoint: String, reason: String },
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAuthorization => write!(f, "Authorization header required"),
            Self::UnknownAction { action } => write!(f, "Unknown action '{action}'"),
            Self::MissingParameter { name } => write!(f, "Missing '{name}' parameter"),
            Self::InvalidBody { reason } => write!(f, "Invalid request body: {reason}"),
            Self::Upstream { endpoint, reason } => {
                write!(f, "upstream request to {endpoint} failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ProxyError {}

impl ProxyError {
    /// HTTP status returned to the caller.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingAuthorization => StatusCode::UNAUTHORIZED,
            Self::UnknownAction { .. }
            | Self::MissingParameter { .. }
            | Self::InvalidBody { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "portal-auth failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
