//! Error types for the portal-access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `BackendError`: a single call to the portal backend failed
//! - `SignInError` / `SignUpError`: what the login form shows
//! - `SessionError`: operations that need an existing session
//! - `StorageError`: durable storage could not be read or written

use std::fmt;

/// Errors from a single call to the portal backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced a response (DNS, connect, timeout).
    Unreachable { endpoint: String, reason: String },
    /// The backend answered with a non-success status.
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// The backend answered with a success status but an unusable body.
    MalformedResponse { endpoint: String, reason: String },
}

impl BackendError {
    /// Returns the HTTP status for rejected calls.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable { endpoint, reason } => {
                write!(f, "could not reach {endpoint}: {reason}")
            }
            Self::Rejected {
                endpoint,
                status,
                message,
            } => {
                write!(f, "{endpoint} answered {status}: {message}")
            }
            Self::MalformedResponse { endpoint, reason } => {
                write!(f, "malformed response from {endpoint}: {reason}")
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// Errors returned by `SessionManager::sign_in`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInError {
    /// The submitted form failed local validation.
    InvalidInput { field: &'static str, reason: String },
    /// The auth endpoint refused the credentials (4xx).
    InvalidCredentials { message: String },
    /// The request could not reach the backend.
    NetworkError { reason: String },
    /// The backend failed (5xx) or answered with an unusable body.
    ServerError { reason: String },
}

impl SignInError {
    /// Classifies a failed login call.
    #[must_use]
    pub fn from_backend(err: &BackendError) -> Self {
        match err {
            BackendError::Unreachable { reason, .. } => Self::NetworkError {
                reason: reason.clone(),
            },
            BackendError::Rejected {
                status, message, ..
            } if (400..500).contains(status) => Self::InvalidCredentials {
                message: message.clone(),
            },
            other => Self::ServerError {
                reason: other.to_string(),
            },
        }
    }

    /// Message suitable for showing next to the login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput { reason, .. } => reason.clone(),
            Self::InvalidCredentials { .. } => {
                "Invalid email or password. Please try again.".to_string()
            }
            Self::NetworkError { .. } => {
                "Could not reach the portal. Please try again.".to_string()
            }
            Self::ServerError { .. } => {
                "The portal is having trouble right now. Please try again.".to_string()
            }
        }
    }
}

impl fmt::Display for SignInError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { field, reason } => {
                write!(f, "invalid {field}: {reason}")
            }
            Self::InvalidCredentials { message } => {
                write!(f, "invalid credentials: {message}")
            }
            Self::NetworkError { reason } => {
                write!(f, "network error: {reason}")
            }
            Self::ServerError { reason } => {
                write!(f, "server error: {reason}")
            }
        }
    }
}

impl std::error::Error for SignInError {}

/// Errors returned by `SessionManager::sign_up`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpError {
    /// The submitted form failed local validation.
    InvalidInput { field: &'static str, reason: String },
    /// The registration endpoint refused the request (4xx).
    Rejected { message: String },
    /// The request could not reach the backend.
    NetworkError { reason: String },
    /// The backend failed (5xx) or answered with an unusable body.
    ServerError { reason: String },
}

impl SignUpError {
    /// Classifies a failed registration call.
    #[must_use]
    pub fn from_backend(err: &BackendError) -> Self {
        match err {
            BackendError::Unreachable { reason, .. } => Self::NetworkError {
                reason: reason.clone(),
            },
            BackendError::Rejected {
                status, message, ..
            } if (400..500).contains(status) => Self::Rejected {
                message: message.clone(),
            },
            other => Self::ServerError {
                reason: other.to_string(),
            },
        }
    }

    /// Returns true if the backend reported the email as taken.
    #[must_use]
    pub fn is_already_registered(&self) -> bool {
        matches!(self, Self::Rejected { message } if message.contains("already registered"))
    }

    /// Message suitable for showing next to the sign-up form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            _ if self.is_already_registered() => {
                "This email is already registered. Please sign in.".to_string()
            }
            Self::InvalidInput { reason, .. } => reason.clone(),
            Self::Rejected { message } => message.clone(),
            Self::NetworkError { .. } => {
                "Could not reach the portal. Please try again.".to_string()
            }
            Self::ServerError { .. } => {
                "The portal is having trouble right now. Please try again.".to_string()
            }
        }
    }
}

impl fmt::Display for SignUpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { field, reason } => {
                write!(f, "invalid {field}: {reason}")
            }
            Self::Rejected { message } => {
                write!(f, "registration rejected: {message}")
            }
            Self::NetworkError { reason } => {
                write!(f, "network error: {reason}")
            }
            Self::ServerError { reason } => {
                write!(f, "server error: {reason}")
            }
        }
    }
}

impl std::error::Error for SignUpError {}

/// Errors from operations that act on the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No user is signed in.
    NotAuthenticated,
    /// The school list could not be loaded.
    OrganizationFetchFailed { reason: String },
    /// The member profile could not be loaded.
    ProfileFetchFailed { reason: String },
    /// The requested school is not one of the member's schools.
    UnknownOrganization { id: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "not signed in"),
            Self::OrganizationFetchFailed { reason } => {
                write!(f, "could not load schools: {reason}")
            }
            Self::ProfileFetchFailed { reason } => {
                write!(f, "could not load profile: {reason}")
            }
            Self::UnknownOrganization { id } => {
                write!(f, "school '{id}' is not available to this account")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Errors from the durable session storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing store could not be read.
    Read { key: String, reason: String },
    /// The backing store could not be written.
    Write { key: String, reason: String },
    /// A stored value could not be parsed.
    Malformed { key: String, reason: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { key, reason } => write!(f, "failed to read '{key}': {reason}"),
            Self::Write { key, reason } => write!(f, "failed to write '{key}': {reason}"),
            Self::Malformed { key, reason } => {
                write!(f, "stored value '{key}' is malformed: {reason}")
            }
        }
    }
}

impl std::error::Error for StorageError {}
