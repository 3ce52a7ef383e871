//! CLI error type.

use rootcause::Report;
use seed_portal_access::{BackendError, SessionError};
use std::fmt;

/// Why a command failed. `Display` is what the user sees.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { reason: String },
    /// No place to keep the session file.
    NoStorageLocation,
    /// The HTTP client could not be built.
    Backend { reason: String },
    /// Sign-in failed; `message` is fit for display.
    SignIn { message: String },
    /// Registration failed; `message` is fit for display.
    SignUp { message: String },
    /// The command needs a signed-in member.
    NotSignedIn,
    /// A session operation failed.
    Session { reason: String },
    /// A command argument is invalid.
    InvalidArgument { name: &'static str, reason: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::NoStorageLocation => write!(
                f,
                "no configuration directory found; pass --storage or set SEED_PORTAL_STORAGE_PATH"
            ),
            Self::Backend { reason } => write!(f, "cannot set up the portal client: {reason}"),
            Self::SignIn { message } | Self::SignUp { message } => write!(f, "{message}"),
            Self::NotSignedIn => write!(f, "not signed in; run `seed-portal login` first"),
            Self::Session { reason } => write!(f, "{reason}"),
            Self::InvalidArgument { name, reason } => write!(f, "invalid {name}: {reason}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Maps a session manager failure, keeping the report chain.
pub fn session_failed(report: Report<SessionError>) -> Report<CliError> {
    let kind = match report.current_context() {
        SessionError::NotAuthenticated => CliError::NotSignedIn,
        other => CliError::Session {
            reason: other.to_string(),
        },
    };
    report.context(kind)
}

/// Maps a backend setup failure.
pub fn backend_failed(report: Report<BackendError>) -> Report<CliError> {
    let reason = report.current_context().to_string();
    report.context(CliError::Backend { reason })
}
