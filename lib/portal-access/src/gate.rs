//! Protected route gating.
//!
//! `RouteGate::decide` is consulted on every navigation. It holds no state of
//! its own: it reads an `AccessSnapshot` of the session and school selection
//! and returns what to do with the requested path.

/// Whether a member is signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// The stored session has not been read yet.
    Loading,
    /// Nobody is signed in.
    Anonymous,
    /// A member is signed in.
    Authenticated,
}

/// State of the signed-in member's school list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationsStatus {
    /// The list is still being resolved.
    Loading,
    /// The list is known.
    Resolved { count: usize, needs_selection: bool },
}

/// Everything the gate looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessSnapshot {
    pub auth: AuthStatus,
    pub organizations: OrganizationsStatus,
}

impl AccessSnapshot {
    /// Startup, before the stored session has been read.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            auth: AuthStatus::Loading,
            organizations: OrganizationsStatus::Loading,
        }
    }

    /// Nobody is signed in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            auth: AuthStatus::Anonymous,
            organizations: OrganizationsStatus::Resolved {
                count: 0,
                needs_selection: false,
            },
        }
    }

    /// A member is signed in.
    #[must_use]
    pub fn authenticated(organizations: OrganizationsStatus) -> Self {
        Self {
            auth: AuthStatus::Authenticated,
            organizations,
        }
    }
}

/// Why the gate sends the member to the selection view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRedirect {
    /// Several schools and none chosen yet.
    NeedsSelection,
    /// No schools at all; the selection view shows the empty state.
    NoAccess,
    /// A signed-in member opened the login view.
    AlreadySignedIn,
}

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Still resolving; show a placeholder and ask again later.
    Loading,
    /// Go to the login view, then come back to `return_to`.
    RedirectToLogin { return_to: String },
    /// Go to the school selection view.
    RedirectToSelection { reason: SelectionRedirect },
    /// Show the requested view.
    Render,
}

/// Route gate configuration.
#[derive(Debug, Clone)]
pub struct RouteGate {
    login_path: String,
    selection_path: String,
    public_paths: Vec<String>,
}

impl Default for RouteGate {
    fn default() -> Self {
        Self::new("/login".to_string(), "/select-school".to_string())
    }
}

impl RouteGate {
    /// Creates a gate. The login path is always public.
    #[must_use]
    pub fn new(login_path: String, selection_path: String) -> Self {
        let login_path = normalize(&login_path).to_string();
        Self {
            public_paths: vec![login_path.clone()],
            login_path,
            selection_path: normalize(&selection_path).to_string(),
        }
    }

    /// Adds a path that renders without a session (e.g. a public report
    /// download link).
    #[must_use]
    pub fn with_public_path(mut self, path: &str) -> Self {
        self.public_paths.push(normalize(path).to_string());
        self
    }

    /// Returns the login view path.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Returns the selection view path.
    #[must_use]
    pub fn selection_path(&self) -> &str {
        &self.selection_path
    }

    /// Returns true if `path` renders without a session.
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize(path);
        self.public_paths.iter().any(|p| p == path)
    }

    /// Decides what to do with a navigation to `path`.
    #[must_use]
    pub fn decide(&self, path: &str, snapshot: &AccessSnapshot) -> GateDecision {
        let route = normalize(path);

        if route == self.login_path {
            return match snapshot.auth {
                AuthStatus::Authenticated => GateDecision::RedirectToSelection {
                    reason: SelectionRedirect::AlreadySignedIn,
                },
                AuthStatus::Loading | AuthStatus::Anonymous => GateDecision::Render,
            };
        }
        if self.is_public(route) {
            return GateDecision::Render;
        }

        match snapshot.auth {
            AuthStatus::Loading => return GateDecision::Loading,
            AuthStatus::Anonymous => {
                return GateDecision::RedirectToLogin {
                    return_to: path.to_string(),
                };
            }
            AuthStatus::Authenticated => {}
        }

        let OrganizationsStatus::Resolved {
            count,
            needs_selection,
        } = snapshot.organizations
        else {
            return GateDecision::Loading;
        };

        if route == self.selection_path {
            return GateDecision::Render;
        }
        if needs_selection {
            return GateDecision::RedirectToSelection {
                reason: SelectionRedirect::NeedsSelection,
            };
        }
        if count == 0 {
            return GateDecision::RedirectToSelection {
                reason: SelectionRedirect::NoAccess,
            };
        }
        GateDecision::Render
    }

    /// Where to go after a successful sign-in: the remembered path if there
    /// is one, otherwise the selection view.
    ///
    /// Only same-site paths are honoured; anything that could point at
    /// another host falls back to the selection view.
    #[must_use]
    pub fn post_login_destination(&self, return_to: Option<&str>) -> String {
        match return_to {
            Some(path) if is_local_path(path) && normalize(path) != self.login_path => {
                path.to_string()
            }
            _ => self.selection_path.clone(),
        }
    }
}

/// A single leading `/`, not followed by another slash or a backslash.
fn is_local_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/') && !matches!(chars.next(), Some('/' | '\\'))
}

/// Drops query string, fragment and trailing slashes for comparison.
fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
