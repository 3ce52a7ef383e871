//! The session manager.
//!
//! `SessionManager` owns the session, the member's school list and the
//! current-school selection. Its lifecycle is explicit:
//!
//! 1. `new` with a backend and a storage
//! 2. `rehydrate` once, before the first navigation
//! 3. `sign_in` / `sign_out` / `set_current_organization` as the member acts
//! 4. `dispose`, which hands the storage back
//!
//! School list and selection are derived from the session and are rebuilt
//! on every session change; nothing carries over from one member to the next.

use chrono::{DateTime, Utc};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use seed_portal_core::{OrganizationId, UserId};
use tracing::{debug, info, instrument, warn};

use crate::backend::{Credentials, PortalBackend, Registration};
use crate::error::{SessionError, SignInError, SignUpError, StorageError};
use crate::gate::{AccessSnapshot, OrganizationsStatus};
use crate::organization::Organization;
use crate::selection::{self, SelectionState, SelectionView};
use crate::session::{BearerToken, Session};
use crate::storage::{SessionStorage, keys};
use crate::user::PortalUser;

/// Whether the school list for the current session is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationStatus {
    /// No session, or the list has not been resolved yet.
    Unresolved,
    /// The list is current (possibly empty).
    Loaded,
    /// The list could not be fetched; it is empty until a refresh succeeds.
    FetchFailed { reason: String },
}

/// Result of reading the stored session at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rehydration {
    /// A stored session was restored.
    Restored,
    /// Nothing was stored.
    NoSession,
    /// Stored data could not be parsed and was cleared.
    DiscardedCorrupt,
}

/// Summary of a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    /// The member who signed in.
    pub user_id: UserId,
    /// Number of schools available to the member.
    pub organizations: usize,
    /// True if the member has to pick a school next.
    pub needs_selection: bool,
    /// True if the school list could not be fetched.
    pub organization_fetch_failed: bool,
}

/// What is written under `portal_user`.
#[derive(Debug, Serialize, Deserialize)]
struct StoredUser {
    user: PortalUser,
    signed_in_at: DateTime<Utc>,
}

/// Owns the session and its derived school selection.
pub struct SessionManager<B, S> {
    backend: B,
    storage: S,
    rehydrated: bool,
    session: Option<Session>,
    organizations: Vec<Organization>,
    organization_status: OrganizationStatus,
    selection: SelectionState,
}

impl<B, S> SessionManager<B, S>
where
    B: PortalBackend,
    S: SessionStorage,
{
    /// Creates a manager. Until `rehydrate` runs the access snapshot reports
    /// loading, so no premature redirect is made.
    #[must_use]
    pub fn new(backend: B, storage: S) -> Self {
        Self {
            backend,
            storage,
            rehydrated: false,
            session: None,
            organizations: Vec::new(),
            organization_status: OrganizationStatus::Unresolved,
            selection: SelectionState::empty(),
        }
    }

    /// Restores the stored session without any network call.
    ///
    /// Stored values that fail to parse are removed and the manager falls
    /// back to signed out. This is never reported as an error.
    pub fn rehydrate(&mut self) -> Rehydration {
        self.rehydrated = true;
        self.clear_memory();

        match self.read_stored() {
            Ok(Some((session, organizations))) => {
                debug!(user_id = %session.user_id(), "restored stored session");
                self.install(session, organizations, OrganizationStatus::Loaded);
                Rehydration::Restored
            }
            Ok(None) => Rehydration::NoSession,
            Err(e) => {
                warn!(error = %e, "discarding unreadable stored session");
                self.storage
                    .remove_all(&[keys::USER, keys::TOKEN, keys::ORGANIZATIONS]);
                Rehydration::DiscardedCorrupt
            }
        }
    }

    /// Signs in with email and password.
    ///
    /// On success the member, token and school list are persisted. A failed
    /// school lookup does not fail the sign-in; the session starts with no
    /// schools and `OrganizationStatus::FetchFailed`.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<SignInOutcome, Report<SignInError>> {
        let credentials = Credentials::new(email, password)?;

        let grant = self.backend.login(&credentials).await.map_err(|report| {
            let kind = SignInError::from_backend(report.current_context());
            report.context(kind)
        })?;

        let (organizations, status) = match grant.organizations {
            Some(inline) => (inline, OrganizationStatus::Loaded),
            None => {
                match self
                    .backend
                    .members_by_email(&grant.token, credentials.email())
                    .await
                {
                    Ok(fetched) => (fetched, OrganizationStatus::Loaded),
                    Err(e) => {
                        warn!(error = %e, "school lookup failed; continuing without schools");
                        (
                            Vec::new(),
                            OrganizationStatus::FetchFailed {
                                reason: e.current_context().to_string(),
                            },
                        )
                    }
                }
            }
        };

        let session = Session::new(grant.user, grant.token);
        let user_id = session.user_id().clone();
        self.rehydrated = true;
        self.clear_memory();
        self.persist_session(&session, &organizations);
        self.install(session, organizations, status);

        let outcome = SignInOutcome {
            user_id,
            organizations: self.organizations.len(),
            needs_selection: self.selection.needs_selection(),
            organization_fetch_failed: matches!(
                self.organization_status,
                OrganizationStatus::FetchFailed { .. }
            ),
        };
        info!(
            user_id = %outcome.user_id,
            organizations = outcome.organizations,
            needs_selection = outcome.needs_selection,
            "signed in"
        );
        Ok(outcome)
    }

    /// Creates a new account. Does not sign in and does not touch the
    /// current session.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<(), Report<SignUpError>> {
        let registration = Registration::new(email, password, display_name)?;
        self.backend
            .register(&registration)
            .await
            .map_err(|report| {
                let kind = SignUpError::from_backend(report.current_context());
                report.context(kind)
            })?;
        info!(email = registration.email(), "account registered");
        Ok(())
    }

    /// Signs out. Always succeeds and may be called repeatedly.
    pub fn sign_out(&mut self) {
        let user_key = self
            .session
            .as_ref()
            .map(|s| keys::current_organization(s.user_id()));
        let mut to_remove = vec![keys::USER, keys::TOKEN, keys::ORGANIZATIONS];
        if let Some(key) = &user_key {
            to_remove.push(key);
        }
        self.storage.remove_all(&to_remove);

        if let Some(session) = &self.session {
            info!(user_id = %session.user_id(), "signed out");
        }
        self.rehydrated = true;
        self.clear_memory();
    }

    /// Makes `id` the current school and remembers the choice for this member.
    pub fn set_current_organization(
        &mut self,
        id: &OrganizationId,
    ) -> Result<&Organization, Report<SessionError>> {
        let session = self.session.as_ref().ok_or(SessionError::NotAuthenticated)?;
        let state = selection::choose(&self.organizations, id).ok_or_else(|| {
            SessionError::UnknownOrganization {
                id: id.to_string(),
            }
        })?;

        if let Err(e) = self
            .storage
            .set(&keys::current_organization(session.user_id()), id.as_str())
        {
            warn!(error = %e, "failed to persist school choice");
        }
        debug!(organization_id = %id, "school selected");
        self.selection = state;

        self.current_organization()
            .ok_or_else(|| SessionError::UnknownOrganization { id: id.to_string() }.into())
    }

    /// Fetches the school list again and re-resolves the selection.
    ///
    /// This is the manual retry offered when the list failed to load at
    /// sign-in.
    pub async fn refresh_organizations(&mut self) -> Result<usize, Report<SessionError>> {
        let session = self.session.as_ref().ok_or(SessionError::NotAuthenticated)?;
        let fetched = self
            .backend
            .members_by_email(session.token(), session.user().email())
            .await;

        match fetched {
            Ok(organizations) => {
                if let Err(e) = write_json(&mut self.storage, keys::ORGANIZATIONS, &organizations)
                {
                    warn!(error = %e, "failed to persist school list");
                }
                self.organizations = organizations;
                self.organization_status = OrganizationStatus::Loaded;
                self.resolve();
                debug!(count = self.organizations.len(), "school list refreshed");
                Ok(self.organizations.len())
            }
            Err(report) => {
                let reason = report.current_context().to_string();
                warn!(error = %reason, "school refresh failed; dropping the cached list");
                // The stored choice stays so a later refresh can restore it.
                self.organizations.clear();
                self.selection = SelectionState::empty();
                self.organization_status = OrganizationStatus::FetchFailed {
                    reason: reason.clone(),
                };
                Err(report.context(SessionError::OrganizationFetchFailed { reason }))
            }
        }
    }

    /// Fetches the member profile for the stored token.
    pub async fn fetch_profile(&self) -> Result<PortalUser, Report<SessionError>> {
        let session = self.session.as_ref().ok_or(SessionError::NotAuthenticated)?;
        self.backend
            .profile(session.token())
            .await
            .map_err(|report| {
                let reason = report.current_context().to_string();
                report.context(SessionError::ProfileFetchFailed { reason })
            })
    }

    /// Returns the current session.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Returns true if a member is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the member's schools.
    #[must_use]
    pub fn organizations(&self) -> &[Organization] {
        &self.organizations
    }

    /// Returns the school list status.
    #[must_use]
    pub fn organization_status(&self) -> &OrganizationStatus {
        &self.organization_status
    }

    /// Returns the selection state.
    #[must_use]
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Returns the current school.
    #[must_use]
    pub fn current_organization(&self) -> Option<&Organization> {
        let id = self.selection.current_organization_id()?;
        self.organizations.iter().find(|org| org.id() == id)
    }

    /// Returns what the route gate needs to know.
    #[must_use]
    pub fn snapshot(&self) -> AccessSnapshot {
        if !self.rehydrated {
            return AccessSnapshot::loading();
        }
        if self.session.is_none() {
            return AccessSnapshot::anonymous();
        }
        match self.organization_status {
            OrganizationStatus::Unresolved => {
                AccessSnapshot::authenticated(OrganizationsStatus::Loading)
            }
            OrganizationStatus::Loaded | OrganizationStatus::FetchFailed { .. } => {
                AccessSnapshot::authenticated(OrganizationsStatus::Resolved {
                    count: self.organizations.len(),
                    needs_selection: self.selection.needs_selection(),
                })
            }
        }
    }

    /// Returns what the school selection screen should render, or `None`
    /// when nobody is signed in.
    #[must_use]
    pub fn selection_view(&self) -> Option<SelectionView<'_>> {
        self.session.as_ref()?;
        Some(match &self.organization_status {
            OrganizationStatus::FetchFailed { reason } => SelectionView::LoadFailed { reason },
            _ if self.organizations.is_empty() => SelectionView::NoOrganizations,
            _ => SelectionView::Picker {
                organizations: &self.organizations,
                current: self.selection.current_organization_id(),
            },
        })
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Ends the manager's lifetime and returns the storage.
    #[must_use]
    pub fn dispose(self) -> S {
        self.storage
    }

    fn clear_memory(&mut self) {
        self.session = None;
        self.organizations.clear();
        self.organization_status = OrganizationStatus::Unresolved;
        self.selection = SelectionState::empty();
    }

    fn install(
        &mut self,
        session: Session,
        organizations: Vec<Organization>,
        status: OrganizationStatus,
    ) {
        self.session = Some(session);
        self.organizations = organizations;
        self.organization_status = status;
        self.resolve();
    }

    /// Re-derives the selection from the school list and the persisted choice.
    fn resolve(&mut self) {
        let Some(session) = &self.session else {
            self.selection = SelectionState::empty();
            return;
        };

        let persisted = match self.storage.current_organization(session.user_id()) {
            Ok(raw) => raw.and_then(|raw| OrganizationId::new(raw).ok()),
            Err(e) => {
                warn!(error = %e, "failed to read persisted school choice");
                None
            }
        };

        self.selection = selection::resolve_selection(&self.organizations, persisted.as_ref());

        if self.selection.should_persist()
            && let Some(id) = self.selection.current_organization_id()
            && let Err(e) = self
                .storage
                .set(&keys::current_organization(session.user_id()), id.as_str())
        {
            warn!(error = %e, "failed to persist school choice");
        }
    }

    fn persist_session(&mut self, session: &Session, organizations: &[Organization]) {
        if let Err(e) = self.try_persist_session(session, organizations) {
            warn!(error = %e, "failed to persist session; it will not survive a restart");
        }
    }

    fn try_persist_session(
        &mut self,
        session: &Session,
        organizations: &[Organization],
    ) -> Result<(), Report<StorageError>> {
        let stored = StoredUser {
            user: session.user().clone(),
            signed_in_at: session.signed_in_at(),
        };
        write_json(&mut self.storage, keys::USER, &stored)?;
        self.storage.set(keys::TOKEN, session.token().as_str())?;
        write_json(&mut self.storage, keys::ORGANIZATIONS, organizations)
    }

    /// Reads the stored session. `Ok(None)` when nothing usable is stored,
    /// `Err` when something is stored but cannot be parsed.
    fn read_stored(
        &self,
    ) -> Result<Option<(Session, Vec<Organization>)>, Report<StorageError>> {
        let (Some(raw_user), Some(token)) = (
            self.storage.get(keys::USER)?,
            self.storage.get(keys::TOKEN)?,
        ) else {
            return Ok(None);
        };

        let stored: StoredUser = parse_stored(keys::USER, &raw_user)?;
        if token.trim().is_empty() {
            return Err(StorageError::Malformed {
                key: keys::TOKEN.to_string(),
                reason: "token is empty".to_string(),
            }
            .into());
        }
        let organizations = match self.storage.get(keys::ORGANIZATIONS)? {
            Some(raw) => parse_stored(keys::ORGANIZATIONS, &raw)?,
            None => Vec::new(),
        };

        let session = Session::restore(stored.user, BearerToken::new(token), stored.signed_in_at);
        Ok(Some((session, organizations)))
    }
}

fn parse_stored<T: serde::de::DeserializeOwned>(
    key: &str,
    raw: &str,
) -> Result<T, Report<StorageError>> {
    serde_json::from_str(raw).map_err(|e| {
        StorageError::Malformed {
            key: key.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn write_json<S: SessionStorage, T: Serialize + ?Sized>(
    storage: &mut S,
    key: &str,
    value: &T,
) -> Result<(), Report<StorageError>> {
    let json = serde_json::to_string(value).map_err(|e| StorageError::Write {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    storage.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{GateDecision, RouteGate, SelectionRedirect};
    use crate::selection::SelectionSource;
    use crate::storage::MemoryStorage;
    use crate::testing::{FakeBackend, org, org_id, rejected, unreachable};

    const EMAIL: &str = "ops@seed.example";
    const PASSWORD: &str = "correct horse";

    fn manager(backend: FakeBackend) -> SessionManager<FakeBackend, MemoryStorage> {
        let mut manager = SessionManager::new(backend, MemoryStorage::new());
        assert_eq!(manager.rehydrate(), Rehydration::NoSession);
        manager
    }

    fn gate(manager: &SessionManager<FakeBackend, MemoryStorage>, path: &str) -> GateDecision {
        RouteGate::default().decide(path, &manager.snapshot())
    }

    #[tokio::test]
    async fn single_membership_is_selected_and_remembered() {
        let mut manager = manager(FakeBackend::new("7", vec![org("42")]));

        let outcome = manager.sign_in(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(outcome.user_id.as_str(), "7");
        assert_eq!(outcome.organizations, 1);
        assert!(!outcome.needs_selection);
        assert!(!outcome.organization_fetch_failed);

        assert_eq!(manager.current_organization().unwrap().id().as_str(), "42");
        assert_eq!(gate(&manager, "/dashboard"), GateDecision::Render);

        let storage = manager.dispose();
        let key = keys::current_organization(&UserId::new("7").unwrap());
        assert_eq!(storage.get(&key).unwrap().as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn primary_membership_is_selected_without_persisting() {
        let orgs = vec![org("A").with_primary(true), org("B"), org("C")];
        let mut manager = manager(FakeBackend::new("7", orgs));

        let outcome = manager.sign_in(EMAIL, PASSWORD).await.unwrap();
        assert!(!outcome.needs_selection);
        assert_eq!(manager.current_organization().unwrap().id().as_str(), "A");
        assert_eq!(manager.selection().source(), Some(SelectionSource::Primary));

        let storage = manager.dispose();
        let key = keys::current_organization(&UserId::new("7").unwrap());
        assert_eq!(storage.get(&key).unwrap(), None);
    }

    #[tokio::test]
    async fn several_memberships_wait_for_a_choice() {
        let mut manager = manager(FakeBackend::new("7", vec![org("A"), org("B")]));

        let outcome = manager.sign_in(EMAIL, PASSWORD).await.unwrap();
        assert!(outcome.needs_selection);
        assert!(manager.current_organization().is_none());
        assert_eq!(
            gate(&manager, "/dashboard"),
            GateDecision::RedirectToSelection {
                reason: SelectionRedirect::NeedsSelection
            }
        );
        assert_eq!(gate(&manager, "/select-school"), GateDecision::Render);

        let chosen = manager.set_current_organization(&org_id("B")).unwrap();
        assert_eq!(chosen.id().as_str(), "B");
        assert!(!manager.selection().needs_selection());
        assert_eq!(gate(&manager, "/dashboard"), GateDecision::Render);

        let storage = manager.dispose();
        let key = keys::current_organization(&UserId::new("7").unwrap());
        assert_eq!(storage.get(&key).unwrap().as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn persisted_choice_is_restored_on_sign_in() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                &keys::current_organization(&UserId::new("7").unwrap()),
                "42",
            )
            .unwrap();
        let backend = FakeBackend::new("7", vec![org("42"), org("99")]);
        let mut manager = SessionManager::new(backend, storage);
        manager.rehydrate();

        manager.sign_in(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(manager.current_organization().unwrap().id().as_str(), "42");
        assert_eq!(manager.selection().source(), Some(SelectionSource::Persisted));
    }

    #[tokio::test]
    async fn other_members_choice_is_not_used() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                &keys::current_organization(&UserId::new("8").unwrap()),
                "42",
            )
            .unwrap();
        let backend = FakeBackend::new("7", vec![org("42"), org("99")]);
        let mut manager = SessionManager::new(backend, storage);
        manager.rehydrate();

        let outcome = manager.sign_in(EMAIL, PASSWORD).await.unwrap();
        assert!(outcome.needs_selection);
    }

    #[tokio::test]
    async fn session_survives_restart_without_network() {
        let orgs = vec![org("42"), org("99").with_primary(true)];
        let mut manager = manager(FakeBackend::new("7", orgs.clone()));
        manager.sign_in(EMAIL, PASSWORD).await.unwrap();
        let before = manager.session().cloned().unwrap();
        let storage = manager.dispose();

        let mut restarted = SessionManager::new(FakeBackend::new("7", Vec::new()), storage);
        assert_eq!(restarted.snapshot(), AccessSnapshot::loading());
        assert_eq!(restarted.rehydrate(), Rehydration::Restored);

        let after = restarted.session().unwrap();
        assert_eq!(after.user_id(), before.user_id());
        assert_eq!(after.token(), before.token());
        assert_eq!(after.user().email(), EMAIL);
        assert_eq!(restarted.organizations(), orgs.as_slice());
        assert_eq!(
            restarted.current_organization().unwrap().id().as_str(),
            "99"
        );
        assert_eq!(restarted.backend().calls(), 0);
        assert_eq!(gate(&restarted, "/dashboard"), GateDecision::Render);
    }

    #[tokio::test]
    async fn token_is_not_stored_with_the_user_record() {
        let mut manager = manager(FakeBackend::new("7", vec![org("42")]));
        manager.sign_in(EMAIL, PASSWORD).await.unwrap();

        let storage = manager.dispose();
        let user = storage.get(keys::USER).unwrap().unwrap();
        assert!(!user.contains("token-7"));
        assert_eq!(storage.get(keys::TOKEN).unwrap().as_deref(), Some("token-7"));
    }

    #[tokio::test]
    async fn sign_out_clears_everything_and_is_idempotent() {
        let mut manager = manager(FakeBackend::new("7", vec![org("42")]));
        manager.sign_in(EMAIL, PASSWORD).await.unwrap();

        manager.sign_out();
        assert!(!manager.is_authenticated());
        assert!(manager.organizations().is_empty());
        assert!(manager.selection().current_organization_id().is_none());
        assert_eq!(
            gate(&manager, "/dashboard"),
            GateDecision::RedirectToLogin {
                return_to: "/dashboard".to_string()
            }
        );

        manager.sign_out();
        assert!(!manager.is_authenticated());
        assert!(manager.dispose().is_empty());
    }

    #[tokio::test]
    async fn invalid_credentials_leave_manager_signed_out() {
        let mut manager = manager(FakeBackend::new("7", vec![org("42")]));

        let err = manager.sign_in(EMAIL, "wrong").await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            SignInError::InvalidCredentials { .. }
        ));
        assert!(!manager.is_authenticated());
        assert_eq!(
            gate(&manager, "/leads"),
            GateDecision::RedirectToLogin {
                return_to: "/leads".to_string()
            }
        );
        assert!(manager.dispose().is_empty());
    }

    #[tokio::test]
    async fn failed_sign_in_keeps_the_previous_session() {
        let mut manager = manager(FakeBackend::new("7", vec![org("42")]));
        manager.sign_in(EMAIL, PASSWORD).await.unwrap();

        assert!(manager.sign_in(EMAIL, "wrong").await.is_err());
        assert_eq!(manager.session().unwrap().user_id().as_str(), "7");
    }

    #[tokio::test]
    async fn malformed_input_never_reaches_the_backend() {
        let mut manager = manager(FakeBackend::new("7", Vec::new()));

        let err = manager.sign_in("not-an-email", PASSWORD).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            SignInError::InvalidInput { field: "email", .. }
        ));
        let err = manager.sign_in(EMAIL, "").await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            SignInError::InvalidInput {
                field: "password",
                ..
            }
        ));
        assert_eq!(manager.backend().calls(), 0);
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let backend = FakeBackend::new("7", Vec::new()).failing_login(unreachable());
        let mut manager = manager(backend);

        let err = manager.sign_in(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            SignInError::NetworkError { .. }
        ));
    }

    #[tokio::test]
    async fn server_failure_is_a_server_error() {
        let backend =
            FakeBackend::new("7", Vec::new()).failing_login(rejected(500, "database down"));
        let mut manager = manager(backend);

        let err = manager.sign_in(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            SignInError::ServerError { .. }
        ));
    }

    #[tokio::test]
    async fn failed_school_lookup_still_signs_in() {
        let backend = FakeBackend::new("7", Vec::new());
        backend.set_members(Err(unreachable()));
        let mut manager = manager(backend);

        let outcome = manager.sign_in(EMAIL, PASSWORD).await.unwrap();
        assert!(outcome.organization_fetch_failed);
        assert_eq!(outcome.organizations, 0);
        assert!(manager.is_authenticated());
        assert!(matches!(
            manager.selection_view(),
            Some(SelectionView::LoadFailed { .. })
        ));
        assert_eq!(
            gate(&manager, "/dashboard"),
            GateDecision::RedirectToSelection {
                reason: SelectionRedirect::NoAccess
            }
        );

        manager.backend().set_members(Ok(vec![org("42")]));
        assert_eq!(manager.refresh_organizations().await.unwrap(), 1);
        assert_eq!(manager.organization_status(), &OrganizationStatus::Loaded);
        assert_eq!(manager.current_organization().unwrap().id().as_str(), "42");
        assert_eq!(gate(&manager, "/dashboard"), GateDecision::Render);
    }

    #[tokio::test]
    async fn refresh_failure_is_reported() {
        let mut manager = manager(FakeBackend::new("7", vec![org("42")]));
        manager.sign_in(EMAIL, PASSWORD).await.unwrap();

        manager.backend().set_members(Err(rejected(503, "maintenance")));
        let err = manager.refresh_organizations().await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            SessionError::OrganizationFetchFailed { .. }
        ));
        assert!(matches!(
            manager.organization_status(),
            OrganizationStatus::FetchFailed { .. }
        ));
        assert!(manager.organizations().is_empty());
        assert!(manager.current_organization().is_none());
        assert!(matches!(
            manager.selection_view(),
            Some(SelectionView::LoadFailed { .. })
        ));
        assert_eq!(
            gate(&manager, "/dashboard"),
            GateDecision::RedirectToSelection {
                reason: SelectionRedirect::NoAccess
            }
        );

        manager.backend().set_members(Ok(vec![org("42"), org("43")]));
        manager.refresh_organizations().await.unwrap();
        assert_eq!(
            manager.current_organization().map(|o| o.id().as_str()),
            Some("42")
        );
        assert_eq!(gate(&manager, "/dashboard"), GateDecision::Render);
    }

    #[tokio::test]
    async fn no_schools_shows_the_empty_state() {
        let mut manager = manager(FakeBackend::new("7", Vec::new()));
        let outcome = manager.sign_in(EMAIL, PASSWORD).await.unwrap();

        assert_eq!(outcome.organizations, 0);
        assert!(!outcome.needs_selection);
        assert_eq!(
            manager.selection_view(),
            Some(SelectionView::NoOrganizations)
        );
        for path in ["/dashboard", "/applications", "/leads"] {
            assert_eq!(
                gate(&manager, path),
                GateDecision::RedirectToSelection {
                    reason: SelectionRedirect::NoAccess
                }
            );
        }
        assert_eq!(gate(&manager, "/select-school"), GateDecision::Render);
    }

    #[tokio::test]
    async fn inline_memberships_skip_the_lookup() {
        let backend = FakeBackend::new("7", vec![org("99")]).with_inline(vec![org("5")]);
        let mut manager = manager(backend);

        manager.sign_in(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(manager.backend().calls(), 1);
        assert_eq!(manager.current_organization().unwrap().id().as_str(), "5");
    }

    #[tokio::test]
    async fn choosing_an_unknown_school_fails() {
        let mut manager = manager(FakeBackend::new("7", vec![org("A"), org("B")]));

        let err = manager.set_current_organization(&org_id("A")).unwrap_err();
        assert!(matches!(
            err.current_context(),
            SessionError::NotAuthenticated
        ));

        manager.sign_in(EMAIL, PASSWORD).await.unwrap();
        let err = manager.set_current_organization(&org_id("Z")).unwrap_err();
        assert!(matches!(
            err.current_context(),
            SessionError::UnknownOrganization { .. }
        ));
        assert!(manager.selection().needs_selection());
    }

    #[tokio::test]
    async fn corrupted_storage_is_discarded() {
        let mut storage = MemoryStorage::new();
        storage.set(keys::USER, "{not json").unwrap();
        storage.set(keys::TOKEN, "token-7").unwrap();
        storage.set(keys::ORGANIZATIONS, "[]").unwrap();

        let mut manager = SessionManager::new(FakeBackend::new("7", Vec::new()), storage);
        assert_eq!(manager.rehydrate(), Rehydration::DiscardedCorrupt);
        assert!(!manager.is_authenticated());
        assert_eq!(manager.snapshot(), AccessSnapshot::anonymous());

        let storage = manager.dispose();
        assert_eq!(storage.get(keys::USER).unwrap(), None);
        assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
        assert_eq!(storage.get(keys::ORGANIZATIONS).unwrap(), None);
    }

    #[tokio::test]
    async fn token_without_user_is_no_session() {
        let mut storage = MemoryStorage::new();
        storage.set(keys::TOKEN, "token-7").unwrap();

        let mut manager = SessionManager::new(FakeBackend::new("7", Vec::new()), storage);
        assert_eq!(manager.rehydrate(), Rehydration::NoSession);
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn sign_up_does_not_touch_the_session() {
        let mut manager = manager(FakeBackend::new("7", vec![org("42")]));
        manager.sign_in(EMAIL, PASSWORD).await.unwrap();

        manager
            .sign_up("new@seed.example", "secret", "New Person")
            .await
            .unwrap();
        assert_eq!(manager.session().unwrap().user_id().as_str(), "7");
        assert_eq!(manager.current_organization().unwrap().id().as_str(), "42");
    }

    #[tokio::test]
    async fn sign_up_reports_taken_email() {
        let backend = FakeBackend::new("7", Vec::new())
            .failing_register(rejected(409, "Email already registered"));
        let manager = manager(backend);

        let err = manager
            .sign_up("ops@seed.example", "secret", "Ops Team")
            .await
            .unwrap_err();
        assert!(err.current_context().is_already_registered());
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn sign_up_validates_input_locally() {
        let manager = manager(FakeBackend::new("7", Vec::new()));

        let err = manager
            .sign_up("ops@seed.example", "secret", "A")
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            SignUpError::InvalidInput { .. }
        ));
        assert_eq!(manager.backend().calls(), 0);
    }

    #[tokio::test]
    async fn profile_requires_a_session() {
        let mut manager = manager(FakeBackend::new("7", Vec::new()));
        let err = manager.fetch_profile().await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            SessionError::NotAuthenticated
        ));

        manager.sign_in(EMAIL, PASSWORD).await.unwrap();
        let profile = manager.fetch_profile().await.unwrap();
        assert_eq!(profile.id().as_str(), "7");
    }

    #[tokio::test]
    async fn startup_reports_loading_until_rehydrated() {
        let manager = SessionManager::new(FakeBackend::new("7", Vec::new()), MemoryStorage::new());
        assert_eq!(manager.snapshot(), AccessSnapshot::loading());
        assert_eq!(gate(&manager, "/dashboard"), GateDecision::Loading);
    }
}
