//! Current-school resolution.
//!
//! Whenever the membership list changes, the current school is resolved in
//! this order:
//! 1. a previously persisted choice that is still in the list
//! 2. the only school, when there is exactly one (this choice is persisted)
//! 3. the single primary school among several
//! 4. otherwise the member has to pick (`needs_selection`)
//!
//! With no schools at all there is nothing to pick and nothing selected;
//! the caller shows the "no access" state.

use seed_portal_core::OrganizationId;

use crate::organization::Organization;

/// How the current school was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// Restored from the member's persisted choice.
    Persisted,
    /// The member belongs to exactly one school.
    OnlyMembership,
    /// The single school flagged as primary.
    Primary,
    /// Picked explicitly by the member.
    Manual,
}

/// The resolved current school.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    current: Option<OrganizationId>,
    needs_selection: bool,
    source: Option<SelectionSource>,
}

impl SelectionState {
    /// Nothing selected and nothing to select.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Several schools, none chosen yet.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            current: None,
            needs_selection: true,
            source: None,
        }
    }

    /// A school has been chosen.
    #[must_use]
    pub fn selected(id: OrganizationId, source: SelectionSource) -> Self {
        Self {
            current: Some(id),
            needs_selection: false,
            source: Some(source),
        }
    }

    /// Returns the current school ID.
    #[must_use]
    pub fn current_organization_id(&self) -> Option<&OrganizationId> {
        self.current.as_ref()
    }

    /// Returns true while the member still has to pick a school.
    #[must_use]
    pub fn needs_selection(&self) -> bool {
        self.needs_selection
    }

    /// Returns how the current school was chosen.
    #[must_use]
    pub fn source(&self) -> Option<SelectionSource> {
        self.source
    }

    /// Returns true if this choice should be written to storage.
    ///
    /// Primary-flag fallbacks are recomputed on every resolution and are
    /// never persisted; a persisted choice is already stored.
    #[must_use]
    pub fn should_persist(&self) -> bool {
        matches!(
            self.source,
            Some(SelectionSource::OnlyMembership | SelectionSource::Manual)
        )
    }
}

/// Resolves the current school from the membership list and the member's
/// persisted choice.
#[must_use]
pub fn resolve_selection(
    organizations: &[Organization],
    persisted: Option<&OrganizationId>,
) -> SelectionState {
    if let Some(id) = persisted
        && organizations.iter().any(|org| org.id() == id)
    {
        return SelectionState::selected(id.clone(), SelectionSource::Persisted);
    }

    match organizations {
        [] => SelectionState::empty(),
        [only] => SelectionState::selected(only.id().clone(), SelectionSource::OnlyMembership),
        many => {
            let mut primaries = many.iter().filter(|org| org.is_primary());
            match (primaries.next(), primaries.next()) {
                (Some(primary), None) => {
                    SelectionState::selected(primary.id().clone(), SelectionSource::Primary)
                }
                _ => SelectionState::pending(),
            }
        }
    }
}

/// Applies an explicit choice. Returns `None` if the school is not in the
/// membership list.
#[must_use]
pub fn choose(organizations: &[Organization], id: &OrganizationId) -> Option<SelectionState> {
    organizations
        .iter()
        .any(|org| org.id() == id)
        .then(|| SelectionState::selected(id.clone(), SelectionSource::Manual))
}

/// What the school selection screen should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionView<'a> {
    /// The school list could not be loaded; offer a manual refresh.
    LoadFailed { reason: &'a str },
    /// The member has no schools.
    NoOrganizations,
    /// Offer the list, highlighting the current school if any.
    Picker {
        organizations: &'a [Organization],
        current: Option<&'a OrganizationId>,
    },
}
