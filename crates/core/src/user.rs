//! The acting user, as seen by approval resolution.

use std::collections::BTreeSet;

use rungs_shared::types::{OrgUnitId, Uid, UserGroupId, UserId};
use serde::{Deserialize, Serialize};

/// Approval-related authorities granted to a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalAuthorities {
    /// May approve at the user's own level.
    pub approve: bool,
    /// May approve at any level below the user's own.
    pub approve_lower_levels: bool,
    /// May accept and unaccept approvals made at lower levels.
    pub accept_lower_levels: bool,
    /// May read data that is not yet approved at the user's level.
    pub view_unapproved_data: bool,
}

impl ApprovalAuthorities {
    /// Every authority.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            approve: true,
            approve_lower_levels: true,
            accept_lower_levels: true,
            view_unapproved_data: true,
        }
    }
}

/// Category dimension constraints restricting what a user may see.
///
/// A constrained user never sees the default attribute option combo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionConstraints {
    /// Constrained categories.
    pub categories: BTreeSet<Uid>,
    /// Constrained category option group sets.
    pub category_option_group_sets: BTreeSet<Uid>,
}

impl DimensionConstraints {
    /// True if no constraint is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.category_option_group_sets.is_empty()
    }
}

/// The user on whose behalf approvals are resolved or written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Unique identifier.
    pub id: UserId,
    /// Login name, used in log messages.
    pub username: String,
    /// Superusers bypass visibility and sharing checks.
    #[serde(default)]
    pub superuser: bool,
    /// Data capture organisation units.
    #[serde(default)]
    pub organisation_units: BTreeSet<OrgUnitId>,
    /// Data view organisation units; empty means "same as capture".
    #[serde(default)]
    pub data_view_organisation_units: BTreeSet<OrgUnitId>,
    /// Groups the user belongs to.
    #[serde(default)]
    pub user_groups: BTreeSet<UserGroupId>,
    /// Granted approval authorities.
    #[serde(default)]
    pub authorities: ApprovalAuthorities,
    /// Category dimension constraints.
    #[serde(default)]
    pub dimension_constraints: DimensionConstraints,
}

impl CurrentUser {
    /// Creates a regular user without org units or authorities.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            superuser: false,
            organisation_units: BTreeSet::new(),
            data_view_organisation_units: BTreeSet::new(),
            user_groups: BTreeSet::new(),
            authorities: ApprovalAuthorities::default(),
            dimension_constraints: DimensionConstraints::default(),
        }
    }

    /// Creates a superuser.
    #[must_use]
    pub fn superuser(username: impl Into<String>) -> Self {
        Self {
            superuser: true,
            ..Self::new(username)
        }
    }

    /// Adds a data capture organisation unit.
    #[must_use]
    pub fn with_org_unit(mut self, org_unit: OrgUnitId) -> Self {
        self.organisation_units.insert(org_unit);
        self
    }

    /// Adds a data view organisation unit.
    #[must_use]
    pub fn with_data_view_org_unit(mut self, org_unit: OrgUnitId) -> Self {
        self.data_view_organisation_units.insert(org_unit);
        self
    }

    /// Adds a user group membership.
    #[must_use]
    pub fn with_group(mut self, group: UserGroupId) -> Self {
        self.user_groups.insert(group);
        self
    }

    /// Sets the approval authorities.
    #[must_use]
    pub const fn with_authorities(mut self, authorities: ApprovalAuthorities) -> Self {
        self.authorities = authorities;
        self
    }

    /// Sets the dimension constraints.
    #[must_use]
    pub fn with_constraints(mut self, constraints: DimensionConstraints) -> Self {
        self.dimension_constraints = constraints;
        self
    }

    /// Organisation units whose data this user may view, falling back to the
    /// capture units when no view units are configured.
    #[must_use]
    pub fn data_view_org_units_with_fallback(&self) -> &BTreeSet<OrgUnitId> {
        if self.data_view_organisation_units.is_empty() {
            &self.organisation_units
        } else {
            &self.data_view_organisation_units
        }
    }

    /// Effective authorities; superusers hold all of them.
    #[must_use]
    pub fn effective_authorities(&self) -> ApprovalAuthorities {
        if self.superuser {
            ApprovalAuthorities::all()
        } else {
            self.authorities
        }
    }

    /// True if the user may see the default attribute option combo.
    #[must_use]
    pub fn may_see_default_combo(&self) -> bool {
        self.dimension_constraints.is_empty()
    }
}
