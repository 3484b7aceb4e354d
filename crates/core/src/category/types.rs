//! Category options and attribute option combos.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rungs_shared::types::{
    CategoryComboId, CategoryOptionComboId, CategoryOptionId, OrgUnitId, Uid,
};
use serde::{Deserialize, Serialize};

use super::sharing::Sharing;
use crate::period::{Period, PeriodType};

/// A category option such as a funding partner or project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOption {
    /// Unique identifier.
    pub id: CategoryOptionId,
    /// Public identifier.
    pub uid: Uid,
    /// Display name.
    pub name: String,
    /// First day data may be reported against this option.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day data may be reported against this option.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Organisation units this option is restricted to; empty means none.
    #[serde(default)]
    pub org_units: BTreeSet<OrgUnitId>,
    /// Read access; public when omitted.
    #[serde(default = "Sharing::public")]
    pub sharing: Sharing,
}

impl CategoryOption {
    /// Creates a public, unrestricted option.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CategoryOptionId::new(),
            uid: Uid::generate(),
            name: name.into(),
            start_date: None,
            end_date: None,
            org_units: BTreeSet::new(),
            sharing: Sharing::public(),
        }
    }

    /// Sets the validity window.
    #[must_use]
    pub const fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Restricts the option to an organisation unit subtree.
    #[must_use]
    pub fn restricted_to(mut self, org_unit: OrgUnitId) -> Self {
        self.org_units.insert(org_unit);
        self
    }

    /// Replaces the sharing settings.
    #[must_use]
    pub fn with_sharing(mut self, sharing: Sharing) -> Self {
        self.sharing = sharing;
        self
    }

    /// True if reporting is restricted to specific organisation units.
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        !self.org_units.is_empty()
    }

    /// End date pushed forward by `open_periods` periods of `period_type`.
    #[must_use]
    pub fn adjusted_end_date(&self, period_type: PeriodType, open_periods: u32) -> Option<NaiveDate> {
        let end = self.end_date?;
        if open_periods == 0 {
            return Some(end);
        }
        let shifted = i32::try_from(open_periods)
            .ok()
            .and_then(|n| period_type.shift(end, n).ok());
        Some(shifted.unwrap_or(NaiveDate::MAX))
    }

    /// True if the validity window, with the end date extended, overlaps
    /// the period.
    #[must_use]
    pub fn is_valid_for(&self, period: &Period, period_type: PeriodType, open_periods: u32) -> bool {
        let starts_in_time = self.start_date.is_none_or(|start| start <= period.end_date);
        let ends_in_time = self
            .adjusted_end_date(period_type, open_periods)
            .is_none_or(|end| end >= period.start_date);
        starts_in_time && ends_in_time
    }
}

/// An attribute option combo: one option from each category of a combo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOptionCombo {
    /// Unique identifier.
    pub id: CategoryOptionComboId,
    /// Public identifier.
    pub uid: Uid,
    /// Display name.
    pub name: String,
    /// Options making up the combo.
    pub options: Vec<CategoryOptionId>,
}

impl CategoryOptionCombo {
    /// Creates a combo over the given options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: Vec<CategoryOptionId>) -> Self {
        Self {
            id: CategoryOptionComboId::new(),
            uid: Uid::generate(),
            name: name.into(),
            options,
        }
    }
}

/// A category combo and the option combos it expands to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCombo {
    /// Unique identifier.
    pub id: CategoryComboId,
    /// Public identifier.
    pub uid: Uid,
    /// Display name.
    pub name: String,
    /// Option combos belonging to this combo.
    pub option_combos: Vec<CategoryOptionComboId>,
}

impl CategoryCombo {
    /// Creates a category combo over the given option combos.
    #[must_use]
    pub fn new(name: impl Into<String>, option_combos: Vec<CategoryOptionComboId>) -> Self {
        Self {
            id: CategoryComboId::new(),
            uid: Uid::generate(),
            name: name.into(),
            option_combos,
        }
    }
}
