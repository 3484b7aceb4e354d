//! Enumeration of the (org unit, attribute option combo) pairs in scope for
//! an approval request.

use std::collections::BTreeSet;

use rungs_shared::types::{CategoryComboId, CategoryOptionComboId, OrgUnitId};
use tracing::{debug, warn};

use super::catalog::CategoryCatalog;
use super::types::CategoryOptionCombo;
use crate::approval::Workflow;
use crate::hierarchy::{OrgUnitHierarchy, OrganisationUnit};
use crate::period::Period;
use crate::user::CurrentUser;

/// Which attribute option combos a request asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComboFilter {
    /// Only combos of this category combo.
    pub category_combo: Option<CategoryComboId>,
    /// Only these combos; empty means all.
    pub option_combos: Vec<CategoryOptionComboId>,
}

/// One pair to classify.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Organisation unit.
    pub org_unit: &'a OrganisationUnit,
    /// Attribute option combo.
    pub option_combo: &'a CategoryOptionCombo,
}

/// Produces candidate pairs for one user.
#[derive(Debug, Clone, Copy)]
pub struct CandidateEnumerator<'a> {
    hierarchy: &'a OrgUnitHierarchy,
    catalog: &'a CategoryCatalog,
    user: &'a CurrentUser,
}

impl<'a> CandidateEnumerator<'a> {
    /// Creates an enumerator.
    #[must_use]
    pub const fn new(
        hierarchy: &'a OrgUnitHierarchy,
        catalog: &'a CategoryCatalog,
        user: &'a CurrentUser,
    ) -> Self {
        Self {
            hierarchy,
            catalog,
            user,
        }
    }

    /// Organisation units to inspect: the target, or every visible unit at
    /// `level`. Units with no data-set source at or below them are dropped.
    #[must_use]
    pub fn org_units(
        &self,
        workflow: &Workflow,
        target: Option<&'a OrganisationUnit>,
        level: u32,
    ) -> Vec<&'a OrganisationUnit> {
        let visible = self.user.data_view_org_units_with_fallback();
        let units: Vec<&'a OrganisationUnit> = match target {
            Some(unit) => vec![unit],
            None => self
                .hierarchy
                .at_level(level)
                .filter(|unit| self.user.superuser || self.hierarchy.is_within_any(unit, visible))
                .collect(),
        };

        units
            .into_iter()
            .filter(|unit| self.hierarchy.contains_any(unit, &workflow.data_set_sources))
            .collect()
    }

    /// Option combos in scope, in catalog order.
    ///
    /// Returns `None` when the request explicitly asks for the default combo
    /// and the user is not allowed to see it.
    #[must_use]
    pub fn option_combos(
        &self,
        workflow: &Workflow,
        period: &Period,
        filter: &ComboFilter,
    ) -> Option<Vec<&'a CategoryOptionCombo>> {
        let may_see_default = self.user.may_see_default_combo();

        if !may_see_default
            && filter.option_combos.len() == 1
            && self.catalog.is_default(filter.option_combos[0])
        {
            warn!(
                user = %self.user.username,
                "Default attribute option combo requested but user may not see it"
            );
            return None;
        }

        let members: Option<BTreeSet<CategoryOptionComboId>> = filter
            .category_combo
            .map(|id| {
                self.catalog
                    .category_combo(id)
                    .map(|cc| cc.option_combos.iter().copied().collect())
                    .unwrap_or_default()
            });

        let combos = self
            .catalog
            .option_combos()
            .filter(|combo| members.as_ref().is_none_or(|m| m.contains(&combo.id)))
            .filter(|combo| {
                filter.option_combos.is_empty() || filter.option_combos.contains(&combo.id)
            })
            .filter(|combo| {
                let hidden = !may_see_default && self.catalog.is_default(combo.id);
                if hidden {
                    debug!(user = %self.user.username, "Skipping default option combo");
                }
                !hidden
            })
            .filter(|combo| {
                self.catalog.options_of(combo).all(|option| {
                    option.is_valid_for(
                        period,
                        workflow.period_type,
                        workflow.open_periods_after_co_end_date,
                    ) && option.sharing.can_read(self.user)
                })
            })
            .collect();

        Some(combos)
    }

    /// Pairs every org unit with every combo whose option restrictions admit
    /// it. Org units form the outer loop.
    #[must_use]
    pub fn candidates(
        &self,
        org_units: &[&'a OrganisationUnit],
        combos: &[&'a CategoryOptionCombo],
    ) -> Vec<Candidate<'a>> {
        let mut candidates = Vec::with_capacity(org_units.len() * combos.len());
        for &org_unit in org_units {
            for &option_combo in combos {
                if self.admits(option_combo, org_unit) {
                    candidates.push(Candidate {
                        org_unit,
                        option_combo,
                    });
                }
            }
        }
        candidates
    }

    /// Every restricted option must map to a unit related to `org_unit`.
    fn admits(&self, combo: &CategoryOptionCombo, org_unit: &OrganisationUnit) -> bool {
        self.catalog
            .restrictions(combo)
            .all(|units| self.related_to_any(org_unit, units))
    }

    fn related_to_any(&self, org_unit: &OrganisationUnit, units: &BTreeSet<OrgUnitId>) -> bool {
        units
            .iter()
            .filter_map(|id| self.hierarchy.get(*id))
            .any(|restriction| restriction.is_related_to(org_unit))
    }
}
