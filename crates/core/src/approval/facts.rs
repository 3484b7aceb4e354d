//! Per-request index over the approval facts of one workflow period.

use std::collections::{BTreeSet, HashMap};

use rungs_shared::types::{ApprovalLevelId, CategoryOptionComboId, OrgUnitId};

use super::levels::{ApprovalLevel, Workflow};
use super::types::DataApproval;
use crate::category::{CategoryCatalog, CategoryOptionCombo};
use crate::hierarchy::{OrgUnitHierarchy, OrganisationUnit};

/// The most senior approval found for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighestApproved<'a> {
    /// Approved level.
    pub level: &'a ApprovalLevel,
    /// Whether that approval is accepted.
    pub accepted: bool,
    /// Org unit holding the approval.
    pub org_unit: OrgUnitId,
}

type FactKey = (ApprovalLevelId, OrgUnitId, CategoryOptionComboId);

/// Answers the three approval predicates from an in-memory snapshot of the
/// facts. Absence is a normal result.
#[derive(Debug)]
pub struct ApprovalFactIndex<'a> {
    workflow: &'a Workflow,
    hierarchy: &'a OrgUnitHierarchy,
    catalog: &'a CategoryCatalog,
    accepted: HashMap<FactKey, bool>,
}

impl<'a> ApprovalFactIndex<'a> {
    /// Indexes the facts belonging to `workflow`; others are ignored.
    #[must_use]
    pub fn new(
        workflow: &'a Workflow,
        hierarchy: &'a OrgUnitHierarchy,
        catalog: &'a CategoryCatalog,
        approvals: &[DataApproval],
    ) -> Self {
        let accepted = approvals
            .iter()
            .filter(|a| a.key.workflow == workflow.id)
            .map(|a| ((a.key.level, a.key.org_unit, a.key.option_combo), a.accepted))
            .collect();

        Self {
            workflow,
            hierarchy,
            catalog,
            accepted,
        }
    }

    fn fact(
        &self,
        level: &ApprovalLevel,
        org_unit: OrgUnitId,
        combo: CategoryOptionComboId,
    ) -> Option<bool> {
        self.accepted.get(&(level.id, org_unit, combo)).copied()
    }

    /// Most senior approval at any of `allowed` levels recorded for an
    /// ancestor-or-self of `org_unit`.
    ///
    /// `allowed` must be ordered most senior first.
    #[must_use]
    pub fn highest_approved(
        &self,
        org_unit: &OrganisationUnit,
        combo: CategoryOptionComboId,
        allowed: &[&'a ApprovalLevel],
    ) -> Option<HighestApproved<'a>> {
        allowed.iter().find_map(|&level| {
            self.hierarchy
                .ancestors_or_self(org_unit)
                .find_map(|unit| {
                    self.fact(level, unit.id, combo).map(|accepted| HighestApproved {
                        level,
                        accepted,
                        org_unit: unit.id,
                    })
                })
        })
    }

    /// True if every org unit expected to approve at `below` under
    /// `org_unit` has done so (and accepted, when required).
    ///
    /// Only units with a data-set source at or beneath them, and admitted by
    /// the combo's option restrictions, are expected. With no level below,
    /// readiness holds vacuously.
    #[must_use]
    pub fn ready_below(
        &self,
        org_unit: &OrganisationUnit,
        combo: &CategoryOptionCombo,
        below: Option<&ApprovalLevel>,
        acceptance_required: bool,
    ) -> bool {
        let Some(below) = below else {
            return true;
        };
        let restrictions: Vec<&BTreeSet<OrgUnitId>> = self.catalog.restrictions(combo).collect();

        self.hierarchy
            .descendants_at_level(org_unit, below.org_unit_level)
            .filter(|lower| self.hierarchy.contains_any(lower, &self.workflow.data_set_sources))
            .filter(|lower| {
                restrictions
                    .iter()
                    .all(|units| self.hierarchy.is_within_any(lower, *units))
            })
            .all(|lower| match self.fact(below, lower.id, combo.id) {
                Some(accepted) => accepted || !acceptance_required,
                None => false,
            })
    }

    /// True if the ancestor-or-self of `org_unit` at `above`'s depth holds
    /// an approval at `above`. Always false without a level.
    #[must_use]
    pub fn approved_above(
        &self,
        org_unit: &OrganisationUnit,
        combo: CategoryOptionComboId,
        above: Option<&ApprovalLevel>,
    ) -> bool {
        let Some(above) = above else {
            return false;
        };
        self.hierarchy
            .ancestor_at_level(org_unit, above.org_unit_level)
            .is_some_and(|ancestor| self.fact(above, ancestor.id, combo).is_some())
    }

    /// Number of indexed facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    /// True if no fact is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalKey;
    use crate::category::{CategoryCombo, CategoryOption};
    use crate::period::PeriodType;
    use rungs_shared::types::{PeriodId, UserId};

    struct Fixture {
        hierarchy: OrgUnitHierarchy,
        catalog: CategoryCatalog,
        workflow: Workflow,
        root: OrgUnitId,
        north: OrgUnitId,
        south: OrgUnitId,
        open: CategoryOptionComboId,
        north_only: CategoryOptionComboId,
    }

    fn fixture() -> Fixture {
        let mut hierarchy = OrgUnitHierarchy::new();
        let root = hierarchy.add_root("Country").unwrap();
        let north = hierarchy.add_child(root, "North").unwrap();
        let south = hierarchy.add_child(root, "South").unwrap();

        let mut catalog = CategoryCatalog::new();
        let open_option = catalog.add_option(CategoryOption::new("Open")).unwrap();
        let open = catalog
            .add_option_combo(CategoryOptionCombo::new("Open", vec![open_option]))
            .unwrap();
        let north_option = catalog
            .add_option(CategoryOption::new("North project").restricted_to(north))
            .unwrap();
        let north_only = catalog
            .add_option_combo(CategoryOptionCombo::new("North project", vec![north_option]))
            .unwrap();
        catalog
            .add_category_combo(CategoryCombo::new("Projects", vec![open, north_only]))
            .unwrap();

        let workflow = Workflow::new(
            "Monthly",
            PeriodType::Monthly,
            vec![ApprovalLevel::new("Country", 1, 1), ApprovalLevel::new("Region", 2, 2)],
        )
        .unwrap()
        .with_source(north)
        .with_source(south);

        Fixture {
            hierarchy,
            catalog,
            workflow,
            root,
            north,
            south,
            open,
            north_only,
        }
    }

    fn approval(
        f: &Fixture,
        level: usize,
        org_unit: OrgUnitId,
        combo: CategoryOptionComboId,
        accepted: bool,
    ) -> DataApproval {
        let key = ApprovalKey {
            level: f.workflow.sorted_levels()[level].id,
            workflow: f.workflow.id,
            period: PeriodId::new(),
            org_unit,
            option_combo: combo,
        };
        DataApproval::new(key, accepted, UserId::new())
    }

    #[test]
    fn test_highest_approved_prefers_senior_ancestor() {
        let f = fixture();
        let approvals = vec![
            approval(&f, 1, f.north, f.open, false),
            approval(&f, 0, f.root, f.open, true),
        ];
        let index = ApprovalFactIndex::new(&f.workflow, &f.hierarchy, &f.catalog, &approvals);
        let north = f.hierarchy.get(f.north).unwrap();
        let levels: Vec<_> = f.workflow.sorted_levels().iter().collect();

        let highest = index.highest_approved(north, f.open, &levels).unwrap();
        assert_eq!(highest.level.level, 1);
        assert_eq!(highest.org_unit, f.root);
        assert!(highest.accepted);

        let highest = index.highest_approved(north, f.open, &levels[1..]).unwrap();
        assert_eq!(highest.org_unit, f.north);
        assert!(!highest.accepted);

        assert!(index.highest_approved(north, f.north_only, &levels).is_none());
    }

    #[test]
    fn test_ready_below_honours_acceptance_and_restrictions() {
        let f = fixture();
        let region = &f.workflow.sorted_levels()[1];
        let root = f.hierarchy.get(f.root).unwrap();
        let open = f.catalog.option_combo(f.open).unwrap();
        let north_only = f.catalog.option_combo(f.north_only).unwrap();

        let approvals = vec![
            approval(&f, 1, f.north, f.open, true),
            approval(&f, 1, f.south, f.open, false),
            approval(&f, 1, f.north, f.north_only, false),
        ];
        let index = ApprovalFactIndex::new(&f.workflow, &f.hierarchy, &f.catalog, &approvals);

        assert!(index.ready_below(root, open, Some(region), false));
        assert!(!index.ready_below(root, open, Some(region), true));
        assert!(index.ready_below(root, north_only, Some(region), false));
        assert!(index.ready_below(root, north_only, None, true));

        let index = ApprovalFactIndex::new(&f.workflow, &f.hierarchy, &f.catalog, &approvals[..1]);
        assert!(!index.ready_below(root, open, Some(region), false));
    }

    #[test]
    fn test_approved_above_checks_ancestor_at_level_depth() {
        let f = fixture();
        let country = &f.workflow.sorted_levels()[0];
        let approvals = vec![approval(&f, 0, f.root, f.open, false)];
        let index = ApprovalFactIndex::new(&f.workflow, &f.hierarchy, &f.catalog, &approvals);
        let south = f.hierarchy.get(f.south).unwrap();

        assert!(index.approved_above(south, f.open, Some(country)));
        assert!(!index.approved_above(south, f.north_only, Some(country)));
        assert!(!index.approved_above(south, f.open, None));
        assert_eq!(index.len(), 1);
    }
}
