//! Classification of every in-scope pair into an approval state.

use std::sync::Arc;

use rayon::prelude::*;
use rungs_shared::types::{CategoryComboId, CategoryOptionComboId, OrgUnitId};
use tracing::{debug, warn};

use super::error::ApprovalError;
use super::facts::ApprovalFactIndex;
use super::levels::{ApprovalLevel, LevelPlan, Workflow};
use super::settings::ApprovalSettings;
use super::store::DataApprovalStore;
use super::types::{DataApprovalState, DataApprovalStatus};
use crate::category::{Candidate, CandidateEnumerator, CategoryCatalog, ComboFilter};
use crate::hierarchy::OrgUnitHierarchy;
use crate::period::{Period, PeriodCalendar};
use crate::user::CurrentUser;

/// Collaborator-owned metadata the resolver reads.
#[derive(Debug, Clone, Default)]
pub struct ApprovalMetadata {
    /// Organisation unit tree.
    pub hierarchy: OrgUnitHierarchy,
    /// Attribute categories.
    pub catalog: CategoryCatalog,
    /// Registered periods.
    pub calendar: PeriodCalendar,
}

/// One approval status request.
#[derive(Debug, Clone)]
pub struct ApprovalQuery<'a> {
    /// Workflow to resolve.
    pub workflow: &'a Workflow,
    /// Requested period.
    pub period: &'a Period,
    /// A single org unit, or every org unit at the deepest level.
    pub org_unit: Option<OrgUnitId>,
    /// Attribute combo restrictions.
    pub combos: ComboFilter,
}

impl<'a> ApprovalQuery<'a> {
    /// Requests every pair of the workflow in the period.
    #[must_use]
    pub fn new(workflow: &'a Workflow, period: &'a Period) -> Self {
        Self {
            workflow,
            period,
            org_unit: None,
            combos: ComboFilter::default(),
        }
    }

    /// Restricts the request to one org unit.
    #[must_use]
    pub const fn for_org_unit(mut self, org_unit: OrgUnitId) -> Self {
        self.org_unit = Some(org_unit);
        self
    }

    /// Restricts the request to the combos of one category combo.
    #[must_use]
    pub const fn with_category_combo(mut self, combo: CategoryComboId) -> Self {
        self.combos.category_combo = Some(combo);
        self
    }

    /// Restricts the request to specific option combos.
    #[must_use]
    pub fn with_option_combos(mut self, combos: Vec<CategoryOptionComboId>) -> Self {
        self.combos.option_combos = combos;
        self
    }
}

/// Facts about one pair that decide its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairFacts {
    /// Approved at the "approved above" level, after suppression.
    pub approved_above: bool,
    /// Approved at one of the user's levels.
    pub approved: bool,
    /// That approval is accepted.
    pub accepted: bool,
    /// Some level approves exactly at the org unit's depth.
    pub has_level_for_org_unit: bool,
    /// Some level approves above the org unit's depth.
    pub has_level_above_org_unit: bool,
    /// Everything expected below is approved.
    pub ready_below: bool,
}

/// Maps pair facts to a state.
#[must_use]
pub fn classify(facts: &PairFacts) -> DataApprovalState {
    if facts.approved_above {
        DataApprovalState::ApprovedAbove
    } else if !facts.approved {
        match (facts.has_level_for_org_unit, facts.has_level_above_org_unit) {
            (true, _) if facts.ready_below => DataApprovalState::UnapprovedReady,
            (true, _) => DataApprovalState::UnapprovedWaiting,
            (false, true) => DataApprovalState::UnapprovedAbove,
            (false, false) => DataApprovalState::Unapprovable,
        }
    } else if facts.accepted {
        DataApprovalState::AcceptedHere
    } else {
        DataApprovalState::ApprovedHere
    }
}

fn same_level(a: Option<&ApprovalLevel>, b: Option<&ApprovalLevel>) -> bool {
    a.map(|l| l.id) == b.map(|l| l.id)
}

/// Resolves approval states from metadata and recorded facts.
pub struct ApprovalStateResolver<S: DataApprovalStore> {
    store: Arc<S>,
    metadata: Arc<ApprovalMetadata>,
}

impl<S: DataApprovalStore> Clone for ApprovalStateResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            metadata: Arc::clone(&self.metadata),
        }
    }
}

impl<S: DataApprovalStore> ApprovalStateResolver<S> {
    /// Creates a resolver.
    pub fn new(store: Arc<S>, metadata: Arc<ApprovalMetadata>) -> Self {
        Self { store, metadata }
    }

    /// The metadata this resolver reads.
    #[must_use]
    pub fn metadata(&self) -> &ApprovalMetadata {
        &self.metadata
    }

    /// The backing fact store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The registered workflow period containing the end of `period`.
    #[must_use]
    pub fn workflow_period(&self, workflow: &Workflow, period: &Period) -> Option<&Period> {
        self.metadata
            .calendar
            .workflow_period(workflow.period_type, period.end_date)
    }

    /// Resolves the status of every pair in scope of `query` for `user`.
    ///
    /// Configuration gaps and denied visibility yield an empty list; only
    /// store failures are errors. Output order follows org units, then
    /// option combos, and is stable between calls.
    pub async fn get_data_approvals(
        &self,
        query: &ApprovalQuery<'_>,
        user: &CurrentUser,
        settings: &ApprovalSettings,
    ) -> Result<Vec<DataApprovalStatus>, ApprovalError> {
        let ApprovalMetadata {
            hierarchy, catalog, ..
        } = self.metadata.as_ref();
        let workflow = query.workflow;

        let levels = workflow.sorted_levels();
        if levels.is_empty() {
            warn!(workflow = %workflow.name, "No approval levels configured for workflow");
            return Ok(Vec::new());
        }

        let user_levels = workflow.user_approval_levels(user, hierarchy);
        if user_levels.is_empty() {
            warn!(
                user = %user.username,
                workflow = %workflow.name,
                "No user approval levels for workflow"
            );
            return Ok(Vec::new());
        }

        let target = match query.org_unit {
            None => None,
            Some(id) => {
                let Some(unit) = hierarchy.get(id) else {
                    warn!(org_unit = %id, "Unknown org unit in approval request");
                    return Ok(Vec::new());
                };
                if !user.superuser
                    && !hierarchy.is_within_any(unit, user.data_view_org_units_with_fallback())
                {
                    debug!(user = %user.username, org_unit = %unit.name, "User can't see org unit");
                    return Ok(Vec::new());
                }
                Some(unit)
            }
        };

        let Some(plan) =
            LevelPlan::build(levels, &user_levels, target.map(|t| t.hierarchy_level()))
        else {
            return Ok(Vec::new());
        };
        debug!(
            workflow = %workflow.name,
            levels = levels.len(),
            user_levels = user_levels.len(),
            lowest_for_org_unit = ?plan.lowest_for_org_unit.map(|l| l.level),
            above_org_unit = ?plan.above_org_unit.map(|l| l.level),
            below_org_unit = ?plan.below_org_unit.map(|l| l.level),
            above_user = ?plan.above_user.map(|l| l.level),
            approved_above = ?plan.approved_above.map(|l| l.level),
            "Approval level plan"
        );

        let enumerator = CandidateEnumerator::new(hierarchy, catalog, user);
        let Some(combos) = enumerator.option_combos(workflow, query.period, &query.combos) else {
            return Ok(Vec::new());
        };
        let org_units = enumerator.org_units(workflow, target, plan.org_unit_level);
        let candidates = enumerator.candidates(&org_units, &combos);

        let approvals = match self.workflow_period(workflow, query.period) {
            Some(period) => self.store.list_for_period(workflow.id, period.id).await?,
            None => Vec::new(),
        };
        let index = ApprovalFactIndex::new(workflow, hierarchy, catalog, &approvals);

        debug!(
            user = %user.username,
            superuser = user.superuser,
            period = %query.period.iso_code(),
            candidates = candidates.len(),
            facts = index.len(),
            "Resolving approval states"
        );

        let statuses = candidates
            .par_iter()
            .map(|candidate| resolve_pair(&plan, &index, candidate, &user_levels, settings))
            .collect();

        Ok(statuses)
    }
}

fn resolve_pair<'a>(
    plan: &LevelPlan<'a>,
    index: &ApprovalFactIndex<'a>,
    candidate: &Candidate<'_>,
    user_levels: &[&'a ApprovalLevel],
    settings: &ApprovalSettings,
) -> DataApprovalStatus {
    let Candidate {
        org_unit,
        option_combo,
    } = *candidate;

    let highest = index.highest_approved(org_unit, option_combo.id, user_levels);
    let approved_level = highest.map(|h| h.level);
    let accepted = highest.is_some_and(|h| h.accepted);

    let mut approved_above = index.approved_above(org_unit, option_combo.id, plan.approved_above);
    if approved_above && accepted && same_level(plan.approved_above, plan.above_user) {
        approved_above = false;
    }

    let facts = PairFacts {
        approved_above,
        approved: approved_level.is_some(),
        accepted,
        has_level_for_org_unit: plan.lowest_for_org_unit.is_some(),
        has_level_above_org_unit: plan.above_org_unit.is_some(),
        ready_below: index.ready_below(
            org_unit,
            option_combo,
            plan.below_org_unit,
            settings.acceptance_required,
        ),
    };

    DataApprovalStatus {
        state: classify(&facts),
        approved_level: approved_level.cloned(),
        approved_org_unit: highest.map(|h| h.org_unit),
        action_level: approved_level.or(plan.lowest_for_org_unit).cloned(),
        org_unit_uid: org_unit.uid.clone(),
        org_unit_name: org_unit.name.clone(),
        option_combo_uid: option_combo.uid.clone(),
        accepted,
        permissions: None,
    }
}
