//! Approval levels, workflows and the per-request level plan.

use std::collections::BTreeSet;

use rungs_shared::types::{ApprovalLevelId, CategoryComboId, OrgUnitId, Uid, WorkflowId};
use serde::{Deserialize, Serialize};

use super::error::ApprovalError;
use crate::hierarchy::OrgUnitHierarchy;
use crate::period::PeriodType;
use crate::user::CurrentUser;

/// One rung of a workflow's sign-off hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalLevel {
    /// Unique identifier.
    pub id: ApprovalLevelId,
    /// Display name.
    pub name: String,
    /// Rank within the workflow; 1 is the most senior.
    pub level: u32,
    /// Organisation unit hierarchy level approved at this rung.
    pub org_unit_level: u32,
}

impl ApprovalLevel {
    /// Creates a level with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, level: u32, org_unit_level: u32) -> Self {
        Self {
            id: ApprovalLevelId::new(),
            name: name.into(),
            level,
            org_unit_level,
        }
    }
}

/// A data approval workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier.
    pub id: WorkflowId,
    /// Public identifier.
    pub uid: Uid,
    /// Display name.
    pub name: String,
    /// Period type approvals are recorded at.
    pub period_type: PeriodType,
    levels: Vec<ApprovalLevel>,
    /// Organisation units collecting data for this workflow's data sets.
    #[serde(default)]
    pub data_set_sources: BTreeSet<OrgUnitId>,
    /// Category combos of this workflow's data sets.
    #[serde(default)]
    pub category_combos: BTreeSet<CategoryComboId>,
    /// Periods after a category option's end date still open for data.
    #[serde(default)]
    pub open_periods_after_co_end_date: u32,
}

impl Workflow {
    /// Creates a workflow, sorting and validating its levels.
    pub fn new(
        name: impl Into<String>,
        period_type: PeriodType,
        mut levels: Vec<ApprovalLevel>,
    ) -> Result<Self, ApprovalError> {
        levels.sort_by_key(|l| l.level);
        validate_levels(&levels)?;

        Ok(Self {
            id: WorkflowId::new(),
            uid: Uid::generate(),
            name: name.into(),
            period_type,
            levels,
            data_set_sources: BTreeSet::new(),
            category_combos: BTreeSet::new(),
            open_periods_after_co_end_date: 0,
        })
    }

    /// Adds an organisation unit collecting data for the workflow.
    #[must_use]
    pub fn with_source(mut self, org_unit: OrgUnitId) -> Self {
        self.data_set_sources.insert(org_unit);
        self
    }

    /// Adds a category combo used by the workflow's data sets.
    #[must_use]
    pub fn with_category_combo(mut self, combo: CategoryComboId) -> Self {
        self.category_combos.insert(combo);
        self
    }

    /// Sets how many periods after a category option ends stay open.
    #[must_use]
    pub const fn with_open_periods_after_co_end_date(mut self, periods: u32) -> Self {
        self.open_periods_after_co_end_date = periods;
        self
    }

    /// Re-checks level ordering, e.g. after deserialisation.
    pub fn validate(&self) -> Result<(), ApprovalError> {
        validate_levels(&self.levels)
    }

    /// Levels ordered from most to least senior.
    #[must_use]
    pub fn sorted_levels(&self) -> &[ApprovalLevel] {
        &self.levels
    }

    /// Looks up a level of this workflow.
    #[must_use]
    pub fn level(&self, id: ApprovalLevelId) -> Option<&ApprovalLevel> {
        self.levels.iter().find(|l| l.id == id)
    }

    /// The level directly more senior than `level`, if any.
    #[must_use]
    pub fn next_higher_level(&self, level: &ApprovalLevel) -> Option<&ApprovalLevel> {
        let idx = self.levels.iter().position(|l| l.id == level.id)?;
        idx.checked_sub(1).map(|i| &self.levels[i])
    }

    /// The least senior level approving at or above `depth`.
    #[must_use]
    pub fn lowest_level_at_or_above(&self, depth: u32) -> Option<&ApprovalLevel> {
        self.levels.iter().rev().find(|l| l.org_unit_level <= depth)
    }

    /// Levels `user` is authorised for, most senior first.
    ///
    /// Superusers get every level. Other users get the levels at or below
    /// the shallowest of their data capture organisation units.
    #[must_use]
    pub fn user_approval_levels(
        &self,
        user: &CurrentUser,
        hierarchy: &OrgUnitHierarchy,
    ) -> Vec<&ApprovalLevel> {
        if user.superuser {
            return self.levels.iter().collect();
        }

        let Some(top) = user
            .organisation_units
            .iter()
            .filter_map(|id| hierarchy.get(*id))
            .map(|unit| unit.hierarchy_level())
            .min()
        else {
            return Vec::new();
        };

        self.levels
            .iter()
            .filter(|l| l.org_unit_level >= top)
            .collect()
    }
}

fn validate_levels(levels: &[ApprovalLevel]) -> Result<(), ApprovalError> {
    if levels.iter().any(|l| l.level == 0 || l.org_unit_level == 0) {
        return Err(ApprovalError::InvalidWorkflow(
            "levels and org unit levels start at 1".to_string(),
        ));
    }
    for pair in levels.windows(2) {
        if pair[0].level >= pair[1].level {
            return Err(ApprovalError::InvalidWorkflow(format!(
                "duplicate approval level {}",
                pair[1].level
            )));
        }
        if pair[0].org_unit_level > pair[1].org_unit_level {
            return Err(ApprovalError::InvalidWorkflow(format!(
                "approval level {} maps to a shallower org unit level than level {}",
                pair[1].level, pair[0].level
            )));
        }
    }
    Ok(())
}

/// Level-chain facts computed once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelPlan<'a> {
    /// Most senior workflow level.
    pub highest: &'a ApprovalLevel,
    /// Most senior level the user is authorised for.
    pub highest_user: &'a ApprovalLevel,
    /// Level directly more senior than the user's ceiling.
    pub above_user: Option<&'a ApprovalLevel>,
    /// Level approving exactly at the target org unit depth.
    pub lowest_for_org_unit: Option<&'a ApprovalLevel>,
    /// Nearest level approving above the target depth.
    pub above_org_unit: Option<&'a ApprovalLevel>,
    /// Nearest level approving below the target depth.
    pub below_org_unit: Option<&'a ApprovalLevel>,
    /// Level whose approval makes data "approved above".
    pub approved_above: Option<&'a ApprovalLevel>,
    /// Target org unit depth.
    pub org_unit_level: u32,
}

impl<'a> LevelPlan<'a> {
    /// Builds the plan.
    ///
    /// `target_level` is the hierarchy level of the requested org unit, or
    /// `None` when every org unit at the deepest configured level is
    /// requested. Returns `None` if the workflow or the user has no levels.
    #[must_use]
    pub fn build(
        levels: &'a [ApprovalLevel],
        user_levels: &[&'a ApprovalLevel],
        target_level: Option<u32>,
    ) -> Option<Self> {
        let highest = levels.first()?;
        let highest_user = *user_levels.first()?;
        let org_unit_level = match target_level {
            Some(level) => level,
            None => levels.last()?.org_unit_level,
        };

        let mut plan = Self {
            highest,
            highest_user,
            above_user: None,
            lowest_for_org_unit: None,
            above_org_unit: None,
            below_org_unit: None,
            approved_above: None,
            org_unit_level,
        };

        for level in levels {
            if level.level < highest_user.level {
                plan.above_user = Some(level);
            }

            if plan.below_org_unit.is_some() {
                continue;
            }
            match level.org_unit_level.cmp(&org_unit_level) {
                std::cmp::Ordering::Less => plan.above_org_unit = Some(level),
                std::cmp::Ordering::Equal => plan.lowest_for_org_unit = Some(level),
                std::cmp::Ordering::Greater => plan.below_org_unit = Some(level),
            }
        }

        let at_user_depth = org_unit_level == highest_user.org_unit_level;
        plan.approved_above = if highest_user.level != highest.level
            && (target_level.is_none() || at_user_depth)
        {
            plan.above_user
        } else if target_level.is_some() && !at_user_depth {
            plan.above_org_unit
        } else {
            None
        };

        Some(plan)
    }
}
