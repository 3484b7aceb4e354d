//! Approval actions and status lookups for the current user.

use std::collections::{BTreeMap, HashMap, HashSet};

use moka::sync::Cache;
use rungs_shared::types::{
    ApprovalLevelId, CategoryOptionComboId, OrgUnitId, PeriodId, WorkflowId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::ApprovalError;
use super::levels::{ApprovalLevel, Workflow};
use super::permissions::PermissionsEvaluator;
use super::resolver::{ApprovalQuery, ApprovalStateResolver};
use super::settings::ApprovalSettings;
use super::store::DataApprovalStore;
use super::types::{ApprovalKey, DataApproval, DataApprovalState, DataApprovalStatus};
use crate::period::{Period, PeriodError};
use crate::user::CurrentUser;

/// One requested approval action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalAction {
    /// Org unit to act on.
    pub org_unit: OrgUnitId,
    /// Attribute option combo to act on.
    pub option_combo: CategoryOptionComboId,
    /// Level to act at; defaults to the status's action level.
    #[serde(default)]
    pub level: Option<ApprovalLevelId>,
}

impl ApprovalAction {
    /// An action at the default level.
    #[must_use]
    pub const fn new(org_unit: OrgUnitId, option_combo: CategoryOptionComboId) -> Self {
        Self {
            org_unit,
            option_combo,
            level: None,
        }
    }

    /// An action at an explicit level.
    #[must_use]
    pub const fn at_level(mut self, level: ApprovalLevelId) -> Self {
        self.level = Some(level);
        self
    }
}

type StatusMap = HashMap<(OrgUnitId, CategoryOptionComboId), DataApprovalStatus>;
type ApprovedCacheKey = (WorkflowId, PeriodId, OrgUnitId, CategoryOptionComboId);

/// Approval service.
///
/// Every write is validated against freshly resolved statuses, and a single
/// invalid action rejects the whole batch before anything is written.
pub struct DataApprovalService<S: DataApprovalStore> {
    resolver: ApprovalStateResolver<S>,
    settings: ApprovalSettings,
    approved_cache: Cache<ApprovedCacheKey, bool>,
}

impl<S: DataApprovalStore> DataApprovalService<S> {
    /// Creates a service.
    pub fn new(resolver: ApprovalStateResolver<S>, settings: ApprovalSettings) -> Self {
        let approved_cache = Cache::builder()
            .max_capacity(settings.status_cache_capacity)
            .time_to_live(settings.status_cache_ttl)
            .build();

        Self {
            resolver,
            settings,
            approved_cache,
        }
    }

    /// The underlying resolver.
    #[must_use]
    pub fn resolver(&self) -> &ApprovalStateResolver<S> {
        &self.resolver
    }

    /// Settings applied to every call.
    #[must_use]
    pub const fn settings(&self) -> &ApprovalSettings {
        &self.settings
    }

    fn workflow_period<'p>(
        &'p self,
        workflow: &Workflow,
        period: &Period,
    ) -> Result<&'p Period, ApprovalError> {
        self.resolver
            .workflow_period(workflow, period)
            .ok_or_else(|| PeriodError::NotFound(period.id).into())
    }

    fn resolve_level<'w>(
        workflow: &'w Workflow,
        requested: Option<ApprovalLevelId>,
    ) -> Result<Option<&'w ApprovalLevel>, ApprovalError> {
        requested
            .map(|id| workflow.level(id).ok_or(ApprovalError::UnknownLevel(id)))
            .transpose()
    }

    /// Resolves statuses with permissions for every pair named by `actions`,
    /// one resolution per org unit.
    async fn status_map(
        &self,
        workflow: &Workflow,
        period: &Period,
        actions: &[ApprovalAction],
        user: &CurrentUser,
    ) -> Result<StatusMap, ApprovalError> {
        let metadata = self.resolver.metadata();
        let evaluator =
            PermissionsEvaluator::new(workflow, user, &metadata.hierarchy, &self.settings);

        let mut grouped: BTreeMap<OrgUnitId, Vec<CategoryOptionComboId>> = BTreeMap::new();
        for action in actions {
            grouped
                .entry(action.org_unit)
                .or_default()
                .push(action.option_combo);
        }

        let mut map = StatusMap::new();
        for (org_unit, combos) in grouped {
            let query = ApprovalQuery::new(workflow, period)
                .for_org_unit(org_unit)
                .with_option_combos(combos);
            for mut status in self
                .resolver
                .get_data_approvals(&query, user, &self.settings)
                .await?
            {
                status.permissions = Some(evaluator.evaluate(&status));
                if let Some(combo) = metadata
                    .catalog
                    .option_combo_by_uid(status.option_combo_uid.as_str())
                {
                    map.insert((org_unit, combo.id), status);
                }
            }
        }
        Ok(map)
    }

    fn check_option_combo(
        &self,
        workflow: &Workflow,
        combo: CategoryOptionComboId,
    ) -> Result<(), ApprovalError> {
        let catalog = &self.resolver.metadata().catalog;
        let valid = workflow.category_combos.iter().any(|id| {
            catalog
                .category_combo(*id)
                .is_some_and(|cc| cc.option_combos.contains(&combo))
        });
        if valid {
            Ok(())
        } else {
            info!(
                workflow = %workflow.name,
                combo = %combo,
                "Attribute option combo not valid for workflow"
            );
            Err(ApprovalError::InvalidOptionCombo(combo))
        }
    }

    fn approval_key(
        workflow: &Workflow,
        workflow_period: &Period,
        level: &ApprovalLevel,
        action: &ApprovalAction,
    ) -> ApprovalKey {
        ApprovalKey {
            level: level.id,
            workflow: workflow.id,
            period: workflow_period.id,
            org_unit: action.org_unit,
            option_combo: action.option_combo,
        }
    }

    /// Fetches the stored approvals for `keys`, failing if any is missing.
    async fn present_approvals(
        &self,
        keys: &[ApprovalKey],
        operation: &str,
    ) -> Result<Vec<DataApproval>, ApprovalError> {
        let mut present = Vec::with_capacity(keys.len());
        for key in keys {
            match self.resolver.store().get(key).await? {
                Some(approval) => present.push(approval),
                None => {
                    info!(operation, key = %key, "Approval not found");
                    return Err(ApprovalError::NotFound(*key));
                }
            }
        }
        Ok(present)
    }

    /// Drops repeated keys, keeping the first occurrence of each.
    fn dedupe_keys(keys: &mut Vec<ApprovalKey>) {
        let mut seen = HashSet::with_capacity(keys.len());
        keys.retain(|key| seen.insert(*key));
    }

    fn audit(action: &str, approval: &DataApproval, user: &CurrentUser) {
        info!(
            target: "rungs::audit",
            action,
            user = %user.username,
            level = %approval.key.level,
            workflow = %approval.key.workflow,
            period = %approval.key.period,
            org_unit = %approval.key.org_unit,
            combo = %approval.key.option_combo,
            accepted = approval.accepted,
            "Data approval change"
        );
    }

    /// Approves data. Returns the number of approvals recorded; actions
    /// already satisfied are skipped.
    pub async fn approve(
        &self,
        workflow: &Workflow,
        period: &Period,
        actions: &[ApprovalAction],
        user: &CurrentUser,
    ) -> Result<usize, ApprovalError> {
        debug!(items = actions.len(), "approve");
        let hierarchy = &self.resolver.metadata().hierarchy;
        let reject = |org_unit: OrgUnitId, reason: String| {
            info!(org_unit = %org_unit, reason = %reason, "Data may not be approved");
            ApprovalError::MayNotApprove { org_unit, reason }
        };

        for action in actions {
            self.check_option_combo(workflow, action.option_combo)?;
        }
        if period.period_type != workflow.period_type {
            info!(
                workflow = %workflow.name,
                period = %period.iso_code(),
                "Period type does not match workflow"
            );
            return Err(ApprovalError::PeriodTypeMismatch {
                expected: workflow.period_type,
                actual: period.period_type,
            });
        }

        let workflow_period = self.workflow_period(workflow, period)?;
        let statuses = self.status_map(workflow, period, actions, user).await?;
        let accepted = !self.settings.acceptance_required;
        let mut checked: Vec<DataApproval> = Vec::new();
        let mut seen = HashSet::new();

        for action in actions {
            let Some(status) = statuses.get(&(action.org_unit, action.option_combo)) else {
                return Err(reject(action.org_unit, "no approval status".to_string()));
            };
            let requested = Self::resolve_level(workflow, action.level)?;
            let action_level = status
                .action_level
                .as_ref()
                .and_then(|l| workflow.level(l.id));

            let level = if status.state.is_approved() {
                let Some(current) = action_level else {
                    return Err(reject(action.org_unit, "no actionable level".to_string()));
                };
                if requested.is_some_and(|r| r.level >= current.level) {
                    continue;
                }
                let Some(next) = workflow.next_higher_level(current) else {
                    continue;
                };
                match requested {
                    Some(r) if r.id != next.id => {
                        return Err(reject(
                            action.org_unit,
                            format!(
                                "approved at level {} is ready for level {}, not level {}",
                                current.level, next.level, r.level
                            ),
                        ));
                    }
                    _ => next,
                }
            } else {
                match (requested, action_level) {
                    (_, None) => {
                        return Err(reject(action.org_unit, "no actionable level".to_string()));
                    }
                    (Some(r), Some(current)) if r.id != current.id => {
                        return Err(reject(
                            action.org_unit,
                            format!("must first be approved at level {}", current.level),
                        ));
                    }
                    (_, Some(current)) => current,
                }
            };

            if !status.permissions.as_ref().is_some_and(|p| p.may_approve) {
                return Err(reject(action.org_unit, format!("state {}", status.state)));
            }

            let unit = hierarchy.require(action.org_unit)?;
            if unit.hierarchy_level() != level.org_unit_level {
                return Err(reject(
                    action.org_unit,
                    format!(
                        "org unit level {} does not match approval level {}",
                        unit.hierarchy_level(),
                        level.level
                    ),
                ));
            }

            let key = Self::approval_key(workflow, workflow_period, level, action);
            if seen.insert(key) {
                checked.push(DataApproval::new(key, accepted, user.id));
            }
        }

        let count = checked.len();
        for approval in &checked {
            Self::audit("approve", approval, user);
        }
        let saved = self.resolver.store().add_all(checked).await;
        self.approved_cache.invalidate_all();
        saved?;
        info!(count, "Approvals saved");
        Ok(count)
    }

    /// Withdraws approvals. Returns the number removed.
    pub async fn unapprove(
        &self,
        workflow: &Workflow,
        period: &Period,
        actions: &[ApprovalAction],
        user: &CurrentUser,
    ) -> Result<usize, ApprovalError> {
        debug!(items = actions.len(), "unapprove");
        let workflow_period = self.workflow_period(workflow, period)?;
        let statuses = self.status_map(workflow, period, actions, user).await?;
        let mut keys = Vec::new();

        for action in actions {
            let status = statuses.get(&(action.org_unit, action.option_combo));
            let level = Self::resolve_level(workflow, action.level)?.or_else(|| {
                status
                    .and_then(|s| s.action_level.as_ref())
                    .and_then(|l| workflow.level(l.id))
            });

            let (Some(status), Some(level)) = (status, level) else {
                return Err(ApprovalError::MayNotUnapprove {
                    org_unit: action.org_unit,
                    reason: "no approval status".to_string(),
                });
            };
            if !status.permissions.as_ref().is_some_and(|p| p.may_unapprove) {
                info!(
                    org_unit = %action.org_unit,
                    state = %status.state,
                    "Data may not be unapproved"
                );
                return Err(ApprovalError::MayNotUnapprove {
                    org_unit: action.org_unit,
                    reason: format!("state {}", status.state),
                });
            }
            let below_approval = status
                .approved_level
                .as_ref()
                .is_some_and(|approved| level.level < approved.level);
            if !status.state.is_approved() || below_approval {
                continue;
            }
            keys.push(Self::approval_key(workflow, workflow_period, level, action));
        }

        Self::dedupe_keys(&mut keys);
        let present = self.present_approvals(&keys, "unapprove").await?;
        for approval in &present {
            Self::audit("unapprove", approval, user);
        }
        let deleted = self.resolver.store().delete_all(&keys).await;
        self.approved_cache.invalidate_all();
        let deleted = deleted?;
        info!(deleted, "Approvals deleted");
        Ok(usize::try_from(deleted).unwrap_or(usize::MAX))
    }

    /// Accepts approvals. Returns the number accepted.
    pub async fn accept(
        &self,
        workflow: &Workflow,
        period: &Period,
        actions: &[ApprovalAction],
        user: &CurrentUser,
    ) -> Result<usize, ApprovalError> {
        self.set_acceptance(workflow, period, actions, user, true).await
    }

    /// Withdraws acceptances. Returns the number unaccepted.
    pub async fn unaccept(
        &self,
        workflow: &Workflow,
        period: &Period,
        actions: &[ApprovalAction],
        user: &CurrentUser,
    ) -> Result<usize, ApprovalError> {
        self.set_acceptance(workflow, period, actions, user, false).await
    }

    async fn set_acceptance(
        &self,
        workflow: &Workflow,
        period: &Period,
        actions: &[ApprovalAction],
        user: &CurrentUser,
        accept: bool,
    ) -> Result<usize, ApprovalError> {
        let operation = if accept { "accept" } else { "unaccept" };
        debug!(items = actions.len(), operation);
        let workflow_period = self.workflow_period(workflow, period)?;
        let statuses = self.status_map(workflow, period, actions, user).await?;
        let reject = |org_unit: OrgUnitId, state: Option<DataApprovalState>| {
            let reason =
                state.map_or_else(|| "no approval status".to_string(), |s| format!("state {s}"));
            info!(org_unit = %org_unit, reason = %reason, "Data may not be {operation}ed");
            if accept {
                ApprovalError::MayNotAccept { org_unit, reason }
            } else {
                ApprovalError::MayNotUnaccept { org_unit, reason }
            }
        };
        let mut keys = Vec::new();

        for action in actions {
            let status = statuses.get(&(action.org_unit, action.option_combo));
            let level = Self::resolve_level(workflow, action.level)?.or_else(|| {
                status
                    .and_then(|s| s.action_level.as_ref())
                    .and_then(|l| workflow.level(l.id))
            });
            let (Some(status), Some(level)) = (status, level) else {
                if accept {
                    return Err(reject(action.org_unit, None));
                }
                continue;
            };

            if let Some(approved) = status.approved_level.as_ref() {
                let satisfied = if accept {
                    (status.state.is_accepted() && level.level == approved.level)
                        || level.level > approved.level
                } else {
                    (!status.state.is_accepted() && level.level == approved.level)
                        || level.level < approved.level
                };
                if satisfied {
                    continue;
                }
            } else if !accept {
                continue;
            }

            let allowed = status
                .permissions
                .as_ref()
                .is_some_and(|p| if accept { p.may_accept } else { p.may_unaccept });
            if !allowed {
                return Err(reject(action.org_unit, Some(status.state)));
            }
            keys.push(Self::approval_key(workflow, workflow_period, level, action));
        }

        Self::dedupe_keys(&mut keys);
        let mut present = self.present_approvals(&keys, operation).await?;
        for approval in &mut present {
            approval.set_accepted(accept, user.id);
            Self::audit(operation, approval, user);
        }
        let updated = self.resolver.store().update_all(&present).await;
        self.approved_cache.invalidate_all();
        updated?;
        info!(count = present.len(), operation, "Acceptance changes saved");
        Ok(present.len())
    }

    /// Status of a single pair with permissions and approval audit fields.
    ///
    /// When nothing resolves for the pair, an `UNAPPROVABLE` status is
    /// returned.
    pub async fn get_data_approval_status(
        &self,
        workflow: &Workflow,
        period: &Period,
        org_unit: OrgUnitId,
        option_combo: CategoryOptionComboId,
        user: &CurrentUser,
    ) -> Result<DataApprovalStatus, ApprovalError> {
        let metadata = self.resolver.metadata();
        let query = ApprovalQuery::new(workflow, period)
            .for_org_unit(org_unit)
            .with_option_combos(vec![option_combo]);

        let resolved = self
            .resolver
            .get_data_approvals(&query, user, &self.settings)
            .await?
            .into_iter()
            .next();

        let mut status = match resolved {
            Some(status) => status,
            None => {
                let unit = metadata.hierarchy.require(org_unit)?;
                let combo = metadata
                    .catalog
                    .option_combo(option_combo)
                    .ok_or(ApprovalError::InvalidOptionCombo(option_combo))?;
                DataApprovalStatus {
                    state: DataApprovalState::Unapprovable,
                    approved_level: None,
                    approved_org_unit: None,
                    action_level: None,
                    org_unit_uid: unit.uid.clone(),
                    org_unit_name: unit.name.clone(),
                    option_combo_uid: combo.uid.clone(),
                    accepted: false,
                    permissions: None,
                }
            }
        };

        let evaluator =
            PermissionsEvaluator::new(workflow, user, &metadata.hierarchy, &self.settings);
        let mut permissions = evaluator.evaluate(&status);

        if let (Some(level), Some(approved_org_unit), Some(workflow_period)) = (
            status.approved_level.as_ref(),
            status.approved_org_unit,
            self.resolver.workflow_period(workflow, period),
        ) {
            let key = ApprovalKey {
                level: level.id,
                workflow: workflow.id,
                period: workflow_period.id,
                org_unit: approved_org_unit,
                option_combo,
            };
            if let Some(approval) = self.resolver.store().get(&key).await? {
                permissions.approved_at = Some(approval.created);
                permissions.approved_by = Some(approval.created_by);
                permissions.accepted_at = Some(approval.last_updated);
                if approval.accepted {
                    permissions.accepted_by = Some(approval.last_updated_by);
                }
            }
        }

        status.permissions = Some(permissions);
        Ok(status)
    }

    /// Resolver output with permissions attached.
    pub async fn get_user_data_approvals_and_permissions(
        &self,
        query: &ApprovalQuery<'_>,
        user: &CurrentUser,
    ) -> Result<Vec<DataApprovalStatus>, ApprovalError> {
        let evaluator = PermissionsEvaluator::new(
            query.workflow,
            user,
            &self.resolver.metadata().hierarchy,
            &self.settings,
        );
        let mut statuses = self
            .resolver
            .get_data_approvals(query, user, &self.settings)
            .await?;
        for status in &mut statuses {
            status.permissions = Some(evaluator.evaluate(status));
        }
        Ok(statuses)
    }

    /// True if the lowest approval level applicable to `org_unit` has
    /// approved the pair. Results are cached until the next write.
    pub async fn is_approved(
        &self,
        workflow: &Workflow,
        period: &Period,
        org_unit: OrgUnitId,
        option_combo: CategoryOptionComboId,
    ) -> Result<bool, ApprovalError> {
        let cache_key = (workflow.id, period.id, org_unit, option_combo);
        if let Some(approved) = self.approved_cache.get(&cache_key) {
            return Ok(approved);
        }

        let hierarchy = &self.resolver.metadata().hierarchy;
        let approval_key = hierarchy.get(org_unit).and_then(|unit| {
            let level = workflow.lowest_level_at_or_above(unit.hierarchy_level())?;
            let approver = hierarchy.ancestor_at_level(unit, level.org_unit_level)?;
            let workflow_period = self.resolver.workflow_period(workflow, period)?;
            Some(ApprovalKey {
                level: level.id,
                workflow: workflow.id,
                period: workflow_period.id,
                org_unit: approver.id,
                option_combo,
            })
        });

        let approved = match approval_key {
            Some(key) => self.resolver.store().get(&key).await?.is_some(),
            None => false,
        };
        self.approved_cache.insert(cache_key, approved);
        Ok(approved)
    }

    /// Deletes every approval recorded for an org unit.
    pub async fn delete_data_approvals(&self, org_unit: OrgUnitId) -> Result<u64, ApprovalError> {
        let deleted = self.resolver.store().delete_for_org_unit(org_unit).await?;
        self.approved_cache.invalidate_all();
        info!(
            target: "rungs::audit",
            org_unit = %org_unit,
            deleted,
            "Data approvals deleted for org unit"
        );
        Ok(deleted)
    }
}
