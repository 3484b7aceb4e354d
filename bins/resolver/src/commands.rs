//! Command execution against the approval service.

use rungs_core::approval::{
    ApprovalAction, ApprovalMetadata, ApprovalQuery, DataApprovalService, DataApprovalStore,
    Workflow,
};
use rungs_core::period::Period;
use rungs_core::user::CurrentUser;
use rungs_shared::types::{ApprovalLevelId, CategoryOptionComboId, OrgUnitId};
use rungs_shared::{AppError, AppResult, ErrorBody};
use serde_json::{Value, json};

use super::{ActionArgs, Command};

fn org_unit(metadata: &ApprovalMetadata, uid: &str) -> AppResult<OrgUnitId> {
    metadata
        .hierarchy
        .get_by_uid(uid)
        .map(|unit| unit.id)
        .ok_or_else(|| AppError::NotFound(format!("org unit '{uid}'")))
}

fn option_combo(metadata: &ApprovalMetadata, uid: &str) -> AppResult<CategoryOptionComboId> {
    metadata
        .catalog
        .option_combo_by_uid(uid)
        .map(|combo| combo.id)
        .ok_or_else(|| AppError::NotFound(format!("attribute option combo '{uid}'")))
}

fn level(workflow: &Workflow, number: u32) -> AppResult<ApprovalLevelId> {
    workflow
        .sorted_levels()
        .iter()
        .find(|l| l.level == number)
        .map(|level| level.id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "approval level {number} in workflow '{}'",
                workflow.name
            ))
        })
}

fn actions(
    metadata: &ApprovalMetadata,
    workflow: &Workflow,
    args: &ActionArgs,
) -> AppResult<Vec<ApprovalAction>> {
    let combo = option_combo(metadata, &args.combo)?;
    let level = args.level.map(|n| level(workflow, n)).transpose()?;

    args.org_units
        .iter()
        .map(|uid| {
            let action = ApprovalAction::new(org_unit(metadata, uid)?, combo);
            Ok(match level {
                Some(level) => action.at_level(level),
                None => action,
            })
        })
        .collect()
}

/// Runs one command and returns its JSON output.
///
/// Approval failures keep their own error codes in the returned body.
pub async fn run<S: DataApprovalStore>(
    command: Command,
    service: &DataApprovalService<S>,
    workflow: &Workflow,
    period: &Period,
    user: &CurrentUser,
) -> Result<Value, ErrorBody> {
    let metadata = service.resolver().metadata();

    let output = match command {
        Command::Status {
            org_unit: unit,
            category_combo,
            ..
        } => {
            let mut query = ApprovalQuery::new(workflow, period);
            if let Some(uid) = unit {
                query = query.for_org_unit(org_unit(metadata, &uid)?);
            }
            if let Some(uid) = category_combo {
                let combo = metadata
                    .catalog
                    .category_combo_by_uid(&uid)
                    .ok_or_else(|| AppError::NotFound(format!("category combo '{uid}'")))?;
                query = query.with_category_combo(combo.id);
            }
            let statuses = service
                .get_user_data_approvals_and_permissions(&query, user)
                .await?;
            serde_json::to_value(statuses).map_err(|e| AppError::Internal(e.to_string()))?
        }
        Command::Approve(args) => {
            let actions = actions(metadata, workflow, &args)?;
            let count = service.approve(workflow, period, &actions, user).await?;
            json!({ "approved": count })
        }
        Command::Unapprove(args) => {
            let actions = actions(metadata, workflow, &args)?;
            let count = service.unapprove(workflow, period, &actions, user).await?;
            json!({ "unapproved": count })
        }
        Command::Accept(args) => {
            let actions = actions(metadata, workflow, &args)?;
            let count = service.accept(workflow, period, &actions, user).await?;
            json!({ "accepted": count })
        }
        Command::Unaccept(args) => {
            let actions = actions(metadata, workflow, &args)?;
            let count = service.unaccept(workflow, period, &actions, user).await?;
            json!({ "unaccepted": count })
        }
        Command::IsApproved {
            org_unit: unit,
            combo,
            ..
        } => {
            let unit = org_unit(metadata, &unit)?;
            let combo = option_combo(metadata, &combo)?;
            let approved = service.is_approved(workflow, period, unit, combo).await?;
            json!({ "approved": approved })
        }
    };

    Ok(output)
}
