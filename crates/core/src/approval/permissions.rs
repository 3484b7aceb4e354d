//! What the current user may do with a resolved status.

use super::levels::{ApprovalLevel, Workflow};
use super::settings::ApprovalSettings;
use super::types::{DataApprovalPermissions, DataApprovalStatus};
use crate::hierarchy::OrgUnitHierarchy;
use crate::user::{ApprovalAuthorities, CurrentUser};

/// Evaluates permissions for one user and workflow.
#[derive(Debug, Clone)]
pub struct PermissionsEvaluator<'a> {
    workflow: &'a Workflow,
    user_level: Option<&'a ApprovalLevel>,
    authorities: ApprovalAuthorities,
    acceptance_required: bool,
}

impl<'a> PermissionsEvaluator<'a> {
    /// Creates an evaluator; the user's ceiling level is derived from their
    /// organisation units.
    #[must_use]
    pub fn new(
        workflow: &'a Workflow,
        user: &CurrentUser,
        hierarchy: &OrgUnitHierarchy,
        settings: &ApprovalSettings,
    ) -> Self {
        Self {
            workflow,
            user_level: workflow.user_approval_levels(user, hierarchy).first().copied(),
            authorities: user.effective_authorities(),
            acceptance_required: settings.acceptance_required,
        }
    }

    /// Computes the permissions for a status.
    #[must_use]
    pub fn evaluate(&self, status: &DataApprovalStatus) -> DataApprovalPermissions {
        let auth = self.authorities;
        let state = status.state;
        let mut permissions = DataApprovalPermissions {
            may_read_data: auth.view_unapproved_data || state.is_approved(),
            ..DataApprovalPermissions::default()
        };

        let (Some(user_level), Some(action)) = (self.user_level, status.action_level.as_ref())
        else {
            return permissions;
        };
        let user = user_level.level;
        let data = action.level;
        let next_higher = self.workflow.next_higher_level(action);

        let may_approve_at = |target: &ApprovalLevel| {
            (auth.approve && user == target.level)
                || (auth.approve_lower_levels && user < target.level)
        };
        let approve_target = if state.is_approved() {
            next_higher
        } else {
            Some(action)
        };
        let acceptance_done =
            !state.is_approved() || !self.acceptance_required || state.is_accepted();
        permissions.may_approve =
            state.is_approvable() && acceptance_done && approve_target.is_some_and(may_approve_at);

        let may_accept_or_unaccept = auth.accept_lower_levels
            && (next_higher.is_some_and(|n| n.level == user)
                || (auth.approve_lower_levels && user < data));
        permissions.may_accept = may_accept_or_unaccept && state.is_acceptable();
        permissions.may_unaccept = may_accept_or_unaccept && state.is_unacceptable();

        permissions.may_unapprove = state.is_unapprovable()
            && ((auth.approve && user == data && !state.is_accepted())
                || (auth.approve_lower_levels && user < data)
                || may_accept_or_unaccept);

        permissions.may_read_data |= permissions.may_approve || user >= data;
        permissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::DataApprovalState;
    use crate::period::PeriodType;
    use rungs_shared::types::{OrgUnitId, Uid};

    struct Fixture {
        hierarchy: OrgUnitHierarchy,
        workflow: Workflow,
        region: OrgUnitId,
        district: OrgUnitId,
    }

    fn fixture() -> Fixture {
        let mut hierarchy = OrgUnitHierarchy::new();
        let country = hierarchy.add_root("Country").unwrap();
        let region = hierarchy.add_child(country, "Region").unwrap();
        let district = hierarchy.add_child(region, "District").unwrap();
        let workflow = Workflow::new(
            "Monthly",
            PeriodType::Monthly,
            vec![
                ApprovalLevel::new("Country", 1, 1),
                ApprovalLevel::new("Region", 2, 2),
                ApprovalLevel::new("District", 3, 3),
            ],
        )
        .unwrap();
        Fixture {
            hierarchy,
            workflow,
            region,
            district,
        }
    }

    fn status(workflow: &Workflow, state: DataApprovalState, level: usize) -> DataApprovalStatus {
        let action = workflow.sorted_levels()[level].clone();
        let approved = state.is_unapprovable().then(|| action.clone());
        DataApprovalStatus {
            state,
            approved_level: approved,
            approved_org_unit: None,
            action_level: Some(action),
            org_unit_uid: Uid::generate(),
            org_unit_name: "District".to_string(),
            option_combo_uid: Uid::generate(),
            accepted: state.is_accepted(),
            permissions: None,
        }
    }

    fn district_user(f: &Fixture) -> CurrentUser {
        CurrentUser::new("district")
            .with_org_unit(f.district)
            .with_authorities(ApprovalAuthorities {
                approve: true,
                ..ApprovalAuthorities::default()
            })
    }

    fn region_user(f: &Fixture) -> CurrentUser {
        CurrentUser::new("region")
            .with_org_unit(f.region)
            .with_authorities(ApprovalAuthorities {
                approve: true,
                accept_lower_levels: true,
                ..ApprovalAuthorities::default()
            })
    }

    #[test]
    fn test_ready_data_may_be_approved_at_own_level() {
        let f = fixture();
        let settings = ApprovalSettings::with_acceptance_required(true);
        let user = district_user(&f);
        let evaluator = PermissionsEvaluator::new(&f.workflow, &user, &f.hierarchy, &settings);

        let p = evaluator.evaluate(&status(&f.workflow, DataApprovalState::UnapprovedReady, 2));
        assert!(p.may_approve);
        assert!(!p.may_unapprove);
        assert!(!p.may_accept);
        assert!(p.may_read_data);

        let p = evaluator.evaluate(&status(&f.workflow, DataApprovalState::UnapprovedReady, 1));
        assert!(!p.may_approve);
    }

    #[test]
    fn test_approved_data_may_be_unapproved_until_accepted() {
        let f = fixture();
        let settings = ApprovalSettings::with_acceptance_required(true);
        let user = district_user(&f);
        let evaluator = PermissionsEvaluator::new(&f.workflow, &user, &f.hierarchy, &settings);

        let p = evaluator.evaluate(&status(&f.workflow, DataApprovalState::ApprovedHere, 2));
        assert!(p.may_unapprove);
        assert!(!p.may_approve);

        let p = evaluator.evaluate(&status(&f.workflow, DataApprovalState::AcceptedHere, 2));
        assert!(!p.may_unapprove);
    }

    #[test]
    fn test_next_level_accepts_and_approves_upward() {
        let f = fixture();
        let settings = ApprovalSettings::with_acceptance_required(true);
        let user = region_user(&f);
        let evaluator = PermissionsEvaluator::new(&f.workflow, &user, &f.hierarchy, &settings);

        let approved = evaluator.evaluate(&status(&f.workflow, DataApprovalState::ApprovedHere, 2));
        assert!(approved.may_accept);
        assert!(!approved.may_unaccept);
        assert!(approved.may_unapprove);
        assert!(!approved.may_approve, "acceptance is required first");

        let accepted = evaluator.evaluate(&status(&f.workflow, DataApprovalState::AcceptedHere, 2));
        assert!(!accepted.may_accept);
        assert!(accepted.may_unaccept);
        assert!(accepted.may_approve);
    }

    #[test]
    fn test_user_without_levels_only_reads_approved_data() {
        let f = fixture();
        let settings = ApprovalSettings::default();
        let user = CurrentUser::new("nobody");
        let evaluator = PermissionsEvaluator::new(&f.workflow, &user, &f.hierarchy, &settings);

        let p = evaluator.evaluate(&status(&f.workflow, DataApprovalState::UnapprovedReady, 2));
        assert_eq!(p, DataApprovalPermissions::default());

        let p = evaluator.evaluate(&status(&f.workflow, DataApprovalState::ApprovedAbove, 2));
        assert!(p.may_read_data);
        assert!(!p.may_approve);
    }

    #[test]
    fn test_superuser_may_act_on_lower_levels() {
        let f = fixture();
        let settings = ApprovalSettings::default();
        let user = CurrentUser::superuser("admin");
        let evaluator = PermissionsEvaluator::new(&f.workflow, &user, &f.hierarchy, &settings);

        let p = evaluator.evaluate(&status(&f.workflow, DataApprovalState::ApprovedHere, 2));
        assert!(p.may_approve);
        assert!(p.may_unapprove);
        assert!(p.may_accept);
    }
}
