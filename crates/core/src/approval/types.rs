//! Approval facts, states and statuses.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rungs_shared::types::{
    ApprovalLevelId, CategoryOptionComboId, DataApprovalId, OrgUnitId, PeriodId, Uid, UserId,
    WorkflowId,
};
use serde::{Deserialize, Serialize};

use super::levels::ApprovalLevel;

/// Approval state of one (org unit, attribute option combo) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataApprovalState {
    /// Approved at a level above the one visible to the user.
    ApprovedAbove,
    /// No approval level applies to this org unit.
    Unapprovable,
    /// Waiting for approval at a level above; nothing to do here.
    UnapprovedAbove,
    /// Ready for approval: everything below is approved.
    UnapprovedReady,
    /// Waiting for lower levels to approve.
    UnapprovedWaiting,
    /// Approved and accepted at this level.
    AcceptedHere,
    /// Approved but not accepted at this level.
    ApprovedHere,
}

impl DataApprovalState {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ApprovedAbove => "APPROVED_ABOVE",
            Self::Unapprovable => "UNAPPROVABLE",
            Self::UnapprovedAbove => "UNAPPROVED_ABOVE",
            Self::UnapprovedReady => "UNAPPROVED_READY",
            Self::UnapprovedWaiting => "UNAPPROVED_WAITING",
            Self::AcceptedHere => "ACCEPTED_HERE",
            Self::ApprovedHere => "APPROVED_HERE",
        }
    }

    /// Data counts as approved.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(
            self,
            Self::ApprovedAbove | Self::ApprovedHere | Self::AcceptedHere
        )
    }

    /// Data may be approved at this level or the next one up.
    #[must_use]
    pub const fn is_approvable(&self) -> bool {
        matches!(
            self,
            Self::UnapprovedReady | Self::ApprovedHere | Self::AcceptedHere
        )
    }

    /// The approval at this level may be withdrawn.
    #[must_use]
    pub const fn is_unapprovable(&self) -> bool {
        matches!(self, Self::ApprovedHere | Self::AcceptedHere)
    }

    /// The approval at this level is accepted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::AcceptedHere)
    }

    /// The approval at this level may be accepted.
    #[must_use]
    pub const fn is_acceptable(&self) -> bool {
        matches!(self, Self::ApprovedHere)
    }

    /// The acceptance at this level may be withdrawn.
    #[must_use]
    pub const fn is_unacceptable(&self) -> bool {
        matches!(self, Self::AcceptedHere)
    }
}

impl fmt::Display for DataApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataApprovalState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED_ABOVE" => Ok(Self::ApprovedAbove),
            "UNAPPROVABLE" => Ok(Self::Unapprovable),
            "UNAPPROVED_ABOVE" => Ok(Self::UnapprovedAbove),
            "UNAPPROVED_READY" => Ok(Self::UnapprovedReady),
            "UNAPPROVED_WAITING" => Ok(Self::UnapprovedWaiting),
            "ACCEPTED_HERE" => Ok(Self::AcceptedHere),
            "APPROVED_HERE" => Ok(Self::ApprovedHere),
            _ => Err(format!("Invalid approval state: {s}")),
        }
    }
}

/// The uniqueness tuple of a [`DataApproval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApprovalKey {
    /// Approval level.
    pub level: ApprovalLevelId,
    /// Workflow.
    pub workflow: WorkflowId,
    /// Workflow period.
    pub period: PeriodId,
    /// Approved organisation unit.
    pub org_unit: OrgUnitId,
    /// Attribute option combo.
    pub option_combo: CategoryOptionComboId,
}

impl fmt::Display for ApprovalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level {} workflow {} period {} org unit {} combo {}",
            self.level, self.workflow, self.period, self.org_unit, self.option_combo
        )
    }
}

/// A recorded approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataApproval {
    /// Unique identifier.
    pub id: DataApprovalId,
    /// Level, workflow, period, org unit and combo.
    pub key: ApprovalKey,
    /// Whether the approval has been accepted.
    pub accepted: bool,
    /// When the approval was recorded.
    pub created: DateTime<Utc>,
    /// Who recorded it.
    pub created_by: UserId,
    /// Last acceptance change.
    pub last_updated: DateTime<Utc>,
    /// Who made the last acceptance change.
    pub last_updated_by: UserId,
}

impl DataApproval {
    /// Creates a new approval record made now by `user`.
    #[must_use]
    pub fn new(key: ApprovalKey, accepted: bool, user: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: DataApprovalId::new(),
            key,
            accepted,
            created: now,
            created_by: user,
            last_updated: now,
            last_updated_by: user,
        }
    }

    /// Changes the accepted flag, stamping the change.
    pub fn set_accepted(&mut self, accepted: bool, user: UserId) {
        self.accepted = accepted;
        self.last_updated = Utc::now();
        self.last_updated_by = user;
    }
}

/// What the current user may do with a status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataApprovalPermissions {
    /// May approve.
    pub may_approve: bool,
    /// May unapprove.
    pub may_unapprove: bool,
    /// May accept.
    pub may_accept: bool,
    /// May unaccept.
    pub may_unaccept: bool,
    /// May read the underlying data.
    pub may_read_data: bool,
    /// When the approval was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Who made the approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<UserId>,
    /// When the acceptance last changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    /// Who last changed the acceptance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<UserId>,
}

/// Resolved approval status of one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataApprovalStatus {
    /// Resolved state.
    pub state: DataApprovalState,
    /// Most senior level approved at or above the org unit, within the
    /// user's levels.
    pub approved_level: Option<ApprovalLevel>,
    /// Org unit holding that approval.
    pub approved_org_unit: Option<OrgUnitId>,
    /// Level at which the next action applies.
    pub action_level: Option<ApprovalLevel>,
    /// UID of the org unit.
    pub org_unit_uid: Uid,
    /// Name of the org unit.
    pub org_unit_name: String,
    /// UID of the attribute option combo.
    pub option_combo_uid: Uid,
    /// Whether the approval is accepted.
    pub accepted: bool,
    /// Current user's permissions, when evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<DataApprovalPermissions>,
}
