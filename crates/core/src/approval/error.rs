//! Approval error types.
//!
//! "Nothing to approve" outcomes are not errors: the resolver returns an
//! empty status list for them. Errors here cover invalid metadata, rejected
//! approval actions and store failures.

use rungs_shared::ErrorBody;
use rungs_shared::types::{ApprovalLevelId, CategoryOptionComboId, OrgUnitId};
use thiserror::Error;

use super::types::ApprovalKey;
use crate::category::CategoryError;
use crate::hierarchy::HierarchyError;
use crate::period::{PeriodError, PeriodType};

/// Errors that can occur while resolving or recording approvals.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// Workflow levels are not strictly ordered.
    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// The approval level does not belong to the workflow.
    #[error("Approval level {0} not found in workflow")]
    UnknownLevel(ApprovalLevelId),

    /// The attribute option combo is unknown or not used by the workflow.
    #[error("Attribute option combo {0} is not valid for this workflow")]
    InvalidOptionCombo(CategoryOptionComboId),

    /// The request period type differs from the workflow's.
    #[error("Period type {actual} does not match workflow period type {expected}")]
    PeriodTypeMismatch {
        /// Workflow period type.
        expected: PeriodType,
        /// Requested period type.
        actual: PeriodType,
    },

    /// An approval already exists for this key.
    #[error("Data approval already exists for {0}")]
    Duplicate(ApprovalKey),

    /// No approval exists for this key.
    #[error("Data approval not found for {0}")]
    NotFound(ApprovalKey),

    /// The data may not be approved.
    #[error("Data may not be approved for org unit {org_unit}: {reason}")]
    MayNotApprove {
        /// Organisation unit of the rejected action.
        org_unit: OrgUnitId,
        /// Why the action was rejected.
        reason: String,
    },

    /// The data may not be unapproved.
    #[error("Data may not be unapproved for org unit {org_unit}: {reason}")]
    MayNotUnapprove {
        /// Organisation unit of the rejected action.
        org_unit: OrgUnitId,
        /// Why the action was rejected.
        reason: String,
    },

    /// The data may not be accepted.
    #[error("Data may not be accepted for org unit {org_unit}: {reason}")]
    MayNotAccept {
        /// Organisation unit of the rejected action.
        org_unit: OrgUnitId,
        /// Why the action was rejected.
        reason: String,
    },

    /// The data may not be unaccepted.
    #[error("Data may not be unaccepted for org unit {org_unit}: {reason}")]
    MayNotUnaccept {
        /// Organisation unit of the rejected action.
        org_unit: OrgUnitId,
        /// Why the action was rejected.
        reason: String,
    },

    /// Organisation unit hierarchy error.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// Period error.
    #[error(transparent)]
    Period(#[from] PeriodError),

    /// Category catalog error.
    #[error(transparent)]
    Category(#[from] CategoryError),

    /// The backing store failed.
    #[error("Approval store error: {0}")]
    Store(String),
}

impl ApprovalError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidWorkflow(_)
            | Self::InvalidOptionCombo(_)
            | Self::PeriodTypeMismatch { .. } => 400,
            Self::UnknownLevel(_) | Self::NotFound(_) => 404,
            Self::Duplicate(_) => 409,
            Self::MayNotApprove { .. }
            | Self::MayNotUnapprove { .. }
            | Self::MayNotAccept { .. }
            | Self::MayNotUnaccept { .. } => 403,
            Self::Hierarchy(e) => e.status_code(),
            Self::Period(e) => e.status_code(),
            Self::Category(e) => e.status_code(),
            Self::Store(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidWorkflow(_) => "INVALID_WORKFLOW",
            Self::UnknownLevel(_) => "APPROVAL_LEVEL_NOT_FOUND",
            Self::InvalidOptionCombo(_) => "INVALID_OPTION_COMBO",
            Self::PeriodTypeMismatch { .. } => "PERIOD_TYPE_MISMATCH",
            Self::Duplicate(_) => "DUPLICATE_APPROVAL",
            Self::NotFound(_) => "APPROVAL_NOT_FOUND",
            Self::MayNotApprove { .. } => "MAY_NOT_APPROVE",
            Self::MayNotUnapprove { .. } => "MAY_NOT_UNAPPROVE",
            Self::MayNotAccept { .. } => "MAY_NOT_ACCEPT",
            Self::MayNotUnaccept { .. } => "MAY_NOT_UNACCEPT",
            Self::Hierarchy(e) => e.error_code(),
            Self::Period(e) => e.error_code(),
            Self::Category(e) => e.error_code(),
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

impl From<ApprovalError> for ErrorBody {
    fn from(err: ApprovalError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}
