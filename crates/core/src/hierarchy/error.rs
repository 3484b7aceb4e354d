//! Organisation unit hierarchy errors.

use rungs_shared::types::{OrgUnitId, Uid};
use thiserror::Error;

/// Errors raised while building or querying the organisation unit tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// No organisation unit with this id is registered.
    #[error("Organisation unit {0} not found")]
    UnknownOrgUnit(OrgUnitId),

    /// The id is already registered.
    #[error("Organisation unit {0} already exists")]
    DuplicateId(OrgUnitId),

    /// The UID is already used by another organisation unit.
    #[error("Organisation unit UID {0} already in use")]
    DuplicateUid(Uid),

    /// The path is malformed or inconsistent with the unit it belongs to.
    #[error("Invalid organisation unit path '{0}'")]
    InvalidPath(String),

    /// Hierarchy levels are 1-based.
    #[error("Invalid hierarchy level {0}, levels start at 1")]
    InvalidLevel(u32),
}

impl HierarchyError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownOrgUnit(_) => 404,
            Self::DuplicateId(_) | Self::DuplicateUid(_) => 409,
            Self::InvalidPath(_) | Self::InvalidLevel(_) => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownOrgUnit(_) => "ORG_UNIT_NOT_FOUND",
            Self::DuplicateId(_) => "DUPLICATE_ORG_UNIT",
            Self::DuplicateUid(_) => "DUPLICATE_ORG_UNIT_UID",
            Self::InvalidPath(_) => "INVALID_ORG_UNIT_PATH",
            Self::InvalidLevel(_) => "INVALID_HIERARCHY_LEVEL",
        }
    }
}
