//! JSON snapshots of the metadata approval resolution reads.
//!
//! A snapshot carries everything owned by other subsystems: the org unit
//! tree, attribute categories, registered periods, workflows and users.
//! Ids are part of the snapshot so that recorded approvals keep matching
//! between loads.

use rungs_shared::types::{CategoryComboId, PeriodId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::approval::{ApprovalError, ApprovalMetadata, Workflow};
use crate::category::{
    CategoryCatalog, CategoryCombo, CategoryError, CategoryOption, CategoryOptionCombo,
};
use crate::hierarchy::{HierarchyError, OrgUnitHierarchy, OrganisationUnit};
use crate::period::{Period, PeriodCalendar, PeriodError};
use crate::user::CurrentUser;

/// Errors raised while loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The document is not valid JSON or has the wrong shape.
    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// Organisation units are inconsistent.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// Categories are inconsistent.
    #[error(transparent)]
    Category(#[from] CategoryError),

    /// A period code is invalid or periods overlap.
    #[error(transparent)]
    Period(#[from] PeriodError),

    /// A workflow is invalid.
    #[error(transparent)]
    Approval(#[from] ApprovalError),
}

/// A registered period: a stable id plus its ISO code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// Stable identifier.
    pub id: PeriodId,
    /// ISO code such as `202401` or `2024Q1`.
    pub iso: String,
}

/// Serialised metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSnapshot {
    /// Organisation units in any order.
    pub org_units: Vec<OrganisationUnit>,
    /// Category options.
    pub category_options: Vec<CategoryOption>,
    /// Attribute option combos, in enumeration order.
    pub option_combos: Vec<CategoryOptionCombo>,
    /// Category combos.
    pub category_combos: Vec<CategoryCombo>,
    /// The unconstrained default category combo.
    pub default_category_combo: Option<CategoryComboId>,
    /// Registered periods.
    pub periods: Vec<PeriodRecord>,
    /// Approval workflows.
    pub workflows: Vec<Workflow>,
    /// Users that may act.
    pub users: Vec<CurrentUser>,
}

/// A validated snapshot ready for resolution.
#[derive(Debug, Clone)]
pub struct LoadedMetadata {
    /// Hierarchy, catalog and calendar.
    pub metadata: ApprovalMetadata,
    /// Validated workflows.
    pub workflows: Vec<Workflow>,
    /// Known users.
    pub users: Vec<CurrentUser>,
}

impl LoadedMetadata {
    /// Finds a workflow by UID or name.
    #[must_use]
    pub fn workflow(&self, key: &str) -> Option<&Workflow> {
        self.workflows
            .iter()
            .find(|w| w.uid.as_str() == key || w.name == key)
    }

    /// Finds a user by username.
    #[must_use]
    pub fn user(&self, username: &str) -> Option<&CurrentUser> {
        self.users.iter().find(|u| u.username == username)
    }

    /// Finds a registered period by ISO code.
    #[must_use]
    pub fn period(&self, iso: &str) -> Option<&Period> {
        self.metadata.calendar.find_by_iso(iso)
    }
}

impl MetadataSnapshot {
    /// Parses a snapshot document.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validates the snapshot and builds the resolver metadata.
    pub fn load(self) -> Result<LoadedMetadata, SnapshotError> {
        let hierarchy = OrgUnitHierarchy::from_units(self.org_units)?;

        let mut catalog = CategoryCatalog::new();
        for option in self.category_options {
            catalog.add_option(option)?;
        }
        for combo in self.option_combos {
            catalog.add_option_combo(combo)?;
        }
        for combo in self.category_combos {
            catalog.add_category_combo(combo)?;
        }
        if let Some(id) = self.default_category_combo {
            catalog.set_default_category_combo(id)?;
        }

        let mut calendar = PeriodCalendar::new();
        for record in self.periods {
            let period = Period {
                id: record.id,
                ..Period::from_iso(&record.iso)?
            };
            calendar.add(period)?;
        }

        for workflow in &self.workflows {
            workflow.validate()?;
        }

        debug!(
            org_units = hierarchy.len(),
            workflows = self.workflows.len(),
            users = self.users.len(),
            "Metadata snapshot loaded"
        );

        Ok(LoadedMetadata {
            metadata: ApprovalMetadata {
                hierarchy,
                catalog,
                calendar,
            },
            workflows: self.workflows,
            users: self.users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "org_units": [
            {
                "id": "0190a000-0000-7000-8000-000000000002",
                "uid": "DiszpKrYNg8",
                "name": "District A",
                "path": "/ImspTQPwCqd/DiszpKrYNg8",
                "parent": "0190a000-0000-7000-8000-000000000001"
            },
            {
                "id": "0190a000-0000-7000-8000-000000000001",
                "uid": "ImspTQPwCqd",
                "name": "Root",
                "path": "/ImspTQPwCqd",
                "parent": null
            }
        ],
        "category_options": [
            {"id": "0190a000-0000-7000-8000-000000000010", "uid": "xYerKDKCefk", "name": "default"}
        ],
        "option_combos": [
            {
                "id": "0190a000-0000-7000-8000-000000000011",
                "uid": "HllvX50cXC0",
                "name": "default",
                "options": ["0190a000-0000-7000-8000-000000000010"]
            }
        ],
        "category_combos": [
            {
                "id": "0190a000-0000-7000-8000-000000000012",
                "uid": "bjDvmb4bfuf",
                "name": "default",
                "option_combos": ["0190a000-0000-7000-8000-000000000011"]
            }
        ],
        "default_category_combo": "0190a000-0000-7000-8000-000000000012",
        "periods": [{"id": "0190a000-0000-7000-8000-000000000020", "iso": "202401"}],
        "workflows": [
            {
                "id": "0190a000-0000-7000-8000-000000000030",
                "uid": "rIUL3hYOjJc",
                "name": "Monthly approval",
                "period_type": "Monthly",
                "levels": [
                    {"id": "0190a000-0000-7000-8000-000000000031", "name": "L1", "level": 1, "org_unit_level": 1},
                    {"id": "0190a000-0000-7000-8000-000000000032", "name": "L2", "level": 2, "org_unit_level": 2}
                ],
                "data_set_sources": ["0190a000-0000-7000-8000-000000000002"],
                "category_combos": ["0190a000-0000-7000-8000-000000000012"]
            }
        ],
        "users": [
            {"id": "0190a000-0000-7000-8000-000000000040", "username": "admin", "superuser": true}
        ]
    }"#;

    #[test]
    fn test_load_snapshot() {
        let loaded = MetadataSnapshot::from_json(SNAPSHOT).unwrap().load().unwrap();

        assert_eq!(loaded.metadata.hierarchy.len(), 2);
        let district = loaded.metadata.hierarchy.get_by_uid("DiszpKrYNg8").unwrap();
        assert_eq!(district.hierarchy_level(), 2);

        let period = loaded.period("202401").unwrap();
        assert_eq!(period.id.to_string(), "0190a000-0000-7000-8000-000000000020");

        let workflow = loaded.workflow("Monthly approval").unwrap();
        assert_eq!(workflow.sorted_levels().len(), 2);
        assert!(loaded.workflow("rIUL3hYOjJc").is_some());

        let admin = loaded.user("admin").unwrap();
        assert!(admin.superuser);
        assert!(loaded.metadata.catalog.default_option_combo().is_some());
    }

    #[test]
    fn test_invalid_snapshot_is_rejected() {
        let bad_period =
            r#"{"periods": [{"id": "0190a000-0000-7000-8000-000000000020", "iso": "202413"}]}"#;
        let err = MetadataSnapshot::from_json(bad_period).unwrap().load().unwrap_err();
        assert!(matches!(err, SnapshotError::Period(_)));

        let err = MetadataSnapshot::from_json("{\"org_units\": 3}").unwrap_err();
        assert!(matches!(err, SnapshotError::Json(_)));
    }
}
