//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `WorkflowId` where an `OrgUnitId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a user.");
typed_id!(UserGroupId, "Unique identifier for a user group.");
typed_id!(OrgUnitId, "Unique identifier for an organisation unit.");
typed_id!(WorkflowId, "Unique identifier for a data approval workflow.");
typed_id!(
    ApprovalLevelId,
    "Unique identifier for a data approval level."
);
typed_id!(PeriodId, "Unique identifier for a reporting period.");
typed_id!(CategoryOptionId, "Unique identifier for a category option.");
typed_id!(
    CategoryOptionComboId,
    "Unique identifier for an attribute option combination."
);
typed_id!(CategoryComboId, "Unique identifier for a category combination.");
typed_id!(DataApprovalId, "Unique identifier for a recorded data approval.");

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
