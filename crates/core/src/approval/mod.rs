//! Data approval: workflows and levels, recorded approvals, state
//! resolution and approval actions.
//!
//! [`ApprovalStateResolver`] classifies every in-scope (org unit, attribute
//! option combo) pair for a user. [`DataApprovalService`] layers permissions
//! and the approve/unapprove/accept/unaccept actions on top of it.

mod error;
mod facts;
mod levels;
mod permissions;
mod resolver;
mod service;
mod settings;
mod store;
mod types;

#[cfg(test)]
mod resolver_props;

pub use error::ApprovalError;
pub use facts::{ApprovalFactIndex, HighestApproved};
pub use levels::{ApprovalLevel, LevelPlan, Workflow};
pub use permissions::PermissionsEvaluator;
pub use resolver::{ApprovalMetadata, ApprovalQuery, ApprovalStateResolver, PairFacts, classify};
pub use service::{ApprovalAction, DataApprovalService};
pub use settings::ApprovalSettings;
pub use store::{DataApprovalStore, MemoryApprovalStore};
pub use types::{
    ApprovalKey, DataApproval, DataApprovalPermissions, DataApprovalState, DataApprovalStatus,
};
