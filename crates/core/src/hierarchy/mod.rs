//! Organisation unit hierarchy.
//!
//! Units form a forest; every unit carries an encoded ancestry path from
//! which its depth and ancestors are derived without touching parents.

mod error;
mod path;
mod tree;

#[cfg(test)]
mod tree_props;

pub use error::HierarchyError;
pub use path::{OrgUnitPath, PATH_SEPARATOR, SLOT_WIDTH, path_position_at_level};
pub use tree::{OrgUnitHierarchy, OrganisationUnit};
