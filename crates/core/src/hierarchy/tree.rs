//! In-memory organisation unit tree.

use std::collections::{BTreeMap, HashMap};

use rungs_shared::types::{OrgUnitId, Uid};
use serde::{Deserialize, Serialize};

use super::error::HierarchyError;
use super::path::OrgUnitPath;

/// A node of the organisation unit tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationUnit {
    /// Internal identifier.
    pub id: OrgUnitId,
    /// Public 11-character identifier, also used in paths.
    pub uid: Uid,
    /// Display name.
    pub name: String,
    /// Ancestry path ending with this unit's own UID.
    pub path: OrgUnitPath,
    /// Parent unit, `None` for roots.
    pub parent: Option<OrgUnitId>,
}

impl OrganisationUnit {
    /// Depth in the tree; roots are at level 1.
    #[must_use]
    pub fn hierarchy_level(&self) -> u32 {
        self.path.depth()
    }

    /// True if `other` is this unit or one of its descendants.
    #[must_use]
    pub fn is_ancestor_or_self_of(&self, other: &OrganisationUnit) -> bool {
        other.path.has_at_level(&self.uid, self.hierarchy_level())
    }

    /// True if either unit is an ancestor-or-self of the other.
    #[must_use]
    pub fn is_related_to(&self, other: &OrganisationUnit) -> bool {
        self.is_ancestor_or_self_of(other) || other.is_ancestor_or_self_of(self)
    }
}

/// Arena of organisation units indexed by id, UID, and level.
#[derive(Debug, Clone, Default)]
pub struct OrgUnitHierarchy {
    units: Vec<OrganisationUnit>,
    by_id: HashMap<OrgUnitId, usize>,
    by_uid: HashMap<Uid, usize>,
    by_level: BTreeMap<u32, Vec<usize>>,
}

impl OrgUnitHierarchy {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a hierarchy from pre-existing units.
    ///
    /// Units may come in any order; they are inserted shallowest first so
    /// that every parent is known before its children.
    pub fn from_units(
        units: impl IntoIterator<Item = OrganisationUnit>,
    ) -> Result<Self, HierarchyError> {
        let mut units: Vec<_> = units.into_iter().collect();
        units.sort_by_key(OrganisationUnit::hierarchy_level);

        let mut hierarchy = Self::new();
        for unit in units {
            hierarchy.insert(unit)?;
        }
        Ok(hierarchy)
    }

    /// Adds a new root unit with a generated UID.
    pub fn add_root(&mut self, name: impl Into<String>) -> Result<OrgUnitId, HierarchyError> {
        let uid = self.fresh_uid();
        self.insert(OrganisationUnit {
            id: OrgUnitId::new(),
            path: OrgUnitPath::root(&uid),
            uid,
            name: name.into(),
            parent: None,
        })
    }

    /// Adds a new child of `parent` with a generated UID.
    pub fn add_child(
        &mut self,
        parent: OrgUnitId,
        name: impl Into<String>,
    ) -> Result<OrgUnitId, HierarchyError> {
        let parent_path = self
            .get(parent)
            .ok_or(HierarchyError::UnknownOrgUnit(parent))?
            .path
            .clone();
        let uid = self.fresh_uid();
        self.insert(OrganisationUnit {
            id: OrgUnitId::new(),
            path: parent_path.child(&uid),
            uid,
            name: name.into(),
            parent: Some(parent),
        })
    }

    /// Inserts a fully specified unit after checking it against the tree.
    pub fn insert(&mut self, unit: OrganisationUnit) -> Result<OrgUnitId, HierarchyError> {
        if self.by_id.contains_key(&unit.id) {
            return Err(HierarchyError::DuplicateId(unit.id));
        }
        if self.by_uid.contains_key(&unit.uid) {
            return Err(HierarchyError::DuplicateUid(unit.uid));
        }
        if unit.path.leaf_uid() != unit.uid.as_str() {
            return Err(HierarchyError::InvalidPath(unit.path.to_string()));
        }

        match (unit.parent, unit.path.parent()) {
            (None, None) => {}
            (Some(parent_id), Some(parent_path)) => {
                let parent = self
                    .get(parent_id)
                    .ok_or(HierarchyError::UnknownOrgUnit(parent_id))?;
                if parent.path != parent_path {
                    return Err(HierarchyError::InvalidPath(unit.path.to_string()));
                }
            }
            _ => return Err(HierarchyError::InvalidPath(unit.path.to_string())),
        }

        let idx = self.units.len();
        let id = unit.id;
        self.by_id.insert(id, idx);
        self.by_uid.insert(unit.uid.clone(), idx);
        self.by_level
            .entry(unit.hierarchy_level())
            .or_default()
            .push(idx);
        self.units.push(unit);
        Ok(id)
    }

    /// Looks up a unit by id.
    #[must_use]
    pub fn get(&self, id: OrgUnitId) -> Option<&OrganisationUnit> {
        self.by_id.get(&id).map(|&idx| &self.units[idx])
    }

    /// Looks up a unit by UID.
    #[must_use]
    pub fn get_by_uid(&self, uid: &str) -> Option<&OrganisationUnit> {
        let uid = Uid::parse(uid).ok()?;
        self.by_uid.get(&uid).map(|&idx| &self.units[idx])
    }

    /// Looks up a unit by id, failing if it is unknown.
    pub fn require(&self, id: OrgUnitId) -> Result<&OrganisationUnit, HierarchyError> {
        self.get(id).ok_or(HierarchyError::UnknownOrgUnit(id))
    }

    /// All units in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &OrganisationUnit> {
        self.units.iter()
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True if no unit has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Deepest level present in the tree.
    #[must_use]
    pub fn max_level(&self) -> Option<u32> {
        self.by_level.keys().next_back().copied()
    }

    /// Units at exactly `level`, in insertion order.
    pub fn at_level(&self, level: u32) -> impl Iterator<Item = &OrganisationUnit> {
        self.by_level
            .get(&level)
            .into_iter()
            .flatten()
            .map(|&idx| &self.units[idx])
    }

    /// Units at `level` that are descendants-or-self of `ancestor`.
    pub fn descendants_at_level<'a>(
        &'a self,
        ancestor: &'a OrganisationUnit,
        level: u32,
    ) -> impl Iterator<Item = &'a OrganisationUnit> + 'a {
        self.at_level(level)
            .filter(move |unit| ancestor.is_ancestor_or_self_of(unit))
    }

    /// The ancestor-or-self of `unit` sitting at `level`.
    #[must_use]
    pub fn ancestor_at_level(&self, unit: &OrganisationUnit, level: u32) -> Option<&OrganisationUnit> {
        unit.path
            .uid_at_level(level)
            .and_then(|uid| self.get_by_uid(uid))
    }

    /// Ancestors of `unit` from the root down, including `unit` itself.
    pub fn ancestors_or_self<'a>(
        &'a self,
        unit: &'a OrganisationUnit,
    ) -> impl Iterator<Item = &'a OrganisationUnit> + 'a {
        unit.path.uids().filter_map(|uid| self.get_by_uid(uid))
    }

    /// True if any of `others` is a descendant-or-self of `unit`.
    pub fn contains_any<'a>(
        &self,
        unit: &OrganisationUnit,
        others: impl IntoIterator<Item = &'a OrgUnitId>,
    ) -> bool {
        others
            .into_iter()
            .filter_map(|id| self.get(*id))
            .any(|other| unit.is_ancestor_or_self_of(other))
    }

    /// True if `unit` is a descendant-or-self of any of `roots`.
    pub fn is_within_any<'a>(
        &self,
        unit: &OrganisationUnit,
        roots: impl IntoIterator<Item = &'a OrgUnitId>,
    ) -> bool {
        roots
            .into_iter()
            .filter_map(|id| self.get(*id))
            .any(|root| root.is_ancestor_or_self_of(unit))
    }

    fn fresh_uid(&self) -> Uid {
        loop {
            let uid = Uid::generate();
            if !self.by_uid.contains_key(&uid) {
                return uid;
            }
        }
    }
}
