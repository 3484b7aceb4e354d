//! Registry of category options, option combos and category combos.

use std::collections::{BTreeSet, HashMap, HashSet};

use rungs_shared::types::{CategoryComboId, CategoryOptionComboId, CategoryOptionId, OrgUnitId, Uid};

use super::error::CategoryError;
use super::types::{CategoryCombo, CategoryOption, CategoryOptionCombo};

/// All attribute categories known to the resolver.
///
/// Option combos are kept in registration order, which is the order in
/// which candidates are enumerated.
#[derive(Debug, Clone, Default)]
pub struct CategoryCatalog {
    options: HashMap<CategoryOptionId, CategoryOption>,
    option_combos: Vec<CategoryOptionCombo>,
    combo_index: HashMap<CategoryOptionComboId, usize>,
    category_combos: HashMap<CategoryComboId, CategoryCombo>,
    uids: HashSet<Uid>,
    default_category_combo: Option<CategoryComboId>,
}

impl CategoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn claim_uid(&mut self, uid: &Uid) -> Result<(), CategoryError> {
        if self.uids.insert(uid.clone()) {
            Ok(())
        } else {
            Err(CategoryError::DuplicateUid(uid.clone()))
        }
    }

    /// Registers a category option.
    pub fn add_option(&mut self, option: CategoryOption) -> Result<CategoryOptionId, CategoryError> {
        self.claim_uid(&option.uid)?;
        let id = option.id;
        self.options.insert(id, option);
        Ok(id)
    }

    /// Registers an option combo; all of its options must be known.
    pub fn add_option_combo(
        &mut self,
        combo: CategoryOptionCombo,
    ) -> Result<CategoryOptionComboId, CategoryError> {
        if let Some(missing) = combo.options.iter().find(|id| !self.options.contains_key(id)) {
            return Err(CategoryError::UnknownOption(*missing));
        }
        self.claim_uid(&combo.uid)?;

        let id = combo.id;
        self.combo_index.insert(id, self.option_combos.len());
        self.option_combos.push(combo);
        Ok(id)
    }

    /// Registers a category combo; all of its option combos must be known.
    pub fn add_category_combo(
        &mut self,
        combo: CategoryCombo,
    ) -> Result<CategoryComboId, CategoryError> {
        if let Some(missing) = combo
            .option_combos
            .iter()
            .find(|id| !self.combo_index.contains_key(id))
        {
            return Err(CategoryError::UnknownOptionCombo(*missing));
        }
        self.claim_uid(&combo.uid)?;

        let id = combo.id;
        self.category_combos.insert(id, combo);
        Ok(id)
    }

    /// Marks a category combo as the unconstrained default.
    pub fn set_default_category_combo(&mut self, id: CategoryComboId) -> Result<(), CategoryError> {
        let combo = self
            .category_combos
            .get(&id)
            .ok_or(CategoryError::UnknownCategoryCombo(id))?;
        if combo.option_combos.len() != 1 {
            return Err(CategoryError::InvalidDefault(combo.option_combos.len()));
        }
        self.default_category_combo = Some(id);
        Ok(())
    }

    /// Looks up a category option.
    #[must_use]
    pub fn option(&self, id: CategoryOptionId) -> Option<&CategoryOption> {
        self.options.get(&id)
    }

    /// Looks up an option combo.
    #[must_use]
    pub fn option_combo(&self, id: CategoryOptionComboId) -> Option<&CategoryOptionCombo> {
        self.combo_index.get(&id).map(|&idx| &self.option_combos[idx])
    }

    /// Looks up an option combo by UID.
    #[must_use]
    pub fn option_combo_by_uid(&self, uid: &str) -> Option<&CategoryOptionCombo> {
        self.option_combos.iter().find(|c| c.uid.as_str() == uid)
    }

    /// Looks up a category combo.
    #[must_use]
    pub fn category_combo(&self, id: CategoryComboId) -> Option<&CategoryCombo> {
        self.category_combos.get(&id)
    }

    /// Looks up a category combo by UID.
    #[must_use]
    pub fn category_combo_by_uid(&self, uid: &str) -> Option<&CategoryCombo> {
        self.category_combos.values().find(|c| c.uid.as_str() == uid)
    }

    /// All option combos in registration order.
    pub fn option_combos(&self) -> impl Iterator<Item = &CategoryOptionCombo> {
        self.option_combos.iter()
    }

    /// The option combo of the default category combo.
    #[must_use]
    pub fn default_option_combo(&self) -> Option<&CategoryOptionCombo> {
        let combo = self.category_combos.get(&self.default_category_combo?)?;
        combo.option_combos.first().and_then(|id| self.option_combo(*id))
    }

    /// True if `id` is the default option combo.
    #[must_use]
    pub fn is_default(&self, id: CategoryOptionComboId) -> bool {
        self.default_option_combo().is_some_and(|c| c.id == id)
    }

    /// Options making up an option combo; unknown ids are skipped.
    pub fn options_of<'a>(
        &'a self,
        combo: &'a CategoryOptionCombo,
    ) -> impl Iterator<Item = &'a CategoryOption> + 'a {
        combo.options.iter().filter_map(|id| self.options.get(id))
    }

    /// Org-unit restriction sets of the restricted options in a combo.
    pub fn restrictions<'a>(
        &'a self,
        combo: &'a CategoryOptionCombo,
    ) -> impl Iterator<Item = &'a BTreeSet<OrgUnitId>> + 'a {
        self.options_of(combo)
            .filter(|option| option.is_restricted())
            .map(|option| &option.org_units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_combo_registration() {
        let mut catalog = CategoryCatalog::new();
        let option = catalog.add_option(CategoryOption::new("default")).unwrap();
        let combo = catalog
            .add_option_combo(CategoryOptionCombo::new("default", vec![option]))
            .unwrap();
        let cc = catalog
            .add_category_combo(CategoryCombo::new("default", vec![combo]))
            .unwrap();

        assert!(catalog.default_option_combo().is_none());
        catalog.set_default_category_combo(cc).unwrap();
        assert_eq!(catalog.default_option_combo().map(|c| c.id), Some(combo));
        assert!(catalog.is_default(combo));
    }

    #[test]
    fn test_default_requires_single_option_combo() {
        let mut catalog = CategoryCatalog::new();
        let a = catalog.add_option(CategoryOption::new("A")).unwrap();
        let b = catalog.add_option(CategoryOption::new("B")).unwrap();
        let ca = catalog
            .add_option_combo(CategoryOptionCombo::new("A", vec![a]))
            .unwrap();
        let cb = catalog
            .add_option_combo(CategoryOptionCombo::new("B", vec![b]))
            .unwrap();
        let cc = catalog
            .add_category_combo(CategoryCombo::new("Partners", vec![ca, cb]))
            .unwrap();

        assert_eq!(
            catalog.set_default_category_combo(cc),
            Err(CategoryError::InvalidDefault(2))
        );
    }

    #[test]
    fn test_rejects_unknown_references_and_duplicate_uids() {
        let mut catalog = CategoryCatalog::new();
        let ghost = CategoryOptionId::new();
        assert_eq!(
            catalog.add_option_combo(CategoryOptionCombo::new("X", vec![ghost])),
            Err(CategoryError::UnknownOption(ghost))
        );

        let option = CategoryOption::new("A");
        let twin = CategoryOption {
            id: CategoryOptionId::new(),
            ..option.clone()
        };
        catalog.add_option(option).unwrap();
        assert!(matches!(
            catalog.add_option(twin),
            Err(CategoryError::DuplicateUid(_))
        ));
    }

    #[test]
    fn test_restrictions_only_cover_restricted_options() {
        let mut catalog = CategoryCatalog::new();
        let district = OrgUnitId::new();
        let open = catalog.add_option(CategoryOption::new("Open")).unwrap();
        let local = catalog
            .add_option(CategoryOption::new("Local").restricted_to(district))
            .unwrap();
        let combo = catalog
            .add_option_combo(CategoryOptionCombo::new("Open, Local", vec![open, local]))
            .unwrap();

        let combo = catalog.option_combo(combo).unwrap();
        let sets: Vec<_> = catalog.restrictions(combo).collect();
        assert_eq!(sets.len(), 1);
        assert!(sets[0].contains(&district));
        assert_eq!(catalog.options_of(combo).count(), 2);
    }
}
