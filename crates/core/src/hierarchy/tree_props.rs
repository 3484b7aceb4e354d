//! Property-based tests for path-derived ancestry.

use proptest::prelude::*;
use rungs_shared::types::OrgUnitId;

use super::tree::OrgUnitHierarchy;

/// Strategy for a random forest: each entry picks the parent of the next
/// unit among the units created so far, or `None` for a new root.
fn arb_shape() -> impl Strategy<Value = Vec<Option<prop::sample::Index>>> {
    prop::collection::vec(prop::option::weighted(0.85, any::<prop::sample::Index>()), 1..40)
}

fn build(shape: &[Option<prop::sample::Index>]) -> (OrgUnitHierarchy, Vec<OrgUnitId>) {
    let mut hierarchy = OrgUnitHierarchy::new();
    let mut ids: Vec<OrgUnitId> = Vec::new();

    for (n, choice) in shape.iter().enumerate() {
        let id = match choice {
            Some(index) if !ids.is_empty() => {
                let parent = ids[index.index(ids.len())];
                hierarchy.add_child(parent, format!("unit-{n}")).unwrap()
            }
            _ => hierarchy.add_root(format!("unit-{n}")).unwrap(),
        };
        ids.push(id);
    }

    (hierarchy, ids)
}

fn walk_is_ancestor(hierarchy: &OrgUnitHierarchy, ancestor: OrgUnitId, unit: OrgUnitId) -> bool {
    let mut current = Some(unit);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = hierarchy.get(id).and_then(|u| u.parent);
    }
    false
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Path slot comparison agrees with walking parent links.
    #[test]
    fn prop_path_ancestry_matches_parent_walk(shape in arb_shape()) {
        let (hierarchy, ids) = build(&shape);

        for &a in &ids {
            for &b in &ids {
                let ua = hierarchy.get(a).unwrap();
                let ub = hierarchy.get(b).unwrap();
                prop_assert_eq!(
                    ua.is_ancestor_or_self_of(ub),
                    walk_is_ancestor(&hierarchy, a, b)
                );
            }
        }
    }

    /// A unit's level is one more than its parent's.
    #[test]
    fn prop_level_is_parent_level_plus_one(shape in arb_shape()) {
        let (hierarchy, _) = build(&shape);

        for unit in hierarchy.iter() {
            let expected = unit
                .parent
                .and_then(|p| hierarchy.get(p))
                .map_or(1, |p| p.hierarchy_level() + 1);
            prop_assert_eq!(unit.hierarchy_level(), expected);
        }
    }
}
