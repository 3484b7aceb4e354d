//! Property-based tests for level planning and state classification.

use proptest::prelude::*;

use super::levels::{ApprovalLevel, LevelPlan};
use super::resolver::{PairFacts, classify};
use super::types::DataApprovalState;

/// Non-decreasing org unit levels, one per approval level.
fn arb_levels() -> impl Strategy<Value = Vec<ApprovalLevel>> {
    prop::collection::vec(1u32..6, 1..6).prop_map(|mut depths| {
        depths.sort_unstable();
        depths
            .into_iter()
            .zip(1u32..)
            .map(|(depth, level)| ApprovalLevel::new(format!("L{level}"), level, depth))
            .collect()
    })
}

fn arb_facts() -> impl Strategy<Value = PairFacts> {
    any::<[bool; 6]>().prop_map(|b| PairFacts {
        approved_above: b[0],
        approved: b[1],
        accepted: b[1] && b[2],
        has_level_for_org_unit: b[3],
        has_level_above_org_unit: b[4],
        ready_below: b[5],
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The plan's org-unit-relative levels sit where their names say.
    #[test]
    fn prop_plan_levels_bracket_target(
        levels in arb_levels(),
        skip in 0usize..5,
        target in 1u32..7,
    ) {
        let skip = skip.min(levels.len() - 1);
        let user: Vec<&ApprovalLevel> = levels[skip..].iter().collect();
        let plan = LevelPlan::build(&levels, &user, Some(target)).unwrap();

        prop_assert_eq!(plan.highest.level, 1);
        prop_assert_eq!(plan.highest_user.level, levels[skip].level);
        prop_assert_eq!(
            plan.above_user.map(|l| l.level),
            skip.checked_sub(1).map(|i| levels[i].level)
        );
        if let Some(l) = plan.lowest_for_org_unit {
            prop_assert_eq!(l.org_unit_level, target);
        } else {
            prop_assert!(levels.iter().all(|l| l.org_unit_level != target));
        }
        if let Some(l) = plan.above_org_unit {
            prop_assert!(l.org_unit_level < target);
        }
        if let Some(l) = plan.below_org_unit {
            prop_assert!(l.org_unit_level > target);
        }
        let approved_above = plan.approved_above.map(|l| l.id);
        prop_assert!(
            approved_above.is_none()
                || approved_above == plan.above_user.map(|l| l.id)
                || approved_above == plan.above_org_unit.map(|l| l.id)
        );
    }

    /// Classification agrees with the facts it was given.
    #[test]
    fn prop_classify_matches_facts(facts in arb_facts()) {
        let state = classify(&facts);

        prop_assert_eq!(state.is_approved(), facts.approved_above || facts.approved);
        prop_assert_eq!(state == DataApprovalState::ApprovedAbove, facts.approved_above);
        if !facts.approved_above && facts.approved {
            prop_assert_eq!(state.is_accepted(), facts.accepted);
        }
        if !facts.approved_above && !facts.approved && !facts.has_level_for_org_unit {
            prop_assert!(!state.is_approvable());
        }
        prop_assert_eq!(classify(&facts), state);
    }
}
