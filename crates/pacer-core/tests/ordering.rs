//! Property tests for the scenario ordering engine

use pacer_core::{Scenario, ScenarioOrderer, StableScenarioOrderer};
use pacer_testkit::make_scenarios_at;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-c]{1,2}",
        "[a-c]{0,2}[0-9]{1,3}",
        "scn[0-9]{1,2}",
    ]
}

/// Distinct relative paths of one to four segments
fn paths() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(prop::collection::vec(segment(), 1..4), 0..24).prop_map(
        |paths: BTreeSet<Vec<String>>| {
            paths
                .into_iter()
                .map(|segments| format!("{}.rs", segments.join("/")))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        },
    )
}

fn ids(scenarios: &[Arc<Scenario>]) -> Vec<String> {
    scenarios.iter().map(|s| s.unique_id().to_string()).collect()
}

proptest! {
    #[test]
    fn prop_ordering_is_idempotent(paths in paths()) {
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let orderer = StableScenarioOrderer::new();

        let once = orderer.sort(&make_scenarios_at(&refs));
        let twice = orderer.sort(&once);

        prop_assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn prop_ordering_ignores_input_order(
        (paths, shuffled) in paths().prop_flat_map(|paths| {
            let shuffled = Just(paths.clone()).prop_shuffle();
            (Just(paths), shuffled)
        })
    ) {
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let shuffled_refs: Vec<&str> = shuffled.iter().map(String::as_str).collect();
        let orderer = StableScenarioOrderer::new();

        prop_assert_eq!(
            ids(&orderer.sort(&make_scenarios_at(&refs))),
            ids(&orderer.sort(&make_scenarios_at(&shuffled_refs)))
        );
    }

    #[test]
    fn prop_ordering_is_a_permutation(paths in paths()) {
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let input = make_scenarios_at(&refs);

        let sorted = StableScenarioOrderer::new().sort(&input);

        let mut expected = ids(&input);
        let mut actual = ids(&sorted);
        expected.sort();
        actual.sort();
        prop_assert_eq!(expected, actual);
    }
}

#[test]
fn test_documented_order_from_any_input_order() {
    let expected = [
        "scenarios/scn2.py",
        "scenarios/scn10.py",
        "scenarios/dir1/scn1.py",
        "scenarios/dir1/scn2.py",
        "scenarios/dir2/scn2.py",
        "scenarios/directory/scn.py",
    ];
    let mut reversed = expected;
    reversed.reverse();

    for input in [expected, reversed] {
        let sorted = StableScenarioOrderer::new().sort(&make_scenarios_at(&input));
        let paths: Vec<&str> = sorted.iter().map(|s| s.rel_path()).collect();
        assert_eq!(paths, expected);
    }
}
