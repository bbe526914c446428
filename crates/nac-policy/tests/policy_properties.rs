//! Property tests for the policy engine
//!
//! Round trips through bytes and through canonical text must preserve the
//! evaluation result for every attribute set over the tree's universe.

use nac_policy::{
    attribute_set, evaluate, from_bytes, parse, satisfying_selection, to_bytes, AccessTree,
    Attribute, AttributeSet,
};
use proptest::prelude::*;

const UNIVERSE: [&str; 5] = ["attr0", "attr1", "attr2", "attr3", "attr4"];

fn leaf_strategy() -> impl Strategy<Value = AccessTree> {
    prop::sample::select(UNIVERSE.to_vec())
        .prop_map(|token| AccessTree::leaf(Attribute::new(token).unwrap()))
}

fn tree_strategy() -> impl Strategy<Value = AccessTree> {
    leaf_strategy().prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..4)
                .prop_map(|children| AccessTree::and(children).unwrap()),
            prop::collection::vec(inner.clone(), 2..4)
                .prop_map(|children| AccessTree::or(children).unwrap()),
            prop::collection::vec(inner, 2..5).prop_flat_map(|children| {
                let n = children.len();
                (1..=n).prop_map(move |k| AccessTree::threshold(k, children.clone()).unwrap())
            }),
        ]
    })
}

fn every_subset() -> Vec<AttributeSet> {
    (0u32..(1 << UNIVERSE.len()))
        .map(|mask| {
            let tokens = UNIVERSE
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, token)| *token);
            attribute_set(tokens).unwrap()
        })
        .collect()
}

proptest! {
    #[test]
    fn byte_round_trip_preserves_evaluation(tree in tree_strategy()) {
        let decoded = from_bytes(&to_bytes(&tree).unwrap()).unwrap();
        for set in every_subset() {
            prop_assert_eq!(evaluate(&tree, &set), evaluate(&decoded, &set));
        }
    }

    #[test]
    fn text_round_trip_preserves_evaluation(tree in tree_strategy()) {
        let reparsed = parse(&tree.to_string()).unwrap();
        for set in every_subset() {
            prop_assert_eq!(evaluate(&tree, &set), evaluate(&reparsed, &set));
        }
    }

    #[test]
    fn selection_exists_iff_satisfied(tree in tree_strategy()) {
        for set in every_subset() {
            let selection = satisfying_selection(&tree, &set);
            prop_assert_eq!(selection.is_some(), evaluate(&tree, &set));
            if let Some(selection) = selection {
                let leaves = tree.leaves();
                for ordinal in selection.leaf_ordinals() {
                    prop_assert!(set.contains(leaves[ordinal]));
                }
            }
        }
    }

    #[test]
    fn parser_never_panics(text in "[a-z0-9 (),]{0,40}") {
        let _ = parse(&text);
    }
}

#[test]
fn evaluation_is_monotone_for_reference_policy() {
    let tree = parse("attr1 and attr2 or attr3").unwrap();
    for set in every_subset() {
        if evaluate(&tree, &set) {
            let mut bigger = set.clone();
            bigger.insert(Attribute::new("attr4").unwrap());
            assert!(evaluate(&tree, &bigger));
        }
    }
}
