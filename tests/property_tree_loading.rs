use proptest::prelude::*;
use rollup_engine::{ContextTree, Outcome};
use std::collections::HashMap;

/// Builds a one-level tree: a loaded parent whose children carry arbitrary
/// group/partial flags.
fn build_tree(children: &[(bool, bool)]) -> (ContextTree, Vec<String>) {
    let child_ids: Vec<String> = (0..children.len()).map(|i| format!("c{i}")).collect();
    let mut outcomes: HashMap<String, Outcome> = HashMap::new();

    outcomes.insert(
        "parent".to_string(),
        Outcome {
            child_ids: Some(child_ids.clone()),
            has_children: true,
            is_partial: false,
            ..Outcome::new("parent", "Parent")
        },
    );
    for (i, &(is_group, is_partial)) in children.iter().enumerate() {
        let id = format!("c{i}");
        outcomes.insert(
            id.clone(),
            Outcome {
                has_children: is_group,
                // Leaves are never partial; a leaf has nothing left to fetch.
                is_partial: is_group && is_partial,
                ..Outcome::new(id, format!("Child {i}"))
            },
        );
    }

    (
        ContextTree {
            outcomes,
            root_ids: vec!["parent".to_string()],
        },
        child_ids,
    )
}

proptest! {
    /// Property: for a loaded parent, `children_to_load` returns exactly the
    /// partial group children, excluding leaves and fully-loaded groups.
    #[test]
    fn prop_children_to_load_is_minimal(
        children in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..12)
    ) {
        let (tree, child_ids) = build_tree(&children);
        let to_load = tree.children_to_load("parent");

        let expected: Vec<String> = children
            .iter()
            .enumerate()
            .filter(|(_, &(is_group, is_partial))| is_group && is_partial)
            .map(|(i, _)| format!("c{i}"))
            .collect();

        prop_assert_eq!(&to_load, &expected);
        // Everything returned is one of the parent's children.
        for id in &to_load {
            prop_assert!(child_ids.contains(id));
        }
    }

    /// Property: a partial node always resolves to fetching itself, no
    /// matter what its recorded children look like.
    #[test]
    fn prop_partial_node_loads_itself(
        children in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..6)
    ) {
        let (mut tree, _) = build_tree(&children);
        if let Some(parent) = tree.outcomes.get_mut("parent") {
            parent.is_partial = true;
        }
        prop_assert_eq!(tree.children_to_load("parent"), vec!["parent".to_string()]);
    }
}
