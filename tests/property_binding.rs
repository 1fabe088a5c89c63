use bindery::{
    BindErrorKind, BinderRegistry, PathSegment, SettingsMap, SettingsNode, SettingsProvider,
    MemorySource,
};
use proptest::prelude::*;
use std::sync::Arc;

/// A list element: a valid number or malformed text.
fn element() -> impl Strategy<Value = Option<u32>> {
    prop_oneof![
        3 => any::<u32>().prop_map(Some),
        1 => Just(None),
    ]
}

fn leaf_for(element: Option<u32>) -> SettingsNode {
    match element {
        Some(value) => SettingsNode::leaf(value.to_string()),
        None => SettingsNode::leaf("not a number"),
    }
}

proptest! {
    /// Property: one bad element yields exactly one error at its index
    ///
    /// Binding continues past failures, so every good element is kept in
    /// place and every bad one is reported under `[k]`.
    #[test]
    fn prop_list_errors_match_bad_positions(
        elements in prop::collection::vec(element(), 0..40)
    ) {
        let tree = SettingsNode::list(elements.iter().copied().map(leaf_for));
        let binding = BinderRegistry::new().bind::<Vec<u32>>(&tree);

        let bad: Vec<usize> = elements
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.is_none().then_some(i))
            .collect();
        let reported: Vec<usize> = binding
            .errors()
            .iter()
            .map(|error| match error.path.segments() {
                [PathSegment::Index(index)] => *index,
                other => panic!("unexpected path {other:?}"),
            })
            .collect();
        prop_assert_eq!(reported, bad);
        let all_node_type_mismatch = binding
            .errors()
            .iter()
            .all(|e| matches!(e.kind, BindErrorKind::NodeTypeMismatch { .. }));
        prop_assert!(all_node_type_mismatch);

        let values = binding.value();
        prop_assert_eq!(values.len(), elements.len());
        for (value, element) in values.iter().zip(&elements) {
            prop_assert_eq!(*value, element.unwrap_or_default());
        }
    }

    /// Property: a deep merge keeps every key of both sides, and the right
    /// side wins on shared keys
    #[test]
    fn prop_merge_right_side_wins(
        left in prop::collection::btree_map("[a-e]", 0u8..10, 0..5),
        right in prop::collection::btree_map("[a-e]", 10u8..20, 0..5)
    ) {
        let to_node = |entries: &std::collections::BTreeMap<String, u8>| {
            SettingsNode::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), SettingsNode::leaf(v.to_string())))
                    .collect::<SettingsMap>(),
            )
        };
        let merged = to_node(&left).merged_with(&to_node(&right));

        for (key, value) in &left {
            let expected = right.get(key).unwrap_or(value).to_string();
            prop_assert_eq!(merged.get(key).and_then(SettingsNode::as_leaf), Some(expected.as_str()));
        }
        for (key, value) in &right {
            let expected = value.to_string();
            prop_assert_eq!(merged.get(key).and_then(SettingsNode::as_leaf), Some(expected.as_str()));
        }
    }

    /// Property: the provider always serves the latest good value
    #[test]
    fn prop_provider_tracks_latest_emission(
        updates in prop::collection::vec(any::<u16>(), 1..10)
    ) {
        let source = Arc::new(MemorySource::new("numbers"));
        let provider = SettingsProvider::new();
        provider.setup_source_for::<u16>(source.clone()).unwrap();
        let _subscription = provider.observe::<u16>(|_| {}).unwrap();

        for update in &updates {
            source.set(SettingsNode::leaf(update.to_string()));
            prop_assert_eq!(*provider.get::<u16>().unwrap(), *update);
        }
    }
}
