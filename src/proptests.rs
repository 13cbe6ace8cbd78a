//! Property-based cross-check against a `HashMap` reference model.
//!
//! Generates a sequence of insert/search actions, replays them against
//! both the tree and a plain `HashMap`, and asserts the two never
//! disagree.

use std::collections::HashMap;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::Tree;

#[derive(Arbitrary, Debug, Clone)]
enum Action {
    Insert(KeyValue),
    Search(Key),
}

#[derive(Debug, Clone)]
struct Key(Vec<u8>);

#[derive(Debug, Clone)]
struct KeyValue {
    key: Key,
    value: i64,
}

impl Arbitrary for Key {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            // Short keys, heavy overlap so splits and grows actually fire.
            prop::collection::vec(any::<u8>(), 1..4).prop_map(Key),
            prop::collection::vec(any::<u8>(), 4..64).prop_map(Key),
            // Keys that are proper prefixes of one another.
            "[a-z]{2,6}".prop_map(|s| Key(s.into_bytes())),
            "[a-z]{2,6}".prop_map(|prefix| {
                let mut key = prefix.into_bytes();
                key.extend_from_slice(b"/suffix");
                Key(key)
            }),
        ]
        .boxed()
    }
}

impl Arbitrary for KeyValue {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (any::<Key>(), any::<i64>())
            .prop_map(|(key, value)| KeyValue { key, value })
            .boxed()
    }
}

struct Test {
    tree: Tree,
    model: HashMap<Vec<u8>, i64>,
}

impl Test {
    fn new() -> Test {
        Test {
            tree: Tree::new(),
            model: HashMap::new(),
        }
    }

    fn execute(&mut self, action: Action) {
        match action {
            Action::Insert(kv) => {
                let key = kv.key.0;
                let tree_old = self.tree.insert(&key, kv.value);
                let model_old = self.model.insert(key.clone(), kv.value);
                assert_eq!(
                    tree_old, model_old,
                    "insert({key:?}, {}) prior-value mismatch",
                    kv.value
                );
            }
            Action::Search(key) => {
                let key = key.0;
                let tree_val = self.tree.search(&key);
                let model_val = self.model.get(&key).copied();
                assert_eq!(tree_val, model_val, "search({key:?}) mismatch");
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn matches_hashmap_model(actions in prop::collection::vec(any::<Action>(), 1..128)) {
        let mut test = Test::new();
        for action in actions {
            test.execute(action);
        }
        for (key, value) in test.model.iter() {
            prop_assert_eq!(test.tree.search(key), Some(*value));
        }
    }
}
