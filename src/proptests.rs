use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use proptest::sample::Index;

use crate::FixedHashMap;

#[derive(Debug, Clone)]
enum Action {
    Set(String, usize),
    Get(String),
    Remove(String),
    Clear,
}

fn limit_key(key_num: usize) -> String {
    // A small key space, so sets, gets and removes keep hitting the same entries.
    format!("{}", key_num % 40)
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        6 => (any::<usize>(), 0..VALUES)
            .prop_map(|(key, value)| Action::Set(limit_key(key), value)),
        3 => any::<usize>().prop_map(limit_key).prop_map(Action::Get),
        3 => any::<usize>().prop_map(limit_key).prop_map(Action::Remove),
        1 => Just(Action::Clear),
    ]
}

const VALUES: usize = 16;

/// Replays `actions` against a `FixedHashMap` and a capacity-limited `std` map.
fn check_against_model(capacity: usize, actions: Vec<Action>) {
    let values: Vec<u32> = (0..VALUES as u32).collect();
    let mut ours = FixedHashMap::new(capacity);
    let mut model: HashMap<String, usize> = HashMap::new();

    for action in actions {
        match action {
            Action::Set(key, value) => {
                let accepted = model.contains_key(&key) || model.len() < capacity;
                assert_eq!(ours.set(&key, &values[value]), accepted, "set {key}");
                if accepted {
                    model.insert(key, value);
                }
            }
            Action::Get(key) => {
                assert_eq!(ours.get(&key), model.get(&key).map(|&i| &values[i]));
                assert_eq!(ours.contains(&key), model.contains_key(&key));
            }
            Action::Remove(key) => {
                assert_eq!(ours.remove(&key), model.remove(&key).map(|i| &values[i]));
            }
            Action::Clear => {
                ours.clear();
                model.clear();
            }
        }

        assert_eq!(ours.count(), model.len());
        assert!(ours.load() <= 1.0);
        assert_eq!(ours.load(), model.len() as f32 / capacity as f32);
    }

    assert_eq!(ours.iter().len(), model.len());
    for (key, value) in ours.iter() {
        assert_eq!(Some(value), model.get(key).map(|&i| &values[i]));
    }
}

proptest! {
    #[test]
    fn behaves_like_bounded_hash_map(
        capacity in 1usize..24,
        actions in proptest::collection::vec(action_strategy(), 1..400),
    ) {
        check_against_model(capacity, actions);
    }

    #[test]
    fn remove_keeps_every_other_key(
        keys in proptest::collection::hash_set("[a-z0-9]{0,6}", 1..48),
        extra_capacity in 0usize..8,
        victim in any::<Index>(),
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let values: Vec<usize> = (0..keys.len()).collect();
        let mut map = FixedHashMap::new(keys.len() + extra_capacity);
        for (key, value) in keys.iter().zip(&values) {
            prop_assert!(map.set(key, value));
        }

        let victim = victim.index(keys.len());
        prop_assert_eq!(map.remove(&keys[victim]), Some(&values[victim]));
        prop_assert_eq!(map.count(), keys.len() - 1);
        prop_assert!(!map.contains(&keys[victim]));
        for (i, key) in keys.iter().enumerate().filter(|&(i, _)| i != victim) {
            prop_assert_eq!(map.get(key), Some(&values[i]));
        }
    }

    #[test]
    fn clones_do_not_share_structure(
        keys in proptest::collection::hash_set("[a-z]{1,4}", 2..32),
        split in any::<Index>(),
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let value = 0u8;
        let split = split.index(keys.len());
        let (before, after) = keys.split_at(split);

        let mut original = FixedHashMap::new(keys.len());
        for key in before {
            original.set(key, &value);
        }
        let mut copy = original.clone();

        // Grow the original, shrink the copy.
        for key in after {
            prop_assert!(original.set(key, &value));
        }
        for key in before {
            prop_assert!(copy.remove(key).is_some());
        }

        let original_keys: HashSet<&str> = original.iter().map(|(key, _)| key).collect();
        prop_assert_eq!(original_keys.len(), keys.len());
        prop_assert!(copy.is_empty());
        for key in before {
            prop_assert!(original.contains(key));
            prop_assert!(std::ptr::eq(original.get(key).unwrap(), &value));
        }
    }
}
