//! Property-Based Test Generators
//!
//! Provides proptest strategies for entities and predicates.

use docdb_kernel::{Field, Predicate};
use proptest::collection::{hash_set, vec};
use proptest::prelude::*;

use crate::fixtures::Gadget;

/// Strategy for categories drawn from a small fixed set, so partitions collide
pub fn category_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("tools"), Just("toys"), Just("garden")].prop_map(str::to_string)
}

/// Strategy for document ids
pub fn id_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,11}"
}

/// Strategy for a single gadget with the given id
pub fn gadget_with_id(id: String) -> impl Strategy<Value = Gadget> {
    (
        category_strategy(),
        "[A-Za-z ]{1,16}",
        -3i64..3,
        vec(prop_oneof![Just("metal"), Just("wood"), Just("heavy")], 0..3),
    )
        .prop_map(move |(category, name, x, tags)| Gadget {
            id: id.clone(),
            category,
            name,
            x,
            tags: tags.into_iter().map(str::to_string).collect(),
        })
}

/// Strategy for a batch of gadgets with distinct ids
pub fn gadget_batch_strategy(max: usize) -> impl Strategy<Value = Vec<Gadget>> {
    hash_set(id_strategy(), 0..max).prop_flat_map(|ids| {
        ids.into_iter()
            .map(gadget_with_id)
            .collect::<Vec<_>>()
    })
}

/// Strategy for predicates over gadget fields
pub fn predicate_strategy() -> impl Strategy<Value = Predicate> {
    let leaf = prop_oneof![
        (-3i64..3).prop_map(|x| Field::new("x").eq(x)),
        (-3i64..3).prop_map(|x| Field::new("x").gt(x)),
        category_strategy().prop_map(|c| Field::new("category").eq(c)),
        "[a-z]{1,2}".prop_map(|s| Field::new("name").contains(s)),
        Just(Field::new("missing").is_defined()),
    ];

    leaf.prop_recursive(3, 12, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.and(b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.or(b)),
            inner.prop_map(|p| !p),
        ]
    })
}
