//! Integration tests for NodeSet mutation and merge.

use keytree::prelude::*;
use rstest::{fixture, rstest};
use std::sync::Arc;
use std::thread;

// =============================================================================
// Helpers
// =============================================================================

/// Routes crate logs to the test output; filter with `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn entry(key: &str, value: i32) -> NodeRef {
    Entry::new(key, value).into_node()
}

fn path(text: &str) -> KeyPath {
    KeyPath::parse(text).unwrap()
}

fn value_at(set: &NodeSet, key: &str) -> Option<i32> {
    let node = set.get(&Context::new(), &path(key)).unwrap()?;
    Entry::<i32>::from_node(&node).map(|entry| *entry.value())
}

fn value_at_key(set: &NodeSet, key: Key) -> Option<i32> {
    let node = set.get(&Context::new(), &[key]).unwrap()?;
    Entry::<i32>::from_node(&node).map(|entry| *entry.value())
}

fn leaf_values(set: &NodeSet) -> Vec<i32> {
    set.leaves()
        .map(|node| *Entry::<i32>::from_node(&node.unwrap()).unwrap().value())
        .collect()
}

/// `[a, {m1, m2, m3}, z]`
#[fixture]
fn nested_root() -> NodeSet {
    let nested = NodeSet::new(vec![entry("m1", 1), entry("m2", 2), entry("m3", 3)]).unwrap();
    NodeSet::new(vec![entry("a", 0), nested.into_node(), entry("z", 9)]).unwrap()
}

// =============================================================================
// Insert and Read Back
// =============================================================================

#[rstest]
fn test_insert_then_get_returns_inserted_entry() {
    let context = Context::new();
    let root = NodeSet::empty()
        .insert(&context, &path("b"), entry("b", 2))
        .unwrap()
        .insert(&context, &path("a"), entry("a", 1))
        .unwrap();

    assert_eq!(value_at(&root, "a"), Some(1));
    assert_eq!(value_at(&root, "b"), Some(2));
    assert_eq!(value_at(&root, "c"), None);
}

#[rstest]
fn test_insert_replaces_existing_entry() {
    let context = Context::new();
    let root = NodeSet::new(vec![entry("a", 1)]).unwrap();
    let updated = root.insert(&context, &path("a"), entry("a", 10)).unwrap();

    assert_eq!(updated.len(), 1);
    assert_eq!(value_at(&updated, "a"), Some(10));
    assert_eq!(value_at(&root, "a"), Some(1));
}

#[rstest]
fn test_update_receives_current_node() {
    let context = Context::new();
    let root = NodeSet::new(vec![entry("a", 1)]).unwrap();
    let updated = root
        .mutate(&context, &path("a"), &mut |current| {
            let current = current.unwrap();
            let previous = Entry::<i32>::from_node(&current).unwrap();
            Ok(Some(previous.with_value(previous.value() + 1).into_node()))
        })
        .unwrap();

    assert_eq!(value_at(&updated, "a"), Some(2));
}

#[rstest]
fn test_byte_and_structural_keys_share_a_set() {
    let context = Context::new();
    let structural = Key::structural(&("users", 42_u32)).unwrap();
    let root = NodeSet::empty()
        .insert(&context, &[Key::from(7_u8)], Entry::new(7_u8, 7).into_node())
        .unwrap()
        .insert(
            &context,
            std::slice::from_ref(&structural),
            Entry::new(structural.clone(), 42).into_node(),
        )
        .unwrap()
        .insert(&context, &path("name"), entry("name", 1))
        .unwrap();

    assert_eq!(root.len(), 3);
    assert_eq!(leaf_values(&root), vec![1, 7, 42]);
}

#[rstest]
fn test_single_leaf_nested_set_is_addressable_by_key() {
    let context = Context::new();
    let nested = NodeSet::new(vec![entry("m", 1)]).unwrap();
    let root = NodeSet::new(vec![entry("a", 0), nested.into_node()]).unwrap();

    assert_eq!(value_at(&root, "m"), Some(1));

    let updated = root.insert(&context, &path("m"), entry("m", 2)).unwrap();
    assert_eq!(updated.len(), 2);
    assert_eq!(value_at(&updated, "m"), Some(2));
    assert_eq!(leaf_values(&updated), vec![0, 2]);
}

#[rstest]
fn test_removing_only_leaf_of_nested_set_removes_the_set() {
    let nested = NodeSet::new(vec![entry("m", 1)]).unwrap();
    let root = NodeSet::new(vec![entry("a", 0), nested.into_node()]).unwrap();

    let removed = root.remove(&Context::new(), &path("m")).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(leaf_values(&removed), vec![0]);
}

// =============================================================================
// No-op Identity
// =============================================================================

#[rstest]
fn test_identity_update_returns_same_instance(nested_root: NodeSet) {
    let context = Context::new();
    for key in ["a", "m2", "z"] {
        let result = nested_root
            .mutate(&context, &path(key), &mut |current| Ok(current))
            .unwrap();
        assert!(result.same_instance(&nested_root));
    }
}

#[rstest]
fn test_removing_missing_key_returns_same_instance(nested_root: NodeSet) {
    let result = nested_root.remove(&Context::new(), &path("b")).unwrap();
    assert!(result.same_instance(&nested_root));
}

// =============================================================================
// Delete and Structural Sharing
// =============================================================================

#[rstest]
fn test_remove_shares_untouched_children() {
    let root = NodeSet::new(vec![entry("a", 1), entry("b", 2), entry("c", 3)]).unwrap();
    let removed = root.remove(&Context::new(), &path("b")).unwrap();

    assert_eq!(removed.len(), 2);
    assert!(Arc::ptr_eq(&removed.children()[0], &root.children()[0]));
    assert!(Arc::ptr_eq(&removed.children()[1], &root.children()[2]));
    assert_eq!(root.len(), 3);
}

#[rstest]
fn test_remove_interior_key_of_nested_set(nested_root: NodeSet) {
    let removed = nested_root.remove(&Context::new(), &path("m2")).unwrap();
    assert_eq!(leaf_values(&removed), vec![0, 1, 3, 9]);
    assert!(Arc::ptr_eq(&removed.children()[0], &nested_root.children()[0]));
    assert!(Arc::ptr_eq(&removed.children()[2], &nested_root.children()[2]));
}

#[rstest]
#[case("m1")]
#[case("m3")]
fn test_remove_boundary_key_of_nested_set_is_invalid_name(nested_root: NodeSet, #[case] key: &str) {
    init_tracing();
    let result = nested_root.remove(&Context::new(), &path(key));
    assert!(matches!(result, Err(TreeError::InvalidName)));
}

#[rstest]
fn test_update_inside_nested_set_keeps_its_range(nested_root: NodeSet) {
    let updated = nested_root
        .insert(&Context::new(), &path("m3"), entry("m3", 30))
        .unwrap();
    assert_eq!(leaf_values(&updated), vec![0, 1, 2, 30, 9]);
    assert_eq!(leaf_values(&nested_root), vec![0, 1, 2, 3, 9]);
}

// =============================================================================
// Errors
// =============================================================================

#[rstest]
fn test_missing_intermediate_segment_is_not_found() {
    let result = NodeSet::empty().insert(&Context::new(), &path("x/y"), entry("y", 1));
    assert!(matches!(result, Err(TreeError::NotFound)));
}

#[rstest]
fn test_path_below_a_leaf_is_not_found() {
    let root = NodeSet::new(vec![entry("a", 1)]).unwrap();
    let result = root.insert(&Context::new(), &path("a/b"), entry("b", 1));
    assert!(matches!(result, Err(TreeError::NotFound)));
}

#[rstest]
fn test_empty_path_is_invalid() {
    let result = NodeSet::empty().get(&Context::new(), &KeyPath::new());
    assert!(matches!(result, Err(TreeError::InvalidPath)));
}

#[rstest]
#[case("a//b")]
#[case("a/./b")]
#[case("../a")]
#[case("a/")]
fn test_invalid_names_are_rejected(#[case] text: &str) {
    assert!(matches!(KeyPath::parse(text), Err(TreeError::InvalidPath)));
}

#[rstest]
fn test_hierarchical_names_are_checked_by_key_path_only() {
    assert!(matches!(KeyPath::from_names([".."]), Err(TreeError::InvalidPath)));

    let raw = NodeSet::empty()
        .insert(&Context::new(), &[Key::from("..")], entry("..", 1))
        .unwrap();
    assert_eq!(value_at_key(&raw, Key::from("..")), Some(1));
}

#[rstest]
fn test_update_error_is_propagated_verbatim() {
    let root = NodeSet::new(vec![entry("a", 1)]).unwrap();
    let result = root.mutate(&Context::new(), &path("a"), &mut |_| {
        Err(TreeError::update(std::io::Error::other("rejected")))
    });

    let error = result.unwrap_err();
    assert!(matches!(error, TreeError::Update(_)));
    assert_eq!(error.to_string(), "rejected");
}

// =============================================================================
// Merge
// =============================================================================

#[rstest]
fn test_merge_with_empty_returns_other_side(nested_root: NodeSet) {
    let context = Context::new();
    let empty = NodeSet::empty();
    assert!(nested_root.merge(&context, &empty).unwrap().same_instance(&nested_root));
    assert!(empty.merge(&context, &nested_root).unwrap().same_instance(&nested_root));
}

#[rstest]
fn test_merge_with_self_returns_self(nested_root: NodeSet) {
    let merged = nested_root.merge(&Context::new(), &nested_root).unwrap();
    assert!(merged.same_instance(&nested_root));
}

#[rstest]
fn test_merge_of_disjoint_sets_is_union() {
    let left = NodeSet::new(vec![entry("a", 1), entry("c", 3)]).unwrap();
    let right = NodeSet::new(vec![entry("b", 2), entry("d", 4)]).unwrap();
    let merged = left.merge(&Context::new(), &right).unwrap();

    assert_eq!(leaf_values(&merged), vec![1, 2, 3, 4]);
    assert!(Arc::ptr_eq(&merged.children()[0], &left.children()[0]));
    assert!(Arc::ptr_eq(&merged.children()[1], &right.children()[0]));
}

#[rstest]
fn test_merge_of_diverged_versions_keeps_latest_writes(nested_root: NodeSet) {
    init_tracing();
    let context = Context::new();
    let left = nested_root.insert(&context, &path("a"), entry("a", 100)).unwrap();
    let right = nested_root.insert(&context, &path("m2"), entry("m2", 200)).unwrap();

    let merged = left.merge(&context, &right).unwrap();
    assert_eq!(leaf_values(&merged), vec![100, 1, 200, 3, 9]);
}

// =============================================================================
// Persistence and Concurrency
// =============================================================================

#[rstest]
fn test_readers_keep_their_root_while_writer_derives_new_ones(nested_root: NodeSet) {
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let root = nested_root.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    assert_eq!(leaf_values(&root), vec![0, 1, 2, 3, 9]);
                }
            })
        })
        .collect();

    let context = Context::new();
    let mut current = nested_root.clone();
    for value in 0..100 {
        current = current.insert(&context, &path("m2"), entry("m2", value)).unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(value_at(&current, "m2"), Some(99));
}

// =============================================================================
// Dump
// =============================================================================

#[rstest]
fn test_dump_renders_nested_sets_flat(nested_root: NodeSet) {
    let rendered = keytree::node::dump_to_string(&nested_root).unwrap();
    assert_eq!(
        rendered,
        "\"a\" = 0\n\"m1\" = 1\n\"m2\" = 2\n\"m3\" = 3\n\"z\" = 9\n"
    );
}
