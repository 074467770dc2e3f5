//! The composite node: a sorted, range-partitioned set of children.
//!
//! A [`NodeSet`] holds child nodes sorted ascending by their minimum key,
//! with pairwise non-overlapping key ranges, and caches the overall range
//! `(first child's min, last child's max)`.
//!
//! # Copy-on-write
//!
//! A node set is never modified after construction. [`NodeSet::mutate`]
//! and [`NodeSet::merge`] build new sets that share every unaffected child
//! with their inputs, so any number of readers may keep using an old root
//! while a writer derives a new one. When an operation changes nothing, the
//! receiver itself is returned (same [`NodeId`]), which lets callers detect
//! no-op updates by identity.
//!
//! # Invariants
//!
//! 1. Children are sorted ascending by minimum key.
//! 2. Children's ranges are pairwise non-overlapping.
//! 3. The cached range equals the true extremes of the children, and is
//!    `None` if and only if there are no children.
//!
//! # Examples
//!
//! ```rust
//! use keytree::context::Context;
//! use keytree::key_path::KeyPath;
//! use keytree::node::{Entry, NodeSet};
//!
//! let context = Context::new();
//! let root = NodeSet::empty();
//!
//! let b = KeyPath::parse("b").unwrap();
//! let a = KeyPath::parse("a").unwrap();
//! let first = root.insert(&context, &b, Entry::new("b", 2).into_node()).unwrap();
//! let second = first.insert(&context, &a, Entry::new("a", 1).into_node()).unwrap();
//!
//! // The original versions are untouched.
//! assert!(root.is_empty());
//! assert_eq!(first.len(), 1);
//! assert_eq!(second.len(), 2);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::{debug, trace};

use super::{Node, NodeRef, UpdateFn, incompatible_merge};
use crate::compare::{Key, compare};
use crate::context::Context;
use crate::error::{Result, TreeError};
use crate::node_id::NodeId;
use crate::traversal::{self, Source, Step, Traversal};

/// Shared, immutable child sequence.
type Children = Arc<[NodeRef]>;

/// How a node set exposes its children during traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flatten {
    /// Every child is traversed through its own [`Node::traverse`].
    Full,
    /// Nested node sets are fully flattened; other children are yielded
    /// as they are.
    OneLevel,
}

// =============================================================================
// NodeSet Definition
// =============================================================================

/// A composite node holding a sorted, non-overlapping sequence of children.
///
/// Cloning is cheap and preserves identity: the clone shares the child
/// sequence and reports the same [`NodeId`].
#[derive(Clone)]
pub struct NodeSet {
    id: NodeId,
    children: Children,
    range: Option<(Key, Key)>,
}

impl NodeSet {
    /// Creates an empty node set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use keytree::node::NodeSet;
    ///
    /// let set = NodeSet::empty();
    /// assert!(set.is_empty());
    /// assert_eq!(set.min_key(), None);
    /// ```
    pub fn empty() -> Self {
        Self {
            id: NodeId::generate(),
            children: Arc::from(Vec::new()),
            range: None,
        }
    }

    /// Creates a node set from children, checking their order.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::BadOrder`] if the children are not sorted by
    /// minimum key, overlap, or one of them covers no range.
    pub fn new(children: Vec<NodeRef>) -> Result<Self> {
        check_order(&children, 0..children.len())?;
        Ok(Self::from_sorted(children))
    }

    /// Builds a node set from children already known to be in order.
    fn from_sorted(children: Vec<NodeRef>) -> Self {
        let range = match (children.first(), children.last()) {
            (Some(first), Some(last)) => first
                .key_range()
                .zip(last.key_range())
                .map(|((minimum, _), (_, maximum))| (minimum, maximum)),
            _ => None,
        };
        Self {
            id: NodeId::generate(),
            children: Arc::from(children),
            range,
        }
    }

    /// Identity of this instance.
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// The children, sorted by minimum key.
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the set has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Minimum key of the first child.
    pub fn min_key(&self) -> Option<&Key> {
        self.range.as_ref().map(|(minimum, _)| minimum)
    }

    /// Maximum key of the last child.
    pub fn max_key(&self) -> Option<&Key> {
        self.range.as_ref().map(|(_, maximum)| maximum)
    }

    /// Returns `true` if `other` is this very instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        self.id == other.id
    }

    /// Wraps this set as a [`NodeRef`] so it can be nested in another set.
    pub fn into_node(self) -> NodeRef {
        Arc::new(self)
    }
}

// =============================================================================
// Mutation
// =============================================================================

impl NodeSet {
    /// Copy-on-write update at `path`.
    ///
    /// The first key of `path` selects a child:
    ///
    /// - No child covers the key: with further path segments this fails
    ///   with [`TreeError::NotFound`]; otherwise `update(None)` decides
    ///   whether a node is inserted in sorted position.
    /// - A child is exactly the key (its range is `[key, key]`) and the path
    ///   goes on: the child is mutated with the rest of the path.
    /// - Otherwise the child whose range contains the key is mutated with
    ///   the same path and resolves it through its own partitioning; a leaf
    ///   treats a path of just its own key as addressing itself.
    ///
    /// Keys are taken as they are. Hierarchical names are only checked for
    /// `""`, `"."` and `".."` when the path is built through
    /// [`KeyPath::parse`] or [`KeyPath::from_names`].
    ///
    /// [`KeyPath::parse`]: crate::key_path::KeyPath::parse
    /// [`KeyPath::from_names`]: crate::key_path::KeyPath::from_names
    ///
    /// A child returning `None` is removed. A child returning a different
    /// node is replaced, provided the replacement covers exactly the same
    /// range. If nothing changed, a clone of `self` with the same identity is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`TreeError::InvalidPath`] if `path` is empty
    /// - [`TreeError::NotFound`] if an intermediate segment does not exist
    /// - [`TreeError::InvalidName`] if a replacement changes its range
    /// - [`TreeError::BadOrder`] if an inserted node breaks the order
    /// - any error returned by `update` or by a child
    ///
    /// # Examples
    ///
    /// ```rust
    /// use keytree::context::Context;
    /// use keytree::key_path::KeyPath;
    /// use keytree::node::{Entry, NodeSet};
    ///
    /// let context = Context::new();
    /// let path = KeyPath::parse("k").unwrap();
    /// let root = NodeSet::empty()
    ///     .mutate(&context, &path, &mut |_| Ok(Some(Entry::new("k", 1).into_node())))
    ///     .unwrap();
    ///
    /// // An update returning its input leaves the tree untouched.
    /// let same = root.mutate(&context, &path, &mut |current| Ok(current)).unwrap();
    /// assert!(same.same_instance(&root));
    /// ```
    pub fn mutate(&self, context: &Context, path: &[Key], update: &mut UpdateFn<'_>) -> Result<Self> {
        let Some((key, rest)) = path.split_first() else {
            return Err(TreeError::InvalidPath);
        };

        let index = self.search(key);
        let Some(child) = self.children.get(index) else {
            return self.create(index, rest, update);
        };
        let Some((minimum, maximum)) = child.key_range() else {
            unreachable!("child {} of node set {} covers no range", child.id(), self.id);
        };

        match (compare(key, &minimum), compare(key, &maximum)) {
            (Ordering::Less, _) => self.create(index, rest, update),
            (_, Ordering::Greater) => {
                unreachable!("key {key:?} selected child outside its range in node set {}", self.id)
            }
            (Ordering::Equal, Ordering::Equal) if !rest.is_empty() => {
                self.descend(context, index, rest, (minimum, maximum), update)
            }
            _ => self.descend(context, index, path, (minimum, maximum), update),
        }
    }

    /// Index of the only child that can contain `key`, or of the position
    /// where a node for `key` would be inserted.
    fn search(&self, key: &Key) -> usize {
        let index = self
            .children
            .partition_point(|child| child.key_range().is_some_and(|(minimum, _)| minimum < *key));
        match index.checked_sub(1).and_then(|previous| self.children[previous].key_range()) {
            Some((_, maximum)) if *key <= maximum => index - 1,
            _ => index,
        }
    }

    /// Handles a key that matches no existing child.
    fn create(&self, index: usize, rest: &[Key], update: &mut UpdateFn<'_>) -> Result<Self> {
        if !rest.is_empty() {
            return Err(TreeError::NotFound);
        }
        let Some(node) = update(None)? else {
            return Ok(self.clone());
        };

        let mut children = Vec::with_capacity(self.children.len() + 1);
        children.extend_from_slice(&self.children[..index]);
        children.push(node);
        children.extend_from_slice(&self.children[index..]);
        check_order(&children, index.saturating_sub(1)..(index + 2).min(children.len()))?;

        trace!(set = %self.id, index, "inserted child");
        Ok(Self::from_sorted(children))
    }

    /// Mutates the child at `index` and folds its result back into a set.
    fn descend(
        &self,
        context: &Context,
        index: usize,
        path: &[Key],
        range: (Key, Key),
        update: &mut UpdateFn<'_>,
    ) -> Result<Self> {
        let child = &self.children[index];
        let Some(replacement) = Arc::clone(child).mutate(context, path, update)? else {
            return Ok(self.without(index));
        };
        if replacement.id() == child.id() {
            trace!(set = %self.id, index, "child unchanged");
            return Ok(self.clone());
        }
        let Some((minimum, maximum)) = replacement.key_range() else {
            return Ok(self.without(index));
        };
        if minimum != range.0 || maximum != range.1 {
            debug!(
                set = %self.id,
                child = %child.id(),
                ?range,
                replacement = ?(&minimum, &maximum),
                "replacement changed its key range"
            );
            return Err(TreeError::InvalidName);
        }

        let mut children = self.children.to_vec();
        children[index] = replacement;
        check_order(&children, index.saturating_sub(1)..(index + 2).min(children.len()))?;

        trace!(set = %self.id, index, "replaced child");
        Ok(Self::from_sorted(children))
    }

    /// A new set without the child at `index`.
    fn without(&self, index: usize) -> Self {
        let mut children = Vec::with_capacity(self.children.len().saturating_sub(1));
        children.extend_from_slice(&self.children[..index]);
        children.extend_from_slice(&self.children[index + 1..]);
        trace!(set = %self.id, index, "removed child");
        Self::from_sorted(children)
    }

    /// Looks up the node at `path` without changing anything.
    ///
    /// Returns `Ok(None)` if the last segment of `path` does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`NodeSet::mutate`], except that no update can fail.
    pub fn get(&self, context: &Context, path: &[Key]) -> Result<Option<NodeRef>> {
        let mut found = None;
        self.mutate(context, path, &mut |current: Option<NodeRef>| {
            found.clone_from(&current);
            Ok(current)
        })?;
        Ok(found)
    }

    /// Creates or replaces the node at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`NodeSet::mutate`].
    pub fn insert(&self, context: &Context, path: &[Key], node: NodeRef) -> Result<Self> {
        self.mutate(context, path, &mut |_current: Option<NodeRef>| {
            Ok(Some(Arc::clone(&node)))
        })
    }

    /// Removes the node at `path`; removing a missing node changes nothing.
    ///
    /// # Errors
    ///
    /// Same as [`NodeSet::mutate`].
    pub fn remove(&self, context: &Context, path: &[Key]) -> Result<Self> {
        self.mutate(context, path, &mut |_current: Option<NodeRef>| Ok(None))
    }
}

/// Checks that the children in `window` are sorted and non-overlapping.
///
/// Only neighbors of a changed slot can break the order of an otherwise
/// valid sequence, so callers pass the smallest window around the change.
fn check_order(children: &[NodeRef], window: std::ops::Range<usize>) -> Result<()> {
    let mut previous_maximum: Option<Key> = None;
    for child in &children[window] {
        let Some((minimum, maximum)) = child.key_range() else {
            debug!(child = %child.id(), "child covers no range");
            return Err(TreeError::BadOrder);
        };
        if let Some(previous) = &previous_maximum
            && *previous >= minimum
        {
            debug!(child = %child.id(), ?previous, ?minimum, "children out of order");
            return Err(TreeError::BadOrder);
        }
        previous_maximum = Some(maximum);
    }
    Ok(())
}

// =============================================================================
// Merge
// =============================================================================

impl NodeSet {
    /// Reconciles two sets by a linear merge over their children.
    ///
    /// An empty side yields the other side unchanged, and merging a set with
    /// itself yields it unchanged. Otherwise children are taken in order of
    /// their minimum key; children of both sides with equal minimum keys are
    /// merged recursively.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a recursive merge.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use keytree::context::Context;
    /// use keytree::key_path::KeyPath;
    /// use keytree::node::{Entry, NodeSet};
    ///
    /// let context = Context::new();
    /// let base = NodeSet::empty();
    /// let left = base
    ///     .insert(&context, &KeyPath::parse("a").unwrap(), Entry::new("a", 1).into_node())
    ///     .unwrap();
    /// let right = base
    ///     .insert(&context, &KeyPath::parse("b").unwrap(), Entry::new("b", 2).into_node())
    ///     .unwrap();
    ///
    /// let merged = left.merge(&context, &right).unwrap();
    /// assert_eq!(merged.len(), 2);
    /// ```
    pub fn merge(&self, context: &Context, other: &Self) -> Result<Self> {
        if other.is_empty() || self.same_instance(other) {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }

        let mut merged = Vec::with_capacity(self.children.len() + other.children.len());
        let mut left = &self.children[..];
        let mut right = &other.children[..];

        loop {
            match (left.split_first(), right.split_first()) {
                (None, _) => {
                    merged.extend_from_slice(right);
                    break;
                }
                (_, None) => {
                    merged.extend_from_slice(left);
                    break;
                }
                (Some((left_child, left_rest)), Some((right_child, right_rest))) => {
                    match compare_minimum(left_child, right_child) {
                        Ordering::Less => {
                            merged.push(Arc::clone(left_child));
                            left = left_rest;
                        }
                        Ordering::Greater => {
                            merged.push(Arc::clone(right_child));
                            right = right_rest;
                        }
                        Ordering::Equal => {
                            let child = Arc::clone(left_child).merge(context, Arc::clone(right_child))?;
                            merged.push(child);
                            left = left_rest;
                            right = right_rest;
                        }
                    }
                }
            }
        }

        trace!(left = %self.id, right = %other.id, children = merged.len(), "merged node sets");
        Ok(Self::from_sorted(merged))
    }
}

/// Orders two children by minimum key; a child covering nothing sorts first.
fn compare_minimum(left: &NodeRef, right: &NodeRef) -> Ordering {
    let left = left.key_range().map(|(minimum, _)| minimum);
    let right = right.key_range().map(|(minimum, _)| minimum);
    left.cmp(&right)
}

// =============================================================================
// Traversal
// =============================================================================

impl NodeSet {
    /// Full flatten: lazily yields every leaf below this set, in ascending
    /// key order, then resumes `continuation`.
    ///
    /// Every child is visited through its own [`Node::traverse`], so nested
    /// sets, and leaves exposing their own contents, are expanded.
    pub fn flatten(&self, continuation: Option<Source>) -> Source {
        walk(self.clone(), 0, Flatten::Full, continuation)
    }

    /// One-level flatten: nested node sets are fully flattened, any other
    /// direct child is yielded as an opaque value without calling its
    /// [`Node::traverse`], then `continuation` resumes.
    pub fn range(&self, continuation: Option<Source>) -> Source {
        walk(self.clone(), 0, Flatten::OneLevel, continuation)
    }

    /// Iterator over every leaf, see [`NodeSet::flatten`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use keytree::node::{Entry, NodeSet};
    ///
    /// let set = NodeSet::new(vec![
    ///     Entry::new("a", 1).into_node(),
    ///     Entry::new("b", 2).into_node(),
    /// ])
    /// .unwrap();
    /// assert_eq!(set.leaves().count(), 2);
    /// ```
    pub fn leaves(&self) -> Traversal {
        Traversal::new(self.flatten(None))
    }

    /// Iterator over the one-level flattening, see [`NodeSet::range`].
    pub fn iter(&self) -> Traversal {
        Traversal::new(self.range(None))
    }
}

/// A source visiting the children of `set` from `index` on.
fn walk(set: NodeSet, index: usize, mode: Flatten, continuation: Option<Source>) -> Source {
    traversal::source(move || {
        let Some(child) = set.children.get(index).map(Arc::clone) else {
            return Step::end(continuation);
        };
        let next = walk(set, index + 1, mode, continuation);
        if mode == Flatten::Full {
            return Step::Resume(child.traverse(Some(next)));
        }
        if let Some(nested) = child.as_node_set() {
            return Step::Resume(nested.flatten(Some(next)));
        }
        Step::Yield(child, next)
    })
}

// =============================================================================
// Node Implementation
// =============================================================================

impl Node for NodeSet {
    fn id(&self) -> NodeId {
        self.id
    }

    fn key_range(&self) -> Option<(Key, Key)> {
        self.range.clone()
    }

    fn mutate(
        self: Arc<Self>,
        context: &Context,
        path: &[Key],
        update: &mut UpdateFn<'_>,
    ) -> Result<Option<NodeRef>> {
        let mutated = Self::mutate(&self, context, path, update)?;
        if mutated.same_instance(&self) {
            Ok(Some(self as NodeRef))
        } else {
            Ok(Some(mutated.into_node()))
        }
    }

    fn merge(self: Arc<Self>, context: &Context, other: NodeRef) -> Result<NodeRef> {
        let Some(other_set) = other.as_node_set() else {
            incompatible_merge(self.as_ref(), other.as_ref());
        };
        let merged = Self::merge(&self, context, other_set)?;
        if merged.same_instance(&self) {
            Ok(self as NodeRef)
        } else if merged.same_instance(other_set) {
            Ok(other)
        } else {
            Ok(merged.into_node())
        }
    }

    /// Dumps every child at the same level.
    fn dump(&self, writer: &mut dyn io::Write, level: usize) -> io::Result<()> {
        for child in self.children.iter() {
            child.dump(writer, level)?;
        }
        Ok(())
    }

    fn traverse(self: Arc<Self>, continuation: Option<Source>) -> Source {
        self.flatten(continuation)
    }

    fn as_node_set(&self) -> Option<&NodeSet> {
        Some(self)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl Default for NodeSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for NodeSet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("NodeSet")
            .field("id", &self.id)
            .field("range", &self.range)
            .field("children", &self.children)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
