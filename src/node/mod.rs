//! The polymorphic unit of the tree.
//!
//! Every node, composite or leaf, implements [`Node`]. Nodes are immutable
//! once built and shared through [`NodeRef`]; mutations and merges build new
//! nodes that share every unaffected child with their predecessors.
//!
//! - [`NodeSet`]: the composite node, a sorted, range-partitioned sequence
//!   of children
//! - [`Entry`]: a reference leaf holding a single key and value
//!
//! Leaf types defined outside this crate take part by implementing [`Node`].
//!
//! # Examples
//!
//! ```rust
//! use keytree::context::Context;
//! use keytree::key_path::KeyPath;
//! use keytree::node::{Entry, NodeSet};
//!
//! let context = Context::new();
//! let path = KeyPath::parse("alpha").unwrap();
//!
//! let root = NodeSet::empty()
//!     .insert(&context, &path, Entry::new("alpha", 1).into_node())
//!     .unwrap();
//!
//! let found = root.get(&context, &path).unwrap().unwrap();
//! let entry = Entry::<i32>::from_node(&found).unwrap();
//! assert_eq!(entry.value(), &1);
//! ```

use std::any::Any;
use std::fmt;
use std::io;
use std::sync::Arc;

use crate::compare::Key;
use crate::context::Context;
use crate::error::Result;
use crate::node_id::NodeId;
use crate::traversal::{self, Source};

mod entry;
mod node_set;

pub use entry::Entry;
pub use node_set::NodeSet;

/// Shared reference to a node of any variant.
pub type NodeRef = Arc<dyn Node>;

/// Update function invoked with the node currently at a path.
///
/// It receives `None` when nothing exists at the path. Returning
/// `Ok(Some(node))` creates or replaces; returning `Ok(None)` means no node
/// should exist there (delete, or leave absent).
pub type UpdateFn<'a> = dyn FnMut(Option<NodeRef>) -> Result<Option<NodeRef>> + 'a;

// =============================================================================
// Upcasting
// =============================================================================

/// Conversions every [`Node`] gets for free.
///
/// Implemented for all sized node types; a supertrait of [`Node`] so that
/// `dyn Node` values can be turned back into [`NodeRef`]s or downcast.
pub trait NodeUpcast {
    /// Converts a concrete shared node into a [`NodeRef`].
    fn into_node_ref(self: Arc<Self>) -> NodeRef;

    /// Returns `self` as `&dyn Any`, for downcasting to a concrete leaf.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Node> NodeUpcast for T {
    fn into_node_ref(self: Arc<Self>) -> NodeRef {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Node
// =============================================================================

/// The capability set every tree node supports.
///
/// # Contract
///
/// - [`id`](Node::id) identifies this instance; a node rebuilt by a
///   mutation or merge reports a fresh identity, an unchanged node reports
///   the same one.
/// - [`key_range`](Node::key_range) is the inclusive range the node covers,
///   `None` only for a node representing nothing.
/// - [`mutate`](Node::mutate) is path-terminal for leaves: a leaf receives
///   the path starting at its own key, and any segment after it fails with
///   [`TreeError::NotFound`].
/// - [`merge`](Node::merge) is only called with a node covering the same
///   key range. Merging with an incompatible variant is a programmer error
///   and panics.
///
/// [`TreeError::NotFound`]: crate::error::TreeError::NotFound
pub trait Node: NodeUpcast + fmt::Debug + Send + Sync + 'static {
    /// Identity of this instance.
    fn id(&self) -> NodeId;

    /// The inclusive `(min, max)` range covered by this node.
    fn key_range(&self) -> Option<(Key, Key)>;

    /// Copy-on-write update at `path`, relative to this node.
    ///
    /// Returns the node that should take this node's place: `self` when
    /// nothing changed, a new node on change, `None` on deletion.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while resolving the path or by
    /// `update`.
    fn mutate(
        self: Arc<Self>,
        context: &Context,
        path: &[Key],
        update: &mut UpdateFn<'_>,
    ) -> Result<Option<NodeRef>>;

    /// Combines this node with `other`, which covers the same key range.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a nested merge.
    ///
    /// # Panics
    ///
    /// Panics if `other` is of an incompatible variant.
    fn merge(self: Arc<Self>, context: &Context, other: NodeRef) -> Result<NodeRef>;

    /// Writes a human-readable rendering, indented by `level`.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `writer`.
    fn dump(&self, writer: &mut dyn io::Write, level: usize) -> io::Result<()>;

    /// Lazily yields this node's contents, then resumes `continuation`.
    ///
    /// Leaves yield themselves. Composite nodes yield their leaves.
    fn traverse(self: Arc<Self>, continuation: Option<Source>) -> Source {
        traversal::once(self.into_node_ref(), continuation)
    }

    /// Returns `Some` if this node is a [`NodeSet`].
    fn as_node_set(&self) -> Option<&NodeSet> {
        None
    }
}

/// Aborts a merge between incompatible node variants.
#[cold]
pub(crate) fn incompatible_merge(left: &dyn Node, right: &dyn Node) -> ! {
    tracing::error!(left = %left.id(), right = %right.id(), "merge of incompatible node variants");
    panic!("bad merge type: {left:?} with {right:?}");
}

/// Renders a node into a string through [`Node::dump`].
///
/// # Errors
///
/// Returns the first error raised by a node's [`Node::dump`].
///
/// # Examples
///
/// ```rust
/// use keytree::node::{Entry, dump_to_string};
///
/// let entry = Entry::new("a", 1).into_node();
/// assert_eq!(dump_to_string(entry.as_ref()).unwrap(), "\"a\" = 1\n");
/// ```
pub fn dump_to_string(node: &dyn Node) -> io::Result<String> {
    let mut buffer = Vec::new();
    node.dump(&mut buffer, 0)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
