//! A reference leaf holding a single key and value.

use std::fmt;
use std::io;
use std::sync::Arc;

use super::{Node, NodeRef, UpdateFn, incompatible_merge};
use crate::compare::Key;
use crate::context::Context;
use crate::error::{Result, TreeError};
use crate::node_id::NodeId;

/// A leaf covering the single key `[key, key]`.
///
/// Every constructed entry receives a fresh [`NodeId`]. Merging two
/// entries for the same key keeps the one with the greater identity, which
/// is the one created last (identities are time-ordered).
///
/// # Examples
///
/// ```rust
/// use keytree::compare::Key;
/// use keytree::node::{Entry, Node};
///
/// let entry = Entry::new("color", "blue");
/// assert_eq!(entry.key(), &Key::from("color"));
/// assert_eq!(entry.value(), &"blue");
/// assert_eq!(entry.key_range(), Some((Key::from("color"), Key::from("color"))));
/// ```
#[derive(Clone)]
pub struct Entry<V> {
    id: NodeId,
    key: Key,
    value: V,
}

impl<V> Entry<V>
where
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Creates an entry with a fresh identity.
    pub fn new(key: impl Into<Key>, value: V) -> Self {
        Self {
            id: NodeId::generate(),
            key: key.into(),
            value,
        }
    }

    /// The key this entry is stored under.
    pub const fn key(&self) -> &Key {
        &self.key
    }

    /// The stored value.
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// A new entry for the same key holding `value`.
    #[must_use]
    pub fn with_value(&self, value: V) -> Self {
        Self::new(self.key.clone(), value)
    }

    /// Wraps this entry as a [`NodeRef`].
    pub fn into_node(self) -> NodeRef {
        Arc::new(self)
    }

    /// Downcasts `node` to an entry of this value type.
    pub fn from_node(node: &NodeRef) -> Option<&Self> {
        node.as_any().downcast_ref::<Self>()
    }
}

impl<V> Node for Entry<V>
where
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn id(&self) -> NodeId {
        self.id
    }

    fn key_range(&self) -> Option<(Key, Key)> {
        Some((self.key.clone(), self.key.clone()))
    }

    fn mutate(
        self: Arc<Self>,
        _context: &Context,
        path: &[Key],
        update: &mut UpdateFn<'_>,
    ) -> Result<Option<NodeRef>> {
        match path {
            [] => update(Some(self as NodeRef)),
            [key] if *key == self.key => update(Some(self as NodeRef)),
            _ => Err(TreeError::NotFound),
        }
    }

    fn merge(self: Arc<Self>, _context: &Context, other: NodeRef) -> Result<NodeRef> {
        let Some(other_entry) = Self::from_node(&other) else {
            incompatible_merge(self.as_ref(), other.as_ref());
        };
        if other_entry.id > self.id {
            Ok(other)
        } else {
            Ok(self as NodeRef)
        }
    }

    fn dump(&self, writer: &mut dyn io::Write, level: usize) -> io::Result<()> {
        writeln!(
            writer,
            "{:indent$}{:?} = {:?}",
            "",
            self.key,
            self.value,
            indent = level * 2
        )
    }
}

impl<V: fmt::Debug> fmt::Debug for Entry<V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Entry")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}
