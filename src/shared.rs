//! Publishing a current root to concurrent readers.
//!
//! Roots are immutable, so readers never need a lock to use one; they only
//! need a consistent way to pick up the latest. [`SharedRoot`] holds the
//! current root behind a [`parking_lot::RwLock`]: readers clone it out,
//! writers derive a new root from the current one and publish it in a
//! single step.
//!
//! # Examples
//!
//! ```rust
//! use keytree::context::Context;
//! use keytree::key_path::KeyPath;
//! use keytree::node::{Entry, NodeSet};
//! use keytree::shared::SharedRoot;
//!
//! let context = Context::new();
//! let shared = SharedRoot::new(NodeSet::empty());
//! let before = shared.load();
//!
//! let path = KeyPath::parse("a").unwrap();
//! shared
//!     .update(|root| root.insert(&context, &path, Entry::new("a", 1).into_node()))
//!     .unwrap();
//!
//! assert!(before.is_empty());
//! assert_eq!(shared.load().len(), 1);
//! ```

use std::fmt;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::node::NodeSet;
use crate::node_id::NodeId;

/// The current root of a tree, shared between threads.
pub struct SharedRoot {
    current: RwLock<NodeSet>,
}

impl SharedRoot {
    /// Creates a shared root publishing `root`.
    pub fn new(root: NodeSet) -> Self {
        Self {
            current: RwLock::new(root),
        }
    }

    /// Returns the current root.
    pub fn load(&self) -> NodeSet {
        self.current.read().clone()
    }

    /// Derives a new root from the current one and publishes it.
    ///
    /// `function` runs under the writer lock, so concurrent updates are
    /// serialized. The result is published only if its identity differs
    /// from the current root.
    ///
    /// # Errors
    ///
    /// Returns the error of `function`; nothing is published in that case.
    pub fn update<F>(&self, function: F) -> Result<NodeSet>
    where
        F: FnOnce(&NodeSet) -> Result<NodeSet>,
    {
        let mut current = self.current.write();
        let next = function(&current)?;
        if !next.same_instance(&current) {
            debug!(previous = %current.id(), next = %next.id(), "published root");
            *current = next.clone();
        }
        Ok(next)
    }

    /// Publishes `root` only if the current root still has identity
    /// `expected`.
    ///
    /// # Errors
    ///
    /// Returns the current root if it is no longer `expected`.
    pub fn compare_and_swap(&self, expected: NodeId, root: NodeSet) -> std::result::Result<(), NodeSet> {
        let mut current = self.current.write();
        if current.id() != expected {
            return Err(current.clone());
        }
        debug!(previous = %expected, next = %root.id(), "published root");
        *current = root;
        Ok(())
    }
}

impl Default for SharedRoot {
    fn default() -> Self {
        Self::new(NodeSet::empty())
    }
}

impl fmt::Debug for SharedRoot {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SharedRoot")
            .field("current", &self.current.read().id())
            .finish()
    }
}
