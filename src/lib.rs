//! # keytree
//!
//! Copy-on-write, key-ordered node sets with structural merge and lazy
//! traversal.
//!
//! ## Overview
//!
//! A tree is built from [`Node`](node::Node)s. The composite node,
//! [`NodeSet`](node::NodeSet), keeps its children sorted by key range and
//! never modifies them in place: every mutation or merge returns a new
//! root that shares all unaffected children with the previous one. Old
//! roots stay valid, so readers on other threads are never disturbed.
//!
//! - **Comparator**: a total order over text, byte, custom and structural
//!   keys ([`compare`])
//! - **Identity**: unique, time-ordered node identities ([`node_id`])
//! - **Nodes**: the node contract, the composite node set and a reference
//!   leaf ([`node`])
//! - **Traversal**: lazy, continuation-driven iteration with constant stack
//!   depth ([`traversal`])
//! - **Shared roots**: publishing the current root to concurrent readers
//!   ([`shared`], feature `shared`)
//!
//! ## Feature Flags
//!
//! - `shared` (default): [`SharedRoot`](shared::SharedRoot), backed by
//!   `parking_lot`
//!
//! ## Example
//!
//! ```rust
//! use keytree::prelude::*;
//!
//! let context = Context::new();
//!
//! let nested = NodeSet::new(vec![
//!     Entry::new("m1", 1).into_node(),
//!     Entry::new("m3", 3).into_node(),
//! ])
//! .unwrap();
//! let root = NodeSet::new(vec![
//!     Entry::new("a", 0).into_node(),
//!     nested.into_node(),
//!     Entry::new("z", 9).into_node(),
//! ])
//! .unwrap();
//!
//! // "m3" lies inside the nested set's range, so the update is routed there.
//! let path = KeyPath::parse("m3").unwrap();
//! let updated = root
//!     .insert(&context, &path, Entry::new("m3", 30).into_node())
//!     .unwrap();
//!
//! let values = |set: &NodeSet| -> Vec<i32> {
//!     set.leaves()
//!         .map(|node| *Entry::<i32>::from_node(&node.unwrap()).unwrap().value())
//!         .collect()
//! };
//! assert_eq!(values(&updated), vec![0, 1, 30, 9]);
//! assert_eq!(values(&root), vec![0, 1, 3, 9]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use keytree::prelude::*;
/// ```
pub mod prelude {
    pub use crate::compare::{Key, KeyOrder, compare};
    pub use crate::context::Context;
    pub use crate::error::{Result, TreeError};
    pub use crate::key_path::KeyPath;
    pub use crate::node::{Entry, Node, NodeRef, NodeSet, NodeUpcast, UpdateFn};
    pub use crate::node_id::NodeId;
    pub use crate::traversal::{Source, Step, Traversal};

    #[cfg(feature = "shared")]
    pub use crate::shared::SharedRoot;
}

pub mod compare;
pub mod context;
pub mod error;
pub mod key_path;
pub mod node;
pub mod node_id;
pub mod traversal;

#[cfg(feature = "shared")]
pub mod shared;

static_assertions::assert_impl_all!(compare::Key: Send, Sync, Clone);
static_assertions::assert_impl_all!(node::NodeSet: Send, Sync, Clone);
static_assertions::assert_impl_all!(node::NodeRef: Send, Sync);
static_assertions::assert_impl_all!(traversal::Source: Send);
static_assertions::assert_impl_all!(context::Context: Send, Sync);
