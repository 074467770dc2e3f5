//! Lazy, continuation-driven traversal.
//!
//! A traversal is a [`Source`]: a one-shot closure that, when invoked,
//! produces a single [`Step`]. Each step either yields a node together with
//! the source producing the rest of the sequence, hands control back to a
//! caller-supplied continuation, reports that nothing is left, or fails.
//!
//! No native suspension is involved. The state of a traversal (the index of
//! the next child to visit) is captured by value in the closure that
//! resumes it, so sources can be dropped at any point without cleanup.
//!
//! Nested traversals compose through continuations: a node set visiting a
//! nested set hands it a source for its own next child, and the nested set
//! ends with [`Step::Resume`] on that source. [`Traversal`] drives a chain
//! of steps in a loop, exposing it as a native [`Iterator`] with constant
//! stack depth regardless of nesting.
//!
//! # Examples
//!
//! ```rust
//! use keytree::node::{Entry, Node, NodeRef};
//! use keytree::traversal::{self, Traversal};
//!
//! let leaf: NodeRef = Entry::new("a", 1).into_node();
//! let source = traversal::once(leaf, None);
//!
//! let keys: Vec<_> = Traversal::new(source)
//!     .map(|node| node.unwrap().key_range().unwrap().0)
//!     .collect();
//! assert_eq!(keys.len(), 1);
//! ```

use std::fmt;
use std::iter::FusedIterator;

use crate::error::{Result, TreeError};
use crate::node::NodeRef;

/// A one-shot producer of the next traversal [`Step`].
pub type Source = Box<dyn FnOnce() -> Step + Send>;

/// The outcome of invoking a [`Source`] once.
pub enum Step {
    /// A node, and the source producing the rest of the sequence.
    Yield(NodeRef, Source),
    /// No value: this sequence ended, continue with the given source.
    Resume(Source),
    /// No value and no continuation: the whole traversal ended.
    Done,
    /// The traversal failed and must not be resumed.
    Fail(TreeError),
}

impl Step {
    /// Ends the current sequence, handing control to `continuation` if any.
    pub fn end(continuation: Option<Source>) -> Self {
        continuation.map_or(Self::Done, Self::Resume)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yield(node, _) => formatter.debug_tuple("Yield").field(&node.id()).finish(),
            Self::Resume(_) => formatter.write_str("Resume(<source>)"),
            Self::Done => formatter.write_str("Done"),
            Self::Fail(error) => formatter.debug_tuple("Fail").field(error).finish(),
        }
    }
}

/// Boxes a closure as a [`Source`].
pub fn source<F>(thunk: F) -> Source
where
    F: FnOnce() -> Step + Send + 'static,
{
    Box::new(thunk)
}

/// A source yielding `node` once, then ending with `continuation`.
pub fn once(node: NodeRef, continuation: Option<Source>) -> Source {
    source(move || Step::Yield(node, source(move || Step::end(continuation))))
}

/// A source that ends immediately with `continuation`.
pub fn empty(continuation: Option<Source>) -> Source {
    source(move || Step::end(continuation))
}

/// A source that fails with `error`.
pub fn fail(error: TreeError) -> Source {
    source(move || Step::Fail(error))
}

// =============================================================================
// Traversal
// =============================================================================

/// Drives a [`Source`] as an iterator.
///
/// [`Step::Resume`] is followed internally; only yielded nodes and errors
/// reach the caller. The iterator is fused: after [`Step::Done`] or the
/// first error it returns `None` forever.
pub struct Traversal {
    next: Option<Source>,
}

impl Traversal {
    /// Creates an iterator over the steps produced by `source`.
    pub fn new(source: Source) -> Self {
        Self { next: Some(source) }
    }

    /// Collects every yielded node, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the traversal.
    pub fn collect_nodes(self) -> Result<Vec<NodeRef>> {
        self.collect()
    }
}

impl Iterator for Traversal {
    type Item = Result<NodeRef>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let source = self.next.take()?;
            match source() {
                Step::Yield(node, rest) => {
                    self.next = Some(rest);
                    return Some(Ok(node));
                }
                Step::Resume(rest) => {
                    self.next = Some(rest);
                }
                Step::Done => return None,
                Step::Fail(error) => return Some(Err(error)),
            }
        }
    }
}

impl FusedIterator for Traversal {}

impl fmt::Debug for Traversal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Traversal")
            .field("finished", &self.next.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Entry;
    use rstest::rstest;

    fn leaf(key: &str) -> NodeRef {
        Entry::new(key, ()).into_node()
    }

    fn keys(traversal: Traversal) -> Vec<String> {
        traversal
            .map(|node| {
                let node = node.unwrap();
                let (minimum, _) = node.key_range().unwrap();
                minimum.as_text().unwrap().to_string()
            })
            .collect()
    }

    #[rstest]
    fn test_empty_source_yields_nothing() {
        assert_eq!(Traversal::new(empty(None)).count(), 0);
    }

    #[rstest]
    fn test_once_then_continuation() {
        let tail = once(leaf("b"), None);
        let head = once(leaf("a"), Some(tail));
        assert_eq!(keys(Traversal::new(head)), vec!["a", "b"]);
    }

    #[rstest]
    fn test_resume_chain_is_followed() {
        let tail = once(leaf("c"), None);
        let middle = empty(Some(empty(Some(tail))));
        assert_eq!(keys(Traversal::new(middle)), vec!["c"]);
    }

    #[rstest]
    fn test_fail_stops_traversal() {
        let source = once(leaf("a"), Some(fail(TreeError::NotFound)));
        let mut traversal = Traversal::new(source);
        assert!(matches!(traversal.next(), Some(Ok(_))));
        assert!(matches!(traversal.next(), Some(Err(TreeError::NotFound))));
        assert!(traversal.next().is_none());
        assert!(traversal.next().is_none());
    }

    #[rstest]
    fn test_collect_nodes_returns_first_error() {
        let source = once(leaf("a"), Some(fail(TreeError::BadOrder)));
        assert!(matches!(
            Traversal::new(source).collect_nodes(),
            Err(TreeError::BadOrder)
        ));
    }

    #[rstest]
    fn test_long_resume_chain_uses_constant_stack() {
        let mut source = once(leaf("end"), None);
        for _ in 0..100_000 {
            source = empty(Some(source));
        }
        assert_eq!(Traversal::new(source).count(), 1);
    }

    #[rstest]
    fn test_step_debug() {
        assert_eq!(format!("{:?}", Step::Done), "Done");
        assert_eq!(format!("{:?}", Step::end(Some(empty(None)))), "Resume(<source>)");
    }
}
