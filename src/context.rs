//! Opaque execution context threaded through mutations and merges.
//!
//! The core never inspects a [`Context`]; it only passes it down to every
//! node it recurses into. Leaf implementations use it to pick up whatever
//! the surrounding system attached: a tracing span, a cancellation flag,
//! a storage handle.
//!
//! Values are stored by type. Attaching a value returns a new context and
//! leaves the original untouched, so a context can be cheaply specialized
//! for one call.
//!
//! # Examples
//!
//! ```rust
//! use keytree::context::Context;
//!
//! #[derive(Debug, PartialEq)]
//! struct RequestId(u64);
//!
//! let base = Context::new();
//! let scoped = base.with(RequestId(7));
//!
//! assert_eq!(scoped.get::<RequestId>(), Some(&RequestId(7)));
//! assert_eq!(base.get::<RequestId>(), None);
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::Span;

type Extensions = FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Execution context passed through [`Node`](crate::node::Node) operations.
#[derive(Clone, Default)]
pub struct Context {
    extensions: Arc<Extensions>,
    span: Option<Span>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new context carrying `value`, replacing any previous value
    /// of the same type.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut extensions = (*self.extensions).clone();
        extensions.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            extensions: Arc::new(extensions),
            span: self.span.clone(),
        }
    }

    /// Returns the value of type `T`, if one is attached.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Returns a new context whose operations are recorded under `span`.
    #[must_use]
    pub fn with_span(&self, span: Span) -> Self {
        Self {
            extensions: Arc::clone(&self.extensions),
            span: Some(span),
        }
    }

    /// The span attached by the host, or the current span.
    pub fn span(&self) -> Span {
        self.span.clone().unwrap_or_else(Span::current)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Context")
            .field("extensions", &self.extensions.len())
            .field("span", &self.span)
            .finish()
    }
}
