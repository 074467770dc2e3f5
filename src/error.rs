//! Error types for tree operations.
//!
//! Every fallible operation in this crate returns [`TreeError`]. Errors are
//! propagated verbatim through the recursion of [`NodeSet::mutate`] and
//! [`NodeSet::merge`]; the core never retries.
//!
//! Broken invariants (a search result outside every branch, a merge between
//! incompatible node variants) are not represented here: they panic.
//!
//! [`NodeSet::mutate`]: crate::node::NodeSet::mutate
//! [`NodeSet::merge`]: crate::node::NodeSet::merge

use thiserror::Error;

/// Represents errors that can occur while mutating, merging or traversing
/// a tree.
///
/// # Examples
///
/// ```rust
/// use keytree::error::TreeError;
///
/// let error = TreeError::NotFound;
/// assert_eq!(error.to_string(), "not found");
/// ```
#[derive(Debug, Error)]
pub enum TreeError {
    /// The path references a location with no existing entry and has
    /// unresolved intermediate segments, or a leaf does not recognize a
    /// deeper path.
    #[error("not found")]
    NotFound,

    /// The path is empty, or a hierarchical name segment is empty, `"."`
    /// or `".."`.
    #[error("invalid path")]
    InvalidPath,

    /// A replacement node no longer reports the key range of the node it
    /// replaces.
    #[error("invalid name")]
    InvalidName,

    /// An update produced a node whose insertion would break the ascending,
    /// non-overlapping order of a node set.
    #[error("bad order")]
    BadOrder,

    /// A structural key could not be encoded.
    #[error("key encoding failed: {0}")]
    Encoding(#[from] bincode::Error),

    /// An error raised by a caller-supplied update function or leaf node.
    #[error(transparent)]
    Update(Box<dyn std::error::Error + Send + Sync>),
}

impl TreeError {
    /// Wraps an arbitrary error raised by an update function or a leaf.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use keytree::error::TreeError;
    ///
    /// let error = TreeError::update(std::io::Error::other("quota exceeded"));
    /// assert_eq!(error.to_string(), "quota exceeded");
    /// ```
    pub fn update<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Update(Box::new(error))
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, TreeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TreeError::NotFound, "not found")]
    #[case(TreeError::InvalidPath, "invalid path")]
    #[case(TreeError::InvalidName, "invalid name")]
    #[case(TreeError::BadOrder, "bad order")]
    fn test_display(#[case] error: TreeError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn test_update_error_is_transparent() {
        let error = TreeError::update(std::io::Error::other("disk full"));
        assert_eq!(error.to_string(), "disk full");
        assert!(matches!(error, TreeError::Update(_)));
    }

    #[rstest]
    fn test_error_trait_is_implemented() {
        let error = TreeError::BadOrder;
        let _: &dyn std::error::Error = &error;
    }
}
