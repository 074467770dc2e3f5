//! Multi-part key paths.
//!
//! A [`KeyPath`] is an ordered sequence of [`Key`]s, read outermost first.
//! Most paths are short, so up to four keys are stored inline.
//!
//! # Examples
//!
//! ```rust
//! use keytree::compare::Key;
//! use keytree::key_path::KeyPath;
//!
//! let path = KeyPath::parse("users/alice/profile").unwrap();
//! assert_eq!(path.len(), 3);
//! assert_eq!(path[0], Key::from("users"));
//!
//! assert!(KeyPath::parse("users/../root").is_err());
//! ```

use std::fmt;
use std::ops::Deref;

use smallvec::SmallVec;

use crate::compare::Key;
use crate::error::{Result, TreeError};

/// Number of keys stored without a heap allocation.
const INLINE_KEYS: usize = 4;

/// An ordered sequence of keys locating a nested entry.
///
/// The empty path addresses the current node itself.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    keys: SmallVec<[Key; INLINE_KEYS]>,
}

impl KeyPath {
    /// Creates an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a path from hierarchical names.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidPath`] if any name is empty, `"."` or
    /// `".."`.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| -> Result<Key> {
                let name = name.as_ref();
                validate_name(name)?;
                Ok(Key::from(name))
            })
            .collect()
    }

    /// Parses a `/`-separated path of hierarchical names.
    ///
    /// A single leading `/` is ignored; `""` and `"/"` yield the empty path.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidPath`] if any segment is empty, `"."` or
    /// `".."`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.strip_prefix('/').unwrap_or(text);
        if text.is_empty() {
            return Ok(Self::new());
        }
        Self::from_names(text.split('/'))
    }

    /// Returns a new path with `key` appended.
    #[must_use]
    pub fn child(&self, key: impl Into<Key>) -> Self {
        let mut keys = self.keys.clone();
        keys.push(key.into());
        Self { keys }
    }

    /// The first key and the remaining keys, if the path is not empty.
    pub fn split_first(&self) -> Option<(&Key, &[Key])> {
        self.keys.split_first()
    }
}

/// Checks a single hierarchical name segment.
///
/// # Errors
///
/// Returns [`TreeError::InvalidPath`] for `""`, `"."` and `".."`.
pub fn validate_name(name: &str) -> Result<()> {
    match name {
        "" | "." | ".." => Err(TreeError::InvalidPath),
        _ => Ok(()),
    }
}

impl Deref for KeyPath {
    type Target = [Key];

    fn deref(&self) -> &Self::Target {
        &self.keys
    }
}

impl AsRef<[Key]> for KeyPath {
    fn as_ref(&self) -> &[Key] {
        &self.keys
    }
}

impl FromIterator<Key> for KeyPath {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl From<&[Key]> for KeyPath {
    fn from(keys: &[Key]) -> Self {
        Self {
            keys: SmallVec::from(keys),
        }
    }
}

impl From<Key> for KeyPath {
    fn from(key: Key) -> Self {
        std::iter::once(key).collect()
    }
}

impl<'a> IntoIterator for &'a KeyPath {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl fmt::Debug for KeyPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.keys.iter()).finish()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in &self.keys {
            match key.as_text() {
                Some(text) => write!(formatter, "/{text}")?,
                None => write!(formatter, "/{key:?}")?,
            }
        }
        Ok(())
    }
}
