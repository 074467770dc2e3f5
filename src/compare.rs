//! Total order over heterogeneous keys.
//!
//! A [`Key`] is one of four kinds:
//!
//! - [`Key::Text`]: compared lexicographically by bytes
//! - [`Key::Byte`]: compared numerically
//! - [`Key::Custom`]: a user type implementing [`KeyOrder`]
//! - [`Key::Structural`]: any `serde::Serialize` value, stored as its
//!   canonical bincode encoding and compared byte-wise
//!
//! [`compare`] dispatches on the pair of kinds with a single match. When no
//! specialized rule applies, both operands are compared by their canonical
//! encoding: a one-byte kind tag followed by the payload bytes. Keys of
//! different kinds therefore always have a consistent, if not meaningful,
//! relative order, and comparison never fails.
//!
//! # Examples
//!
//! ```rust
//! use keytree::compare::{Key, compare};
//! use std::cmp::Ordering;
//!
//! assert_eq!(compare(&Key::from("a"), &Key::from("b")), Ordering::Less);
//! assert_eq!(compare(&Key::from(5u8), &Key::from(5u8)), Ordering::Equal);
//!
//! let first = Key::structural(&(1u32, "x")).unwrap();
//! let second = Key::structural(&(1u32, "x")).unwrap();
//! assert_eq!(compare(&first, &second), Ordering::Equal);
//! ```

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;

// =============================================================================
// KeyOrder
// =============================================================================

/// Upcasting helper implemented for every `'static` type.
///
/// It is a supertrait of [`KeyOrder`] so `dyn KeyOrder` values can be
/// downcast back to their concrete type.
pub trait AsAnyKey {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAnyKey for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A user-defined key kind with its own three-way comparison.
///
/// When the left operand of [`compare`] is a [`Key::Custom`], the
/// comparison is delegated to [`KeyOrder::compare`] whatever the kind of
/// the right operand is. Implementations should use
/// [`Key::downcast_custom`] to recognize operands of their own type.
///
/// # Examples
///
/// ```rust
/// use keytree::compare::{Key, KeyOrder};
/// use std::cmp::Ordering;
///
/// #[derive(Debug)]
/// struct Version(u32, u32);
///
/// impl KeyOrder for Version {
///     fn compare(&self, other: &Key) -> Ordering {
///         match other.downcast_custom::<Self>() {
///             Some(other) => (self.0, self.1).cmp(&(other.0, other.1)),
///             None => Ordering::Greater,
///         }
///     }
/// }
///
/// let older = Key::custom(Version(1, 9));
/// let newer = Key::custom(Version(1, 10));
/// assert!(older < newer);
/// ```
pub trait KeyOrder: AsAnyKey + fmt::Debug + Send + Sync + 'static {
    /// Compares `self` with `other`.
    fn compare(&self, other: &Key) -> Ordering;
}

// =============================================================================
// Key
// =============================================================================

/// An ordered value addressing an entry in the tree.
///
/// Cloning a key is cheap: every payload is reference-counted or `Copy`.
#[derive(Clone)]
pub enum Key {
    /// A text string, ordered by its UTF-8 bytes.
    Text(Arc<str>),
    /// A single unsigned byte, ordered numerically.
    Byte(u8),
    /// A user-defined key with its own comparison.
    Custom(Arc<dyn KeyOrder>),
    /// The canonical structural encoding of an arbitrary value.
    Structural(Arc<[u8]>),
}

const TEXT_TAG: u8 = 0;
const BYTE_TAG: u8 = 1;
const CUSTOM_TAG: u8 = 2;
const STRUCTURAL_TAG: u8 = 3;

impl Key {
    /// Creates a text key.
    pub fn text(value: impl Into<Arc<str>>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a custom key.
    pub fn custom<T: KeyOrder>(value: T) -> Self {
        Self::Custom(Arc::new(value))
    }

    /// Creates a structural key from the canonical encoding of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Encoding`](crate::error::TreeError::Encoding)
    /// if `value` cannot be serialized.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use keytree::compare::Key;
    ///
    /// let key = Key::structural(&vec!["users", "42"]).unwrap();
    /// assert_eq!(key, Key::structural(&vec!["users", "42"]).unwrap());
    /// ```
    pub fn structural<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let encoded = bincode::serialize(value)?;
        Ok(Self::Structural(encoded.into()))
    }

    /// Returns the text payload if this is a text key.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_ref()),
            _ => None,
        }
    }

    /// Returns the byte payload if this is a byte key.
    pub const fn as_byte(&self) -> Option<u8> {
        match self {
            Self::Byte(byte) => Some(*byte),
            _ => None,
        }
    }

    /// Downcasts a custom key to its concrete type.
    pub fn downcast_custom<T: KeyOrder>(&self) -> Option<&T> {
        match self {
            Self::Custom(custom) => (**custom).as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The canonical encoding, split into kind tag and payload bytes.
    fn canonical(&self) -> (u8, &[u8]) {
        match self {
            Self::Text(text) => (TEXT_TAG, text.as_bytes()),
            Self::Byte(byte) => (BYTE_TAG, std::slice::from_ref(byte)),
            Self::Custom(_) => (CUSTOM_TAG, &[] as &[u8]),
            Self::Structural(bytes) => (STRUCTURAL_TAG, &bytes[..]),
        }
    }
}

/// Compares two keys.
///
/// Both text: byte-wise. Both byte: numeric. Left operand custom: delegated
/// to [`KeyOrder::compare`]. Anything else: canonical encodings compared
/// byte-wise.
pub fn compare(left: &Key, right: &Key) -> Ordering {
    match (left, right) {
        (Key::Text(left), Key::Text(right)) => left.as_bytes().cmp(right.as_bytes()),
        (Key::Byte(left), Key::Byte(right)) => left.cmp(right),
        (Key::Custom(custom), _) => custom.compare(right),
        _ => left.canonical().cmp(&right.canonical()),
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        compare(self, other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

/// Custom keys hash by kind only, since their equality is user-defined.
impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (tag, payload) = self.canonical();
        tag.hash(state);
        payload.hash(state);
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(formatter, "{text:?}"),
            Self::Byte(byte) => write!(formatter, "{byte}u8"),
            Self::Custom(custom) => write!(formatter, "{custom:?}"),
            Self::Structural(bytes) => {
                formatter.write_str("#")?;
                for byte in bytes.iter() {
                    write!(formatter, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Text(value.into())
    }
}

impl From<u8> for Key {
    fn from(value: u8) -> Self {
        Self::Byte(value)
    }
}

// =============================================================================
// Tests
// =============================================================================
