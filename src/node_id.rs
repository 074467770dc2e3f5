//! Process-wide unique, time-ordered node identities.
//!
//! A [`NodeId`] packs the current wall-clock second into its high 34 bits
//! and a process-wide counter, wrapped modulo 2^29, into its low 29 bits.
//! Identities generated within the same second are distinct for up to 2^29
//! calls; beyond that rate they silently collide.
//!
//! # Examples
//!
//! ```rust
//! use keytree::node_id::NodeId;
//!
//! let first = NodeId::generate();
//! let second = NodeId::generate();
//! assert_ne!(first, second);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

const SERIAL_BITS: u32 = 29;
const SERIAL_MASK: u64 = (1 << SERIAL_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << 34) - 1;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(0);

/// Cheaply comparable identity of a node instance.
///
/// Two nodes with the same identity are the same instance; a node rebuilt by
/// a mutation always receives a fresh identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Generates a new identity from the clock and the process-wide counter.
    pub fn generate() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        let serial = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed).wrapping_add(1) & SERIAL_MASK;
        Self(((seconds & TIMESTAMP_MASK) << SERIAL_BITS) | serial)
    }

    /// Reconstructs an identity from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw 63-bit value.
    pub const fn into_raw(self) -> u64 {
        self.0
    }

    /// The wall-clock second the identity was generated in.
    pub const fn timestamp(self) -> u64 {
        self.0 >> SERIAL_BITS
    }

    /// The counter segment.
    pub const fn serial(self) -> u64 {
        self.0 & SERIAL_MASK
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "NodeId({}:{})", self.timestamp(), self.serial())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:016x}", self.0)
    }
}
