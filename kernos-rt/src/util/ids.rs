// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Dense identifier for actors in the system.
///
/// # Design
/// Actor ids are slot indices into the scheduler's fixed-size actor table,
/// stable for the lifetime of the actor. Id 0 is reserved for the kernel
/// actor, which is always running, unmonitored, and has no quota.
///
/// # Example
/// ```rust
/// use kernos_rt::util::ActorId;
///
/// let id = ActorId::from_index(3);
/// assert_eq!(id.index(), 3);
/// assert!(!id.is_kernel());
/// assert!(ActorId::KERNEL.is_kernel());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(u32);

impl ActorId {
    /// The reserved kernel actor (slot 0).
    pub const KERNEL: ActorId = ActorId(0);

    /// Create an ActorId from a slot index.
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Slot index in the actor table.
    pub const fn index(&self) -> u32 {
        self.0
    }

    /// Whether this is the reserved kernel actor.
    pub const fn is_kernel(&self) -> bool {
        self.0 == 0
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Monotonic identifier for messages.
///
/// Allocated by the scheduler at send time; a sync reply carries the
/// message id of its request, so the pair shares one id by design.
///
/// # Example
/// ```rust
/// use kernos_rt::util::MessageId;
///
/// let id = MessageId::from_raw(7);
/// assert_eq!(id.raw(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    /// Create a MessageId from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw monotonic value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg#{}", self.0)
    }
}

/// Hardware interrupt vector number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vector(pub u8);

impl Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "irq{}", self.0)
    }
}

/// Monotonic kernel tick, the unit of the external timer collaborator.
pub type Tick = u64;
