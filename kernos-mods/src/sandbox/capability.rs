//! Capabilities: named authorities represented as bits in a 32-bit mask.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// A single named authority. The discriminant is the authoritative bit
/// assignment of the sandbox wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Capability {
    /// Allocate bytes.
    MemoryAlloc = 1,
    /// Free bytes.
    MemoryFree = 2,
    /// Map memory.
    MemoryMap = 4,
    /// Unmap memory.
    MemoryUnmap = 8,
    /// Change protection on mapped memory.
    MemoryProtect = 16,
    /// Spawn actors.
    ActorCreate = 32,
    /// Terminate actors.
    ActorDestroy = 64,
    /// Mutate actor attributes.
    ActorModify = 128,
    /// Send signals/messages to actors.
    ActorSignal = 256,
    /// Load modules.
    ModuleLoad = 512,
    /// Unload modules.
    ModuleUnload = 1024,
    /// Query module state.
    ModuleQuery = 2048,
    /// Write to the text console.
    VgaWrite = 4096,
    /// Clear the text console.
    VgaClear = 8192,
    /// Move the console cursor.
    VgaCursor = 16384,
    /// Raw port I/O.
    HwIo = 32768,
    /// Register interrupt handlers.
    InterruptHandle = 65536,
    /// Read the timer.
    TimerAccess = 131072,
    /// Read files.
    FsRead = 262144,
    /// Write files.
    FsWrite = 524288,
    /// Create files.
    FsCreate = 1048576,
    /// Delete files.
    FsDelete = 2097152,
    /// Send network packets.
    NetSend = 4194304,
    /// Receive network packets.
    NetRecv = 8388608,
    /// Open sockets.
    NetSocket = 16777216,
    /// Query the AI supervisor.
    AiQuery = 33554432,
    /// Reconfigure the AI supervisor.
    AiConfigure = 67108864,
    /// Attach debuggers, read kernel internals.
    DebugAccess = 134217728,
    /// Power the system down.
    SystemShutdown = 268435456,
    /// Bypass sandbox policy (privileged operations only).
    SecurityOverride = 536870912,
}

impl Capability {
    /// All defined capabilities, in bit order.
    pub const ALL: [Capability; 30] = [
        Capability::MemoryAlloc,
        Capability::MemoryFree,
        Capability::MemoryMap,
        Capability::MemoryUnmap,
        Capability::MemoryProtect,
        Capability::ActorCreate,
        Capability::ActorDestroy,
        Capability::ActorModify,
        Capability::ActorSignal,
        Capability::ModuleLoad,
        Capability::ModuleUnload,
        Capability::ModuleQuery,
        Capability::VgaWrite,
        Capability::VgaClear,
        Capability::VgaCursor,
        Capability::HwIo,
        Capability::InterruptHandle,
        Capability::TimerAccess,
        Capability::FsRead,
        Capability::FsWrite,
        Capability::FsCreate,
        Capability::FsDelete,
        Capability::NetSend,
        Capability::NetRecv,
        Capability::NetSocket,
        Capability::AiQuery,
        Capability::AiConfigure,
        Capability::DebugAccess,
        Capability::SystemShutdown,
        Capability::SecurityOverride,
    ];

    /// The capability's bit.
    pub const fn bit(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A set of capabilities as a 32-bit mask.
///
/// # Example
/// ```rust
/// use kernos_mods::sandbox::{Capability, CapSet};
///
/// let set = CapSet::EMPTY | Capability::MemoryAlloc | Capability::ModuleQuery;
/// assert!(set.contains(Capability::ModuleQuery));
/// assert!(!set.contains(Capability::FsWrite));
/// assert_eq!(set.bits(), 1 | 2048);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapSet(u32);

impl CapSet {
    /// The empty set.
    pub const EMPTY: CapSet = CapSet(0);

    /// Every defined capability.
    pub const ALL: CapSet = CapSet(0x3FFF_FFFF);

    /// Construct from a raw mask; undefined high bits are discarded.
    pub const fn from_bits(bits: u32) -> Self {
        CapSet(bits & CapSet::ALL.0)
    }

    /// The raw mask.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether the capability's bit is set.
    pub const fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    /// Set a bit. Idempotent.
    #[must_use]
    pub const fn with(self, cap: Capability) -> Self {
        CapSet(self.0 | cap.bit())
    }

    /// Clear a bit. Idempotent.
    #[must_use]
    pub const fn without(self, cap: Capability) -> Self {
        CapSet(self.0 & !cap.bit())
    }

    /// Set union.
    #[must_use]
    pub const fn union(self, other: CapSet) -> Self {
        CapSet(self.0 | other.0)
    }

    /// Effective mask under a deny set: `self AND NOT denied`.
    #[must_use]
    pub const fn effective(self, denied: CapSet) -> Self {
        CapSet(self.0 & !denied.0)
    }

    /// Whether the set is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The capabilities present, in bit order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |cap| self.contains(*cap))
    }
}

impl std::ops::BitOr<Capability> for CapSet {
    type Output = CapSet;

    fn bitor(self, cap: Capability) -> CapSet {
        self.with(cap)
    }
}

impl std::ops::BitOr for CapSet {
    type Output = CapSet;

    fn bitor(self, other: CapSet) -> CapSet {
        self.union(other)
    }
}

impl FromIterator<Capability> for CapSet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(CapSet::EMPTY, CapSet::with)
    }
}

impl fmt::Display for CapSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for cap in self.iter() {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "{cap}")?;
            first = false;
        }
        if first {
            f.write_str("(none)")?;
        }
        Ok(())
    }
}
