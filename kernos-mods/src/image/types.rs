//! Module classification: types, flags, symbol attributes.

// Layer 1: Standard library imports
use std::fmt;
use std::ops::BitOr;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Module type discriminant carried in the image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleType {
    /// Kernel-essential; cannot be unloaded.
    Core,
    /// Hardware driver.
    Driver,
    /// Filesystem service.
    Filesystem,
    /// Network service.
    Network,
    /// Security service.
    Security,
    /// Interactive shell.
    Shell,
    /// Diagnostics and self-test.
    Diagnostic,
    /// Supervision and monitoring.
    Supervisor,
    /// Anything else.
    Custom,
}

impl ModuleType {
    /// Decode the header discriminant.
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => ModuleType::Core,
            1 => ModuleType::Driver,
            2 => ModuleType::Filesystem,
            3 => ModuleType::Network,
            4 => ModuleType::Security,
            5 => ModuleType::Shell,
            6 => ModuleType::Diagnostic,
            7 => ModuleType::Supervisor,
            8 => ModuleType::Custom,
            _ => return None,
        })
    }

    /// Header discriminant.
    pub fn to_raw(self) -> u8 {
        match self {
            ModuleType::Core => 0,
            ModuleType::Driver => 1,
            ModuleType::Filesystem => 2,
            ModuleType::Network => 3,
            ModuleType::Security => 4,
            ModuleType::Shell => 5,
            ModuleType::Diagnostic => 6,
            ModuleType::Supervisor => 7,
            ModuleType::Custom => 8,
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleType::Core => "core",
            ModuleType::Driver => "driver",
            ModuleType::Filesystem => "filesystem",
            ModuleType::Network => "network",
            ModuleType::Security => "security",
            ModuleType::Shell => "shell",
            ModuleType::Diagnostic => "diagnostic",
            ModuleType::Supervisor => "supervisor",
            ModuleType::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Module flag bitmask (u16 in the header).
///
/// # Example
/// ```rust
/// use kernos_mods::image::ModuleFlags;
///
/// let flags = ModuleFlags::AUTO_START | ModuleFlags::HOT_SWAP;
/// assert!(flags.contains(ModuleFlags::HOT_SWAP));
/// assert!(!flags.contains(ModuleFlags::CORE));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleFlags(u16);

impl ModuleFlags {
    /// No flags.
    pub const NONE: ModuleFlags = ModuleFlags(0);
    /// Kernel-essential; unload is always refused.
    pub const CORE: ModuleFlags = ModuleFlags(0x0001);
    /// Transition straight to `Running` after a successful load.
    pub const AUTO_START: ModuleFlags = ModuleFlags(0x0002);
    /// Eligible for hot-swap.
    pub const HOT_SWAP: ModuleFlags = ModuleFlags(0x0004);
    /// Subject to supervisor behavior monitoring.
    pub const AI_MONITOR: ModuleFlags = ModuleFlags(0x0008);
    /// Defaults to the Trusted security level.
    pub const PRIVILEGED: ModuleFlags = ModuleFlags(0x0010);
    /// Survives a soft reboot (advisory; persistence is out of scope).
    pub const PERSISTENT: ModuleFlags = ModuleFlags(0x0020);

    /// All defined flag bits.
    const ALL: u16 = 0x003F;

    /// Reconstruct from the header field, rejecting undefined bits.
    pub fn from_raw(raw: u16) -> Option<Self> {
        (raw & !Self::ALL == 0).then_some(Self(raw))
    }

    /// Header field value.
    pub fn to_raw(self) -> u16 {
        self.0
    }

    /// Whether every bit of `other` is set in `self`.
    pub fn contains(self, other: ModuleFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ModuleFlags {
    type Output = ModuleFlags;

    fn bitor(self, rhs: ModuleFlags) -> ModuleFlags {
        ModuleFlags(self.0 | rhs.0)
    }
}

/// Symbol type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolType {
    /// Executable entry.
    Function,
    /// Data object.
    Object,
}

impl SymbolType {
    /// Decode the entry discriminant.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(SymbolType::Function),
            1 => Some(SymbolType::Object),
            _ => None,
        }
    }

    /// Entry discriminant.
    pub fn to_raw(self) -> u8 {
        match self {
            SymbolType::Function => 0,
            SymbolType::Object => 1,
        }
    }
}

/// Symbol visibility; only `Global` symbols are published to the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolVisibility {
    /// Published to the global symbol table.
    Global,
    /// Module-internal; never resolvable.
    Local,
}

impl SymbolVisibility {
    /// Decode the entry discriminant.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(SymbolVisibility::Global),
            1 => Some(SymbolVisibility::Local),
            _ => None,
        }
    }

    /// Entry discriminant.
    pub fn to_raw(self) -> u8 {
        match self {
            SymbolVisibility::Global => 0,
            SymbolVisibility::Local => 1,
        }
    }
}
