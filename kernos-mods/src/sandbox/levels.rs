//! Security levels and their default capability sets and limits.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::capability::{CapSet, Capability};
use super::limits::ResourceType;

/// Quarantine memory ceiling.
pub const QUARANTINE_MEMORY_LIMIT: u64 = 256 * 1024;

/// Per-module security level. `Quarantine` is a terminal sink: only an
/// explicit privileged operation can restore a quarantined module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// Kernel-internal; no checks bind.
    Unrestricted,
    /// First-party services.
    Trusted,
    /// Ordinary modules.
    User,
    /// Third-party code of unknown provenance.
    Untrusted,
    /// Escalation sink with the smallest capability set.
    Quarantine,
}

impl SecurityLevel {
    /// Default granted capability set for the level.
    pub fn default_caps(self) -> CapSet {
        match self {
            SecurityLevel::Unrestricted => CapSet::ALL,
            SecurityLevel::Trusted => {
                CapSet::EMPTY
                    | Capability::MemoryAlloc
                    | Capability::MemoryFree
                    | Capability::ActorCreate
                    | Capability::ActorSignal
                    | Capability::ModuleQuery
                    | Capability::VgaWrite
                    | Capability::VgaClear
                    | Capability::VgaCursor
                    | Capability::TimerAccess
                    | Capability::AiQuery
                    | Capability::DebugAccess
            }
            SecurityLevel::User => {
                CapSet::EMPTY
                    | Capability::MemoryAlloc
                    | Capability::MemoryFree
                    | Capability::ActorSignal
                    | Capability::ModuleQuery
                    | Capability::VgaWrite
                    | Capability::TimerAccess
                    | Capability::AiQuery
            }
            SecurityLevel::Untrusted => {
                CapSet::EMPTY
                    | Capability::MemoryAlloc
                    | Capability::MemoryFree
                    | Capability::ModuleQuery
            }
            SecurityLevel::Quarantine => CapSet::EMPTY | Capability::ModuleQuery,
        }
    }

    /// Default enforced resource limits for the level.
    pub fn default_limits(self) -> Vec<(ResourceType, u64)> {
        match self {
            SecurityLevel::Unrestricted => Vec::new(),
            SecurityLevel::Trusted => vec![
                (ResourceType::Memory, 16 * 1024 * 1024),
                (ResourceType::ChildActors, 32),
                (ResourceType::HeapAllocs, 8192),
            ],
            SecurityLevel::User => vec![
                (ResourceType::Memory, 4 * 1024 * 1024),
                (ResourceType::ChildActors, 8),
                (ResourceType::HeapAllocs, 2048),
                (ResourceType::ModuleCalls, 100_000),
            ],
            SecurityLevel::Untrusted => vec![
                (ResourceType::Memory, 1024 * 1024),
                (ResourceType::ChildActors, 2),
                (ResourceType::HeapAllocs, 256),
                (ResourceType::ModuleCalls, 10_000),
                (ResourceType::AiQueries, 64),
            ],
            SecurityLevel::Quarantine => vec![
                (ResourceType::Memory, QUARANTINE_MEMORY_LIMIT),
                (ResourceType::ChildActors, 0),
                (ResourceType::HeapAllocs, 16),
                (ResourceType::ModuleCalls, 1000),
                (ResourceType::AiQueries, 0),
            ],
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SecurityLevel::Unrestricted => "unrestricted",
            SecurityLevel::Trusted => "trusted",
            SecurityLevel::User => "user",
            SecurityLevel::Untrusted => "untrusted",
            SecurityLevel::Quarantine => "quarantine",
        };
        f.write_str(name)
    }
}
