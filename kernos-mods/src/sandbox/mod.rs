//! Sandbox engine: capability masks, resource limits, violations,
//! quarantine.

pub mod capability;
pub mod engine;
pub mod gate;
pub mod levels;
pub mod limits;
pub mod violation;

pub use capability::{CapSet, Capability};
pub use engine::{Sandbox, SandboxStats, DEFAULT_QUARANTINE_THRESHOLD};
pub use levels::{SecurityLevel, QUARANTINE_MEMORY_LIMIT};
pub use limits::{LimitTable, ResourceLimit, ResourceType};
pub use violation::{ViolationKind, ViolationLog, ViolationRecord};
