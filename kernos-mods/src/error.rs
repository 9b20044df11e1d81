//! Error types for the module registry, sandbox engine, and kernel facade.
//!
//! Errors form a small taxonomy surfaced to callers; nothing is swallowed.
//! Module- and sandbox-level failures isolate the offender; only invariant
//! corruption (surfaced from the scheduler) is fatal.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::ids::ModuleId;
use crate::registry::ModuleState;
use crate::sandbox::{Capability, ResourceType};
use kernos_rt::SchedulerError;

/// Validation failures while decoding a module image.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    /// Buffer smaller than the fixed header.
    #[error("image too short: {actual} bytes, header needs {expected}")]
    TooShort {
        /// Bytes required.
        expected: usize,
        /// Bytes provided.
        actual: usize,
    },

    /// Header magic mismatch.
    #[error("bad image magic {found:#x}")]
    BadMagic {
        /// Value found in the header.
        found: u32,
    },

    /// Unsupported format version.
    #[error("unsupported image format version {found}")]
    UnsupportedVersion {
        /// Version found in the header.
        found: u32,
    },

    /// Name field empty or not valid UTF-8.
    #[error("invalid module name field")]
    BadName,

    /// A section exceeds its cap.
    #[error("{section} section of {size} bytes exceeds cap {max}")]
    SectionTooLarge {
        /// Which section.
        section: &'static str,
        /// Declared size.
        size: u32,
        /// The cap.
        max: u32,
    },

    /// Loaded region (code+data+bss) exceeds the image cap.
    #[error("image of {total} bytes exceeds cap {max}")]
    ImageTooLarge {
        /// Declared total.
        total: u64,
        /// The cap.
        max: u32,
    },

    /// Declared sections or tables run past the provided buffer.
    #[error("truncated image: {what} needs bytes {start}..{end}, buffer has {actual}")]
    Truncated {
        /// What was being read.
        what: &'static str,
        /// Start offset.
        start: usize,
        /// End offset (exclusive).
        end: usize,
        /// Buffer length.
        actual: usize,
    },

    /// Stored checksum does not match the computed one.
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    BadChecksum {
        /// Checksum carried in the header.
        stored: u32,
        /// Checksum computed over the image.
        computed: u32,
    },

    /// Unknown module type discriminant.
    #[error("unknown module type {found}")]
    UnknownType {
        /// Discriminant found.
        found: u8,
    },

    /// Undefined flag bits set.
    #[error("undefined module flags {found:#06x}")]
    UnknownFlags {
        /// Raw flags field.
        found: u16,
    },

    /// Unknown priority discriminant.
    #[error("unknown priority {found}")]
    UnknownPriority {
        /// Discriminant found.
        found: u8,
    },

    /// Entry or exit offset points outside the code section.
    #[error("{which} offset {offset} outside code section of {code_size} bytes")]
    BadEntryOffset {
        /// Which offset field.
        which: &'static str,
        /// The offending offset.
        offset: u32,
        /// Code section size.
        code_size: u32,
    },

    /// A symbol entry is malformed (name, discriminants, or range).
    #[error("invalid symbol entry {index}: {reason}")]
    BadSymbol {
        /// Index into the symbol table.
        index: usize,
        /// What was wrong.
        reason: &'static str,
    },

    /// A dependency entry is malformed.
    #[error("invalid dependency entry {index}: {reason}")]
    BadDependency {
        /// Index into the dependency table.
        index: usize,
        /// What was wrong.
        reason: &'static str,
    },
}

/// Errors from module registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModuleError {
    /// Image validation failed; the load was unwound.
    #[error("validation failed: {0}")]
    Validation(#[from] ImageError),

    /// A module with this name is already registered.
    #[error("module '{name}' is already loaded")]
    AlreadyLoaded {
        /// The colliding name.
        name: String,
    },

    /// The module table has no free slot.
    #[error("module table full ({max_modules} slots)")]
    TableFull {
        /// Configured table size.
        max_modules: usize,
    },

    /// Lookup found no module for the id.
    #[error("no such module: {0}")]
    NoSuchId(ModuleId),

    /// A required dependency could not be satisfied.
    #[error("module '{module}' dependency '{dependency}' unsatisfied: {reason}")]
    DependencyUnsatisfied {
        /// The loading module.
        module: String,
        /// The missing requirement.
        dependency: String,
        /// Why it failed.
        reason: String,
    },

    /// An exported name collides with an already-published symbol.
    #[error("symbol '{symbol}' already exported by {owner}")]
    SymbolCollision {
        /// The colliding symbol.
        symbol: String,
        /// Module that owns the existing export.
        owner: ModuleId,
    },

    /// The module's `init` returned non-zero; the load was unwound.
    #[error("module '{name}' init failed with code {code}")]
    InitFailed {
        /// The failing module.
        name: String,
        /// Its init return code.
        code: i32,
    },

    /// Unload refused: the module is flagged `Core`.
    #[error("module '{name}' is a core module and cannot be unloaded")]
    CoreUnload {
        /// The protected module.
        name: String,
    },

    /// Unload refused: other modules still depend on this one.
    #[error("module '{name}' has {count} dependent module(s)")]
    HasDependents {
        /// The depended-upon module.
        name: String,
        /// How many modules depend on it.
        count: usize,
    },

    /// A lifecycle operation was applied in the wrong state.
    #[error("invalid state for {op}: {module} is {state}")]
    StateInvalid {
        /// The module.
        module: ModuleId,
        /// Its state at the time.
        state: ModuleState,
        /// The rejected operation.
        op: &'static str,
    },

    /// Hot-swap refused: the module was not built for it.
    #[error("module '{name}' does not carry the HotSwap flag")]
    SwapNotAllowed {
        /// The module.
        name: String,
    },

    /// Hot-swap refused: calls into the module are still in flight.
    /// Retry at the next yield boundary.
    #[error("module '{name}' busy: {in_flight} call(s) in flight")]
    HotSwapBusy {
        /// The module.
        name: String,
        /// Outstanding entry count.
        in_flight: u32,
    },

    /// Hot-swap image names a different module.
    #[error("swap image names '{found}', expected '{expected}'")]
    NameMismatch {
        /// Name of the module being swapped.
        expected: String,
        /// Name carried by the staged image.
        found: String,
    },

    /// Symbol resolution found nothing.
    #[error("symbol '{symbol}' not found")]
    SymbolNotFound {
        /// The unresolved name.
        symbol: String,
    },
}

/// Errors from sandbox-checked operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SandboxError {
    /// The effective capability mask lacks the required bit. Logged as a
    /// violation; the operation fails, the module keeps running.
    #[error("{module}: capability {cap} denied")]
    CapabilityDenied {
        /// The checked module.
        module: ModuleId,
        /// The missing capability.
        cap: Capability,
    },

    /// A resource charge would exceed an enforced limit.
    #[error("{module}: {resource} limit {limit} exceeded (attempted {attempted})")]
    ResourceExceeded {
        /// The charged module.
        module: ModuleId,
        /// The limited resource.
        resource: ResourceType,
        /// The enforced ceiling.
        limit: u64,
        /// Requested total.
        attempted: u64,
    },

    /// Memory access outside the module's image or attributed allocations.
    #[error("{module}: memory access {addr:#x}+{len} denied")]
    MemoryAccessDenied {
        /// The checked module.
        module: ModuleId,
        /// Start of the rejected range.
        addr: u64,
        /// Length of the rejected range.
        len: usize,
    },

    /// The function name is on the built-in deny-list.
    #[error("{module}: call to '{name}' denied by policy")]
    FunctionDenied {
        /// The calling module.
        module: ModuleId,
        /// The denied function.
        name: String,
    },

    /// The sandbox is quarantined; only a privileged operation may change
    /// its capabilities or level.
    #[error("{module}: sandbox is quarantined")]
    QuarantineLocked {
        /// The quarantined module.
        module: ModuleId,
    },
}

/// Top-level error for kernel facade operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Scheduler or messaging failure.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Module registry failure.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Sandbox denial.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// Configuration rejected at boot.
    #[error("invalid configuration: {reason}")]
    Config {
        /// What validation found.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_error_into_module_error() {
        let err: ModuleError = ImageError::BadMagic { found: 7 }.into();
        assert!(matches!(err, ModuleError::Validation(_)));
        assert!(err.to_string().contains("0x7"));
    }

    #[test]
    fn test_kernel_error_is_transparent() {
        let err: KernelError = SandboxError::QuarantineLocked {
            module: ModuleId::from_index(1),
        }
        .into();
        assert_eq!(err.to_string(), "module#1: sandbox is quarantined");
    }
}
