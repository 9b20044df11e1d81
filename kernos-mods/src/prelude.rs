//! Convenience re-exports for embedders and tests.

pub use crate::error::{ImageError, KernelError, ModuleError, SandboxError};
pub use crate::ids::ModuleId;
pub use crate::image::{
    ImageBuilder, ModuleFlags, ModuleImage, ModuleType, SymbolType, SymbolVisibility,
};
pub use crate::kernel::{Kernel, KernelConfig, KernelReport, KernelStatus};
pub use crate::registry::{
    HookContext, LoadOptions, ModuleHooks, ModuleRegistry, ModuleState, RegistryConfig,
};
pub use crate::sandbox::{
    CapSet, Capability, ResourceType, Sandbox, SecurityLevel, ViolationKind,
};
