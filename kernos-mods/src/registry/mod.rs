//! Module registry: records, symbol table, and the lifecycle manager.

pub mod manager;
pub mod record;
pub mod symbols;

pub use manager::{
    LoadOptions, ModuleRegistry, RegistryConfig, RegistryHealth, RegistryStats, DEFAULT_MAX_MODULES,
};
pub use record::{
    DependencyLink, Export, HookContext, ModuleAccounting, ModuleHook, ModuleHooks, ModuleRecord,
    ModuleState,
};
pub use symbols::{SymbolBinding, SymbolStats, SymbolTable};
