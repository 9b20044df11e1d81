//! Module slot records: state machine, image region, hooks, accounting.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::ids::ModuleId;
use crate::image::{ModuleFlags, ModuleType, ParsedDependency, ParsedSymbol, SymbolVisibility};
use crate::sandbox::Sandbox;
use kernos_rt::{Priority, Tick};

/// Module lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleState {
    /// Slot placeholder; never observed on a live record.
    Unloaded,
    /// Load pipeline in progress.
    Loading,
    /// Loaded and initialized, not started.
    Loaded,
    /// Started (implicitly by `AutoStart` or explicitly).
    Running,
    /// Unload pipeline in progress.
    Unloading,
    /// Init or runtime failure; isolated.
    Error,
    /// Suspended by the registry health check or an operator.
    Suspended,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleState::Unloaded => "unloaded",
            ModuleState::Loading => "loading",
            ModuleState::Loaded => "loaded",
            ModuleState::Running => "running",
            ModuleState::Unloading => "unloading",
            ModuleState::Error => "error",
            ModuleState::Suspended => "suspended",
        };
        f.write_str(name)
    }
}

/// Context handed to a module's fixed hook slots.
pub struct HookContext<'a> {
    /// The module the hook belongs to.
    pub module: ModuleId,
    /// Its sandbox, for capability and limit work inside the hook.
    pub sandbox: &'a mut Sandbox,
    /// Current kernel tick.
    pub now: Tick,
}

/// A module lifecycle hook. Returns 0 for success; `init` returning
/// non-zero fails the load.
pub type ModuleHook = fn(&mut HookContext<'_>) -> i32;

/// The three fixed function-pointer slots per module record. A module that
/// does not export an entry leaves the slot empty; callers check.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleHooks {
    /// Called at the end of the load pipeline.
    pub init: Option<ModuleHook>,
    /// Called at the start of the unload pipeline and before a hot-swap.
    pub exit: Option<ModuleHook>,
    /// Called for gated function calls into the module.
    pub ioctl: Option<ModuleHook>,
}

/// Per-module accounting.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModuleAccounting {
    /// Cpu ticks attributed to module code.
    pub cpu_ticks: u64,
    /// Bytes held by the image region.
    pub memory_bytes: usize,
    /// Gated calls into the module.
    pub function_calls: u64,
    /// Failures attributed to the module.
    pub error_count: u32,
    /// Behavior score 0..=100.
    pub behavior_score: u8,
}

impl ModuleAccounting {
    fn new(memory_bytes: usize) -> Self {
        Self {
            cpu_ticks: 0,
            memory_bytes,
            function_calls: 0,
            error_count: 0,
            behavior_score: 100,
        }
    }
}

/// An exported symbol as published to the global resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Symbol name.
    pub name: String,
    /// Absolute address inside the module's image region.
    pub address: u64,
    /// Size in bytes.
    pub size: u32,
}

/// A resolved dependency edge.
#[derive(Debug, Clone)]
pub struct DependencyLink {
    /// Required module name.
    pub name: String,
    /// The satisfying module, when found.
    pub module: Option<ModuleId>,
    /// Whether the load may proceed without it.
    pub optional: bool,
}

/// One slot in the registry's fixed-size module table.
///
/// Owns the contiguous image region (code + data + zeroed bss), the fixed
/// hook slots, the published exports, both directions of the dependency
/// graph (deps and computed dependents), and the bound sandbox.
#[derive(Debug)]
pub struct ModuleRecord {
    /// Dense id, equal to the slot index.
    pub id: ModuleId,
    /// Unique module name.
    pub name: String,
    /// Module version.
    pub version: u32,
    /// Module type from the header.
    pub module_type: ModuleType,
    /// Priority class for module-owned actors.
    pub priority: Priority,
    /// Flag bitmask.
    pub flags: ModuleFlags,
    /// Lifecycle state.
    pub state: ModuleState,
    /// The loaded region: code, then data, then zero-filled bss.
    pub(crate) region: Box<[u8]>,
    /// Code section length within the region.
    pub(crate) code_len: usize,
    /// Data section length within the region.
    pub(crate) data_len: usize,
    /// Entry offset from the start of code; 0 = none.
    pub entry_offset: u32,
    /// Exit offset from the start of code; 0 = none.
    pub exit_offset: u32,
    /// Fixed hook slots.
    pub(crate) hooks: ModuleHooks,
    /// Published exports (global symbols only).
    pub(crate) exports: Vec<Export>,
    /// Forward dependency edges.
    pub(crate) dependencies: Vec<DependencyLink>,
    /// Back-edges: modules that depend on this one.
    pub(crate) dependents: Vec<ModuleId>,
    /// Calls currently inside the module's code; hot-swap requires zero.
    pub(crate) entry_count: u32,
    /// Accounting.
    pub accounting: ModuleAccounting,
    /// The bound security context.
    pub sandbox: Sandbox,
}

impl ModuleRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ModuleId,
        name: String,
        version: u32,
        module_type: ModuleType,
        priority: Priority,
        flags: ModuleFlags,
        region: Box<[u8]>,
        code_len: usize,
        data_len: usize,
        entry_offset: u32,
        exit_offset: u32,
        hooks: ModuleHooks,
        sandbox: Sandbox,
    ) -> Self {
        let memory = region.len();
        Self {
            id,
            name,
            version,
            module_type,
            priority,
            flags,
            state: ModuleState::Loading,
            region,
            code_len,
            data_len,
            entry_offset,
            exit_offset,
            hooks,
            exports: Vec::new(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            entry_count: 0,
            accounting: ModuleAccounting::new(memory),
            sandbox,
        }
    }

    /// Base address of the owned image region.
    pub fn base_address(&self) -> u64 {
        self.region.as_ptr() as u64
    }

    /// Region size: code + data + bss.
    pub fn region_len(&self) -> usize {
        self.region.len()
    }

    /// Whether `addr` falls inside this module's code section.
    pub fn owns_code_address(&self, addr: u64) -> bool {
        let base = self.base_address();
        addr >= base && addr < base + self.code_len as u64
    }

    /// Published exports.
    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// Back-edges: ids of modules depending on this one.
    pub fn dependents(&self) -> &[ModuleId] {
        &self.dependents
    }

    /// Forward dependency edges.
    pub fn dependencies(&self) -> &[DependencyLink] {
        &self.dependencies
    }

    /// Calls currently in flight inside the module.
    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    /// Whether the module can service calls.
    pub fn is_callable(&self) -> bool {
        matches!(self.state, ModuleState::Loaded | ModuleState::Running)
    }

    /// Build the absolute-address export list from parsed symbols. Local
    /// symbols stay private to the module.
    pub(crate) fn exports_from_symbols(&self, symbols: &[ParsedSymbol]) -> Vec<Export> {
        let base = self.base_address();
        symbols
            .iter()
            .filter(|sym| sym.visibility == SymbolVisibility::Global)
            .map(|sym| Export {
                name: sym.name.clone(),
                address: base + u64::from(sym.address_rel),
                size: sym.size,
            })
            .collect()
    }

    /// Record the forward edges for `deps` as resolved against `links`.
    pub(crate) fn set_dependencies(&mut self, deps: &[ParsedDependency], links: &[Option<ModuleId>]) {
        self.dependencies = deps
            .iter()
            .zip(links)
            .map(|(dep, &module)| DependencyLink {
                name: dep.name.clone(),
                module,
                optional: dep.optional,
            })
            .collect();
    }
}
