//! The module registry: load, unload, hot-swap, symbol resolution.

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use super::record::{HookContext, ModuleHooks, ModuleRecord, ModuleState};
use super::symbols::{SymbolBinding, SymbolStats, SymbolTable};
use crate::error::ModuleError;
use crate::ids::ModuleId;
use crate::image::{ModuleFlags, ModuleImage, ModuleType, ParsedDependency};
use crate::sandbox::{ResourceType, Sandbox, SecurityLevel};
use kernos_rt::Tick;

/// Default module table size.
pub const DEFAULT_MAX_MODULES: usize = 64;

/// Registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Fixed module table size.
    pub max_modules: usize,

    /// Strict enforcement: repeated sandbox violations quarantine the
    /// module.
    pub strict_enforcement: bool,

    /// Verify image checksums at load (signature checking is reserved).
    pub verify_checksum: bool,

    /// Error count at which the periodic health check suspends a module.
    pub error_suspend_threshold: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_modules: DEFAULT_MAX_MODULES,
            strict_enforcement: true,
            verify_checksum: true,
            error_suspend_threshold: 3,
        }
    }
}

impl RegistryConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_modules == 0 {
            return Err("max_modules must be > 0".to_string());
        }
        Ok(())
    }
}

/// Options for a single load.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadOptions {
    /// Security level override; defaults derive from type and flags.
    pub level: Option<SecurityLevel>,
    /// Hook slots to install.
    pub hooks: ModuleHooks,
}

/// Aggregate registry counters.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct RegistryStats {
    /// Successful loads.
    pub loads: u64,
    /// Loads rejected or unwound.
    pub failed_loads: u64,
    /// Successful unloads.
    pub unloads: u64,
    /// Successful hot-swaps.
    pub swaps: u64,
    /// Swaps rejected or rolled back.
    pub failed_swaps: u64,
    /// Health checks run.
    pub health_checks: u64,
}

/// Result of a periodic health pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RegistryHealth {
    /// Modules inspected.
    pub checked: usize,
    /// Modules moved to `Suspended` for crossing the error threshold.
    pub suspended: Vec<ModuleId>,
}

/// Manages the full lifecycle of hot-swappable module images.
///
/// Owns the fixed-size module table and the global symbol table. The
/// dependency graph is acyclic at steady state (loads are strictly
/// post-order relative to dependencies), and every edge is mirrored: if A
/// depends on B, B's dependents contain A.
#[derive(Debug)]
pub struct ModuleRegistry {
    config: RegistryConfig,
    slots: Vec<Option<ModuleRecord>>,
    by_name: HashMap<String, ModuleId>,
    symbols: SymbolTable,
    stats: RegistryStats,
}

impl ModuleRegistry {
    /// Create a registry from a validated configuration.
    pub fn new(config: RegistryConfig) -> Self {
        let mut slots = Vec::with_capacity(config.max_modules);
        slots.resize_with(config.max_modules, || None);
        Self {
            config,
            slots,
            by_name: HashMap::new(),
            symbols: SymbolTable::new(),
            stats: RegistryStats::default(),
        }
    }

    // ------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------

    /// Run the load pipeline: validate, check uniqueness, allocate the
    /// region, resolve imports, publish exports, create the sandbox, run
    /// `init`, and transition to `Loaded` (or `Running` under `AutoStart`).
    /// Any failure unwinds completely; a half-loaded module is never
    /// observable.
    pub fn load(
        &mut self,
        bytes: &[u8],
        options: LoadOptions,
        now: Tick,
    ) -> Result<ModuleId, ModuleError> {
        match self.try_load(bytes, options, now) {
            Ok(id) => {
                self.stats.loads += 1;
                Ok(id)
            }
            Err(err) => {
                self.stats.failed_loads += 1;
                warn!(%err, "module load failed");
                Err(err)
            }
        }
    }

    fn try_load(
        &mut self,
        bytes: &[u8],
        options: LoadOptions,
        now: Tick,
    ) -> Result<ModuleId, ModuleError> {
        // 1. Validate.
        let image = ModuleImage::parse(bytes, self.config.verify_checksum)?;

        // 2. Uniqueness.
        if self.by_name.contains_key(&image.name) {
            return Err(ModuleError::AlreadyLoaded {
                name: image.name.clone(),
            });
        }
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(ModuleError::TableFull {
                max_modules: self.config.max_modules,
            })?;
        let id = ModuleId::from_index(index as u32);

        // 3. Allocate one contiguous region: code, data, zeroed bss. On a
        // later pipeline failure the region simply drops.
        let mut region = Vec::with_capacity(image.region_size());
        region.extend_from_slice(image.code);
        region.extend_from_slice(image.data);
        region.resize(image.region_size(), 0);

        // 4. Resolve imports; nothing is published or mirrored yet.
        let links = self.resolve_dependencies(&image.name, &image.dependencies)?;

        // 6. Sandbox at the requested or derived level.
        let level = options
            .level
            .unwrap_or_else(|| default_level(image.module_type, image.flags));
        let sandbox = Sandbox::new(id, level, self.config.strict_enforcement);

        let mut record = ModuleRecord::new(
            id,
            image.name.clone(),
            image.version,
            image.module_type,
            image.priority,
            image.flags,
            region.into_boxed_slice(),
            image.code.len(),
            image.data.len(),
            image.entry_offset,
            image.exit_offset,
            options.hooks,
            sandbox,
        );
        record
            .sandbox
            .set_image_region(record.base_address(), record.region_len());
        record
            .sandbox
            .account(ResourceType::Memory, record.region_len() as u64);
        record.set_dependencies(&image.dependencies, &links);
        record.exports = record.exports_from_symbols(&image.symbols);

        // 5. Publish exports; visible only from this point.
        self.symbols.publish(id, &record.exports)?;

        // Mirror back-edges now that the load is committed to a slot.
        self.by_name.insert(record.name.clone(), id);
        self.slots[index] = Some(record);
        for link in self.slots[index]
            .as_ref()
            .map(|r| r.dependencies.clone())
            .unwrap_or_default()
        {
            if let Some(dep_id) = link.module {
                if let Some(dep) = self.slot_mut_opt(dep_id) {
                    dep.dependents.push(id);
                }
            }
        }

        // 7. Init through the sandbox.
        if let Some(init) = options.hooks.init {
            let code = self.run_hook(id, init, now);
            if code != 0 {
                // Reversed unload path.
                let name = image.name.clone();
                self.unwind_slot(id);
                return Err(ModuleError::InitFailed { name, code });
            }
        }

        // 8. Transition.
        let auto_start = image.flags.contains(ModuleFlags::AUTO_START);
        if let Some(record) = self.slot_mut_opt(id) {
            record.state = if auto_start {
                ModuleState::Running
            } else {
                ModuleState::Loaded
            };
        }
        info!(module = %id, name = %image.name, version = image.version, %level, "module loaded");
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Unload
    // ------------------------------------------------------------------

    /// Run the unload pipeline. Refused for `Core` modules and for modules
    /// with live dependents.
    pub fn unload(&mut self, id: ModuleId, now: Tick) -> Result<(), ModuleError> {
        {
            let record = self.slot_ref(id)?;
            if record.flags.contains(ModuleFlags::CORE) {
                return Err(ModuleError::CoreUnload {
                    name: record.name.clone(),
                });
            }
            if !record.dependents.is_empty() {
                return Err(ModuleError::HasDependents {
                    name: record.name.clone(),
                    count: record.dependents.len(),
                });
            }
            if matches!(record.state, ModuleState::Loading | ModuleState::Unloading) {
                return Err(ModuleError::StateInvalid {
                    module: id,
                    state: record.state,
                    op: "unload",
                });
            }
        }

        if let Some(record) = self.slot_mut_opt(id) {
            record.state = ModuleState::Unloading;
        }
        let exit = self.slot_ref(id)?.hooks.exit;
        if let Some(exit) = exit {
            let code = self.run_hook(id, exit, now);
            if code != 0 {
                debug!(module = %id, code, "exit hook reported failure");
            }
        }

        self.unwind_slot(id);
        self.stats.unloads += 1;
        info!(module = %id, "module unloaded");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Hot-swap
    // ------------------------------------------------------------------

    /// Replace a running module's image at a quiescent point.
    ///
    /// Requires the `HotSwap` flag, a `Loaded`/`Running` state, and a zero
    /// entry count (no actor inside the module's code). The new image is
    /// staged fully before the symbol table flips from old to new; a failed
    /// `init` rolls back to the old image and reports the error.
    pub fn swap(
        &mut self,
        id: ModuleId,
        bytes: &[u8],
        hooks: ModuleHooks,
        now: Tick,
    ) -> Result<(), ModuleError> {
        match self.try_swap(id, bytes, hooks, now) {
            Ok(()) => {
                self.stats.swaps += 1;
                Ok(())
            }
            Err(err) => {
                self.stats.failed_swaps += 1;
                Err(err)
            }
        }
    }

    fn try_swap(
        &mut self,
        id: ModuleId,
        bytes: &[u8],
        hooks: ModuleHooks,
        now: Tick,
    ) -> Result<(), ModuleError> {
        {
            let record = self.slot_ref(id)?;
            if !record.flags.contains(ModuleFlags::HOT_SWAP) {
                return Err(ModuleError::SwapNotAllowed {
                    name: record.name.clone(),
                });
            }
            if !record.is_callable() {
                return Err(ModuleError::StateInvalid {
                    module: id,
                    state: record.state,
                    op: "swap",
                });
            }
            if record.entry_count > 0 {
                return Err(ModuleError::HotSwapBusy {
                    name: record.name.clone(),
                    in_flight: record.entry_count,
                });
            }
        }

        // Stage: validate and resolve without touching the live module.
        let image = ModuleImage::parse(bytes, self.config.verify_checksum)?;
        {
            let record = self.slot_ref(id)?;
            if image.name != record.name {
                return Err(ModuleError::NameMismatch {
                    expected: record.name.clone(),
                    found: image.name.clone(),
                });
            }
        }
        let mut staged: Vec<u8> = Vec::with_capacity(image.region_size());
        staged.extend_from_slice(image.code);
        staged.extend_from_slice(image.data);
        staged.resize(image.region_size(), 0);
        let staged = staged.into_boxed_slice();
        let staged_base = staged.as_ptr() as u64;

        let links = self.resolve_dependencies(&image.name, &image.dependencies)?;

        // Absolute addresses inside the staged region.
        let new_exports: Vec<super::record::Export> = image
            .symbols
            .iter()
            .filter(|sym| sym.visibility == crate::image::SymbolVisibility::Global)
            .map(|sym| super::record::Export {
                name: sym.name.clone(),
                address: staged_base + u64::from(sym.address_rel),
                size: sym.size,
            })
            .collect();

        // Atomic table flip: old out, new in; collision restores old.
        let old_exports = self.slot_ref(id)?.exports.clone();
        self.symbols.retract(id);
        if let Err(err) = self.symbols.publish(id, &new_exports) {
            self.republish(id, &old_exports);
            return Err(err);
        }

        // Old exit, then new init; init failure rolls back to the old
        // image, which is still intact.
        let old_exit = self.slot_ref(id)?.hooks.exit;
        if let Some(exit) = old_exit {
            let code = self.run_hook(id, exit, now);
            if code != 0 {
                debug!(module = %id, code, "old image exit hook reported failure");
            }
        }
        if let Some(init) = hooks.init {
            let code = self.run_hook(id, init, now);
            if code != 0 {
                self.symbols.retract(id);
                self.republish(id, &old_exports);
                if let Some(record) = self.slot_mut_opt(id) {
                    record.accounting.error_count += 1;
                }
                let name = image.name.clone();
                return Err(ModuleError::InitFailed { name, code });
            }
        }

        // Commit: the old region is freed when the record drops it here.
        let old_links: Vec<Option<ModuleId>> = self
            .slot_ref(id)?
            .dependencies
            .iter()
            .map(|link| link.module)
            .collect();
        for dep_id in old_links.into_iter().flatten() {
            if let Some(dep) = self.slot_mut_opt(dep_id) {
                dep.dependents.retain(|&d| d != id);
            }
        }
        if let Some(record) = self.slot_mut_opt(id) {
            record.region = staged;
            record.code_len = image.code.len();
            record.data_len = image.data.len();
            record.entry_offset = image.entry_offset;
            record.exit_offset = image.exit_offset;
            record.hooks = hooks;
            record.version = image.version;
            record.exports = new_exports;
            record.accounting.memory_bytes = record.region_len();
            record.set_dependencies(&image.dependencies, &links);
            let (base, len) = (record.base_address(), record.region_len());
            record.sandbox.set_image_region(base, len);
        }
        for dep_id in links.into_iter().flatten() {
            if let Some(dep) = self.slot_mut_opt(dep_id) {
                dep.dependents.push(id);
            }
        }
        info!(module = %id, version = image.version, "module hot-swapped");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Symbols and calls
    // ------------------------------------------------------------------

    /// Resolve a symbol across the flat global set. Counted.
    pub fn resolve(&mut self, name: &str) -> Option<SymbolBinding> {
        self.symbols.resolve(name)
    }

    /// Mark a call into the module in flight; hot-swap waits for zero.
    pub fn enter(&mut self, id: ModuleId) -> Result<(), ModuleError> {
        let record = self.slot_mut(id)?;
        if !record.is_callable() {
            return Err(ModuleError::StateInvalid {
                module: id,
                state: record.state,
                op: "enter",
            });
        }
        record.entry_count += 1;
        Ok(())
    }

    /// Run the module's ioctl hook, if it has one.
    pub(crate) fn run_ioctl(&mut self, id: ModuleId, now: Tick) -> Option<i32> {
        let hook = self.slot_mut_opt(id)?.hooks.ioctl?;
        Some(self.run_hook(id, hook, now))
    }

    /// Mark an in-flight call returned.
    pub fn leave(&mut self, id: ModuleId) {
        if let Some(record) = self.slot_mut_opt(id) {
            record.entry_count = record.entry_count.saturating_sub(1);
        }
    }

    // ------------------------------------------------------------------
    // Health and lifecycle assists
    // ------------------------------------------------------------------

    /// Periodic maintenance: nudge behavior scores back toward healthy and
    /// suspend modules whose error count crossed the threshold.
    pub fn periodic_check(&mut self, _now: Tick) -> RegistryHealth {
        let mut health = RegistryHealth::default();
        for slot in self.slots.iter_mut().flatten() {
            health.checked += 1;
            slot.accounting.behavior_score = slot.accounting.behavior_score.saturating_add(1).min(100);
            if matches!(slot.state, ModuleState::Running | ModuleState::Loaded)
                && slot.accounting.error_count >= self.config.error_suspend_threshold
            {
                slot.state = ModuleState::Suspended;
                warn!(module = %slot.id, errors = slot.accounting.error_count, "module suspended by health check");
                health.suspended.push(slot.id);
            }
        }
        self.stats.health_checks += 1;
        health
    }

    /// Operator suspend.
    pub fn suspend(&mut self, id: ModuleId) -> Result<(), ModuleError> {
        let record = self.slot_mut(id)?;
        if !record.is_callable() {
            return Err(ModuleError::StateInvalid {
                module: id,
                state: record.state,
                op: "suspend",
            });
        }
        record.state = ModuleState::Suspended;
        Ok(())
    }

    /// Operator resume from `Suspended` back to `Running`.
    pub fn resume(&mut self, id: ModuleId) -> Result<(), ModuleError> {
        let record = self.slot_mut(id)?;
        if record.state != ModuleState::Suspended {
            return Err(ModuleError::StateInvalid {
                module: id,
                state: record.state,
                op: "resume",
            });
        }
        record.state = ModuleState::Running;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Borrow a module record.
    pub fn module(&self, id: ModuleId) -> Option<&ModuleRecord> {
        self.slots.get(id.index() as usize).and_then(Option::as_ref)
    }

    /// Mutably borrow a module record (sandbox operations go through
    /// here).
    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut ModuleRecord> {
        self.slots.get_mut(id.index() as usize).and_then(Option::as_mut)
    }

    /// Find a module by its unique name.
    pub fn find(&self, name: &str) -> Option<ModuleId> {
        self.by_name.get(name).copied()
    }

    /// State of a module, if loaded.
    pub fn state_of(&self, id: ModuleId) -> Option<ModuleState> {
        self.module(id).map(|record| record.state)
    }

    /// Iterate loaded modules.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.slots.iter().flatten()
    }

    /// Currently loaded module count.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether no module is loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registry counters.
    pub fn stats(&self) -> RegistryStats {
        self.stats
    }

    /// Symbol table counters.
    pub fn symbol_stats(&self) -> SymbolStats {
        self.symbols.stats()
    }

    /// Registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn slot_ref(&self, id: ModuleId) -> Result<&ModuleRecord, ModuleError> {
        self.module(id).ok_or(ModuleError::NoSuchId(id))
    }

    fn slot_mut(&mut self, id: ModuleId) -> Result<&mut ModuleRecord, ModuleError> {
        self.slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
            .ok_or(ModuleError::NoSuchId(id))
    }

    fn slot_mut_opt(&mut self, id: ModuleId) -> Option<&mut ModuleRecord> {
        self.slots.get_mut(id.index() as usize).and_then(Option::as_mut)
    }

    fn resolve_dependencies(
        &self,
        module_name: &str,
        deps: &[ParsedDependency],
    ) -> Result<Vec<Option<ModuleId>>, ModuleError> {
        let mut links = Vec::with_capacity(deps.len());
        for dep in deps {
            let found = self.by_name.get(&dep.name).and_then(|&dep_id| {
                let record = self.module(dep_id)?;
                if !matches!(record.state, ModuleState::Loaded | ModuleState::Running) {
                    return None;
                }
                dep.accepts(record.version).then_some((dep_id, record.version))
            });
            match found {
                Some((dep_id, _)) => links.push(Some(dep_id)),
                None if dep.optional => {
                    debug!(module = module_name, dependency = %dep.name, "optional dependency missing");
                    links.push(None);
                }
                None => {
                    let reason = match self.by_name.get(&dep.name) {
                        Some(&dep_id) => match self.module(dep_id) {
                            Some(record) => format!(
                                "version {} outside [{}, {}]",
                                record.version, dep.min_version, dep.max_version
                            ),
                            None => "not loaded".to_string(),
                        },
                        None => "not loaded".to_string(),
                    };
                    return Err(ModuleError::DependencyUnsatisfied {
                        module: module_name.to_owned(),
                        dependency: dep.name.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(links)
    }

    fn run_hook(&mut self, id: ModuleId, hook: super::record::ModuleHook, now: Tick) -> i32 {
        match self.slot_mut_opt(id) {
            Some(record) => {
                let mut cx = HookContext {
                    module: id,
                    sandbox: &mut record.sandbox,
                    now,
                };
                hook(&mut cx)
            }
            None => 0,
        }
    }

    fn republish(&mut self, id: ModuleId, exports: &[super::record::Export]) {
        // Restoring bindings that were just retracted cannot collide.
        if self.symbols.publish(id, exports).is_err() {
            warn!(module = %id, "failed to restore exports during rollback");
        }
    }

    /// Reversed load path: retract exports, drop back-edges, free the
    /// region, mark the slot free.
    fn unwind_slot(&mut self, id: ModuleId) {
        self.symbols.retract(id);
        let record = self
            .slots
            .get_mut(id.index() as usize)
            .and_then(Option::take);
        if let Some(record) = record {
            for link in &record.dependencies {
                if let Some(dep_id) = link.module {
                    if let Some(dep) = self.slot_mut_opt(dep_id) {
                        dep.dependents.retain(|&d| d != id);
                    }
                }
            }
            self.by_name.remove(&record.name);
            // The image region and sandbox drop here.
        }
    }
}

/// Default security level derived from type and flags.
fn default_level(module_type: ModuleType, flags: ModuleFlags) -> SecurityLevel {
    if flags.contains(ModuleFlags::PRIVILEGED) {
        return SecurityLevel::Trusted;
    }
    match module_type {
        ModuleType::Core | ModuleType::Driver | ModuleType::Security => SecurityLevel::Trusted,
        ModuleType::Filesystem
        | ModuleType::Network
        | ModuleType::Shell
        | ModuleType::Diagnostic
        | ModuleType::Supervisor => SecurityLevel::User,
        ModuleType::Custom => SecurityLevel::Untrusted,
    }
}
