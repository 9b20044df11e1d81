//! The kernel context: single owner of scheduler, registry, and policy.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tracing::{error, info, warn};

// Layer 3: Internal module imports
use super::config::KernelConfig;
use super::report::{KernelReport, KernelStatus, ModuleSummary};
use crate::error::{KernelError, ModuleError};
use crate::ids::ModuleId;
use crate::registry::{LoadOptions, ModuleHooks, ModuleRegistry};
use crate::sandbox::{Capability, ResourceType, SecurityLevel};
use kernos_rt::{ActorId, Behavior, Dispatch, Scheduler, Tick};

/// The kernel context record.
///
/// Owns the scheduler and the module registry and is the only place the two
/// couple: module loads may spawn actors, actor-facing interventions reach
/// the sandbox, and gated calls thread through both. All global mutable
/// state lives here and is passed explicitly through call chains; there are
/// no ambient globals.
///
/// # Example
/// ```rust
/// use kernos_mods::kernel::{Kernel, KernelConfig, KernelStatus};
///
/// let kernel = Kernel::boot(KernelConfig::default()).unwrap();
/// assert_eq!(kernel.status(), KernelStatus::Ready);
/// ```
pub struct Kernel {
    config: KernelConfig,
    status: KernelStatus,
    sched: Scheduler,
    registry: ModuleRegistry,
}

impl Kernel {
    /// Validate the configuration and bring the core up. The kernel is
    /// `Booting` until both halves are constructed, then `Ready`.
    pub fn boot(config: KernelConfig) -> Result<Self, KernelError> {
        config
            .validate()
            .map_err(|reason| KernelError::Config { reason })?;
        let mut kernel = Self {
            sched: Scheduler::new(config.scheduler.clone()),
            registry: ModuleRegistry::new(config.registry.clone()),
            status: KernelStatus::Booting,
            config,
        };
        info!(
            max_actors = kernel.config.scheduler.max_actors,
            max_modules = kernel.config.registry.max_modules,
            status = %kernel.status,
            "kernel core up"
        );
        kernel.status = KernelStatus::Ready;
        Ok(kernel)
    }

    /// Boot from TOML configuration text.
    pub fn from_toml(text: &str) -> Result<Self, KernelError> {
        let config = KernelConfig::from_toml(text).map_err(|reason| KernelError::Config { reason })?;
        Self::boot(config)
    }

    // ------------------------------------------------------------------
    // Time and dispatch
    // ------------------------------------------------------------------

    /// External timer entry point: advances the scheduler tick and runs the
    /// registry health pass on its cadence.
    pub fn timer_tick(&mut self) {
        self.sched.timer_tick();
        let interval = self.config.module_check_interval_ticks;
        if interval != 0 && self.sched.now() % interval == 0 {
            let health = self.registry.periodic_check(self.sched.now());
            if !health.suspended.is_empty() {
                self.status = KernelStatus::Degraded;
            }
        }
    }

    /// Dispatch one actor. Corruption moves the kernel to `Panic`; it is
    /// surfaced, never swallowed.
    pub fn dispatch(&mut self) -> Result<Dispatch, KernelError> {
        match self.sched.dispatch_one() {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if err.is_fatal() {
                    error!(%err, "kernel panic");
                    self.status = KernelStatus::Panic;
                }
                Err(err.into())
            }
        }
    }

    /// Dispatch until idle, bounded by `max_dispatches`.
    pub fn run_until_idle(&mut self, max_dispatches: u64) -> Result<u64, KernelError> {
        let mut ran = 0;
        while ran < max_dispatches {
            match self.dispatch()? {
                Dispatch::Ran(_) => ran += 1,
                Dispatch::Idle => break,
            }
        }
        Ok(ran)
    }

    // ------------------------------------------------------------------
    // Module operations
    // ------------------------------------------------------------------

    /// Load a module image.
    pub fn load_module(
        &mut self,
        bytes: &[u8],
        options: LoadOptions,
    ) -> Result<ModuleId, KernelError> {
        let now = self.sched.now();
        Ok(self.registry.load(bytes, options, now)?)
    }

    /// Unload a module.
    pub fn unload_module(&mut self, id: ModuleId) -> Result<(), KernelError> {
        let now = self.sched.now();
        Ok(self.registry.unload(id, now)?)
    }

    /// Hot-swap a module's image.
    pub fn swap_module(
        &mut self,
        id: ModuleId,
        bytes: &[u8],
        hooks: ModuleHooks,
    ) -> Result<(), KernelError> {
        let now = self.sched.now();
        Ok(self.registry.swap(id, bytes, hooks, now)?)
    }

    /// Gated call into a module export.
    ///
    /// Resolves the symbol, marks the call in flight, routes the name
    /// through the owning module's sandbox (deny-list, capability map,
    /// `ModuleCalls` charge), runs the ioctl hook when present, and returns
    /// the resolved address. A sandbox denial fails the call and logs a
    /// violation; the module's state is untouched.
    pub fn call_module(&mut self, function: &str) -> Result<u64, KernelError> {
        let binding =
            self.registry
                .resolve(function)
                .ok_or_else(|| ModuleError::SymbolNotFound {
                    symbol: function.to_owned(),
                })?;
        let id = binding.module;
        let now = self.sched.now();
        self.registry.enter(id)?;

        let checked = match self.registry.module_mut(id) {
            Some(record) => record.sandbox.check_function_call(function, now),
            None => {
                self.registry.leave(id);
                return Err(ModuleError::NoSuchId(id).into());
            }
        };
        if let Err(err) = checked {
            self.registry.leave(id);
            return Err(err.into());
        }

        if let Some(code) = self.registry.run_ioctl(id, now) {
            if code != 0 {
                warn!(module = %id, function, code, "ioctl hook reported failure");
                if let Some(record) = self.registry.module_mut(id) {
                    record.accounting.error_count += 1;
                }
            }
        }
        if let Some(record) = self.registry.module_mut(id) {
            record.accounting.function_calls += 1;
            record.accounting.cpu_ticks += 1;
        }
        self.registry.leave(id);
        Ok(binding.address)
    }

    /// Spawn an actor on a module's behalf, charged against the module's
    /// `ChildActors` limit and gated on `ActorCreate`.
    pub fn spawn_module_actor(
        &mut self,
        module: ModuleId,
        behavior: Box<dyn Behavior>,
        stack_size: usize,
    ) -> Result<ActorId, KernelError> {
        let now = self.sched.now();
        let priority = match self.registry.module_mut(module) {
            Some(record) => {
                record.sandbox.require_cap(Capability::ActorCreate, now)?;
                record.sandbox.charge(ResourceType::ChildActors, 1, now)?;
                record.priority
            }
            None => return Err(ModuleError::NoSuchId(module).into()),
        };

        match self
            .sched
            .spawn(behavior, u64::from(module.index()), priority, stack_size)
        {
            Ok(actor) => Ok(actor),
            Err(err) => {
                if let Some(record) = self.registry.module_mut(module) {
                    record.sandbox.release(ResourceType::ChildActors, 1);
                }
                Err(err.into())
            }
        }
    }

    // ------------------------------------------------------------------
    // Supervisor interventions
    // ------------------------------------------------------------------

    /// Suspend an actor (supervisor intervention).
    pub fn suspend_entity(&mut self, actor: ActorId) -> Result<(), KernelError> {
        Ok(self.sched.suspend(actor)?)
    }

    /// Resume a suspended actor.
    pub fn resume_entity(&mut self, actor: ActorId) -> Result<(), KernelError> {
        Ok(self.sched.resume(actor)?)
    }

    /// Throttle an actor's timeslice (supervisor intervention).
    pub fn throttle_entity(&mut self, actor: ActorId, pct: u8) -> Result<(), KernelError> {
        Ok(self.sched.throttle(actor, pct)?)
    }

    /// Quarantine a module's sandbox (supervisor intervention).
    pub fn quarantine_module(&mut self, id: ModuleId) -> Result<(), KernelError> {
        let now = self.sched.now();
        match self.registry.module_mut(id) {
            Some(record) => {
                record.sandbox.quarantine(now);
                self.status = KernelStatus::Degraded;
                Ok(())
            }
            None => Err(ModuleError::NoSuchId(id).into()),
        }
    }

    /// Privileged restore out of quarantine. The caller module (when one is
    /// named) must hold `SecurityOverride`; a host operator passes `None`.
    pub fn lift_quarantine(
        &mut self,
        id: ModuleId,
        restore_to: SecurityLevel,
        caller: Option<ModuleId>,
    ) -> Result<(), KernelError> {
        let now = self.sched.now();
        if let Some(caller) = caller {
            match self.registry.module_mut(caller) {
                Some(record) => record
                    .sandbox
                    .require_cap(Capability::SecurityOverride, now)?,
                None => return Err(ModuleError::NoSuchId(caller).into()),
            }
        }
        match self.registry.module_mut(id) {
            Some(record) => {
                record.sandbox.lift_quarantine(restore_to);
                info!(module = %id, level = %restore_to, "quarantine lifted");
                Ok(())
            }
            None => Err(ModuleError::NoSuchId(id).into()),
        }
    }

    // ------------------------------------------------------------------
    // Accessors and reporting
    // ------------------------------------------------------------------

    /// Kernel status.
    pub fn status(&self) -> KernelStatus {
        self.status
    }

    /// Ticks since boot.
    pub fn uptime_ticks(&self) -> Tick {
        self.sched.now()
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    /// The scheduler, mutably (kernel-actor sends, spawns, vectors).
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.sched
    }

    /// The module registry.
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// The registry, mutably (operator lifecycle assists, tests).
    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    /// Aggregate diagnostics snapshot.
    pub fn report(&self) -> KernelReport {
        let modules: Vec<ModuleSummary> = self
            .registry
            .modules()
            .map(|record| ModuleSummary {
                id: record.id,
                name: record.name.clone(),
                version: record.version,
                state: record.state,
                level: record.sandbox.level(),
                violations: record.sandbox.violation_count(),
                quarantined: record.sandbox.is_quarantined(),
            })
            .collect();
        let quarantined_modules = modules.iter().filter(|m| m.quarantined).count();
        KernelReport {
            status: self.status,
            uptime_ticks: self.sched.now(),
            scheduler: self.sched.stats(),
            registry: self.registry.stats(),
            symbols: self.registry.symbol_stats(),
            modules,
            quarantined_modules,
        }
    }

    /// The diagnostics snapshot as JSON.
    pub fn report_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.report())
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("status", &self.status)
            .field("uptime_ticks", &self.sched.now())
            .field("modules", &self.registry.len())
            .finish_non_exhaustive()
    }
}
