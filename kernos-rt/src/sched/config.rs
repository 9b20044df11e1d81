//! Scheduler configuration with sensible defaults.

// Layer 1: Standard library
// (none)

// Layer 2: Third-party
use serde::{Deserialize, Serialize};

// Layer 3: Internal
// (none)

/// Default actor table size.
pub const DEFAULT_MAX_ACTORS: usize = 256;

/// Default per-actor mailbox capacity.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Kernel actor mailbox capacity.
pub const KERNEL_MAILBOX_CAPACITY: usize = 256;

/// Ticks an actor may keep the CPU before a forced yield.
pub const DEFAULT_TIMESLICE_TICKS: u32 = 10;

/// Ticks between supervision sweeps.
pub const DEFAULT_SWEEP_INTERVAL_TICKS: u64 = 100;

/// Default global byte budget (0 = unlimited).
pub const DEFAULT_MEMORY_BUDGET: usize = 0;

/// Scheduler-wide configuration.
///
/// # Examples
///
/// ```rust
/// use kernos_rt::sched::SchedulerConfig;
///
/// let config = SchedulerConfig::default();
/// assert_eq!(config.max_actors, 256);
///
/// let config = SchedulerConfig::builder()
///     .with_max_actors(32)
///     .with_timeslice_ticks(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.timeslice_ticks, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Fixed actor table size (slot 0 is the kernel actor).
    pub max_actors: usize,

    /// Default capacity for spawned actors' mailboxes.
    pub default_mailbox_capacity: usize,

    /// Capacity of the kernel actor's mailbox.
    pub kernel_mailbox_capacity: usize,

    /// Consecutive steps before a running actor is forced to yield.
    pub timeslice_ticks: u32,

    /// Supervision sweep cadence in ticks (0 disables the sweep).
    pub sweep_interval_ticks: u64,

    /// Global byte budget backing stacks, payloads and mailboxes
    /// (0 = unlimited).
    pub memory_budget: usize,

    /// Record a bounded trace of dispatches (used by scenario tests and
    /// starvation diagnostics).
    pub trace_dispatch: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_actors: DEFAULT_MAX_ACTORS,
            default_mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            kernel_mailbox_capacity: KERNEL_MAILBOX_CAPACITY,
            timeslice_ticks: DEFAULT_TIMESLICE_TICKS,
            sweep_interval_ticks: DEFAULT_SWEEP_INTERVAL_TICKS,
            memory_budget: DEFAULT_MEMORY_BUDGET,
            trace_dispatch: false,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration builder.
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_actors < 2 {
            return Err("max_actors must be >= 2 (kernel actor plus one)".to_string());
        }
        if self.default_mailbox_capacity == 0 {
            return Err("default_mailbox_capacity must be > 0".to_string());
        }
        if self.kernel_mailbox_capacity < self.default_mailbox_capacity {
            return Err("kernel_mailbox_capacity must be >= default_mailbox_capacity".to_string());
        }
        if self.timeslice_ticks == 0 {
            return Err("timeslice_ticks must be > 0".to_string());
        }
        Ok(())
    }
}

/// Builder for [`SchedulerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Set the actor table size.
    pub fn with_max_actors(mut self, max_actors: usize) -> Self {
        self.config.max_actors = max_actors;
        self
    }

    /// Set the default mailbox capacity.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.config.default_mailbox_capacity = capacity;
        self
    }

    /// Set the timeslice in ticks.
    pub fn with_timeslice_ticks(mut self, ticks: u32) -> Self {
        self.config.timeslice_ticks = ticks;
        self
    }

    /// Set the supervision sweep cadence (0 disables).
    pub fn with_sweep_interval(mut self, ticks: u64) -> Self {
        self.config.sweep_interval_ticks = ticks;
        self
    }

    /// Set the global byte budget (0 = unlimited).
    pub fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.config.memory_budget = bytes;
        self
    }

    /// Enable the dispatch trace.
    pub fn with_dispatch_trace(mut self) -> Self {
        self.config.trace_dispatch = true;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<SchedulerConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_zero_timeslice() {
        let result = SchedulerConfig::builder().with_timeslice_ticks(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_tiny_table() {
        let result = SchedulerConfig::builder().with_max_actors(1).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = SchedulerConfig::builder()
            .with_max_actors(16)
            .with_mailbox_capacity(8)
            .with_memory_budget(1 << 20)
            .with_dispatch_trace()
            .build()
            .unwrap();
        assert_eq!(config.max_actors, 16);
        assert_eq!(config.default_mailbox_capacity, 8);
        assert_eq!(config.memory_budget, 1 << 20);
        assert!(config.trace_dispatch);
    }
}
