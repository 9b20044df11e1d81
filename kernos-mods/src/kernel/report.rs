//! Kernel status and the aggregated diagnostics report.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::Serialize;

// Layer 3: Internal module imports
use crate::ids::ModuleId;
use crate::registry::{ModuleState, RegistryStats, SymbolStats};
use crate::sandbox::SecurityLevel;
use kernos_rt::{SchedulerStats, Tick};

/// Overall kernel status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KernelStatus {
    /// Boot in progress.
    Booting,
    /// Normal operation.
    Ready,
    /// Running with suspended or quarantined modules.
    Degraded,
    /// Invariant corruption; halted in a fault-safe loop.
    Panic,
}

impl fmt::Display for KernelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelStatus::Booting => "booting",
            KernelStatus::Ready => "ready",
            KernelStatus::Degraded => "degraded",
            KernelStatus::Panic => "panic",
        };
        f.write_str(name)
    }
}

/// One module's line in the report.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
    /// Module id.
    pub id: ModuleId,
    /// Module name.
    pub name: String,
    /// Module version.
    pub version: u32,
    /// Lifecycle state.
    pub state: ModuleState,
    /// Sandbox security level.
    pub level: SecurityLevel,
    /// Lifetime violation count.
    pub violations: u64,
    /// Whether the sandbox is quarantined.
    pub quarantined: bool,
}

/// Aggregated, serializable kernel diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct KernelReport {
    /// Kernel status at capture time.
    pub status: KernelStatus,
    /// Ticks since boot.
    pub uptime_ticks: Tick,
    /// Scheduler counters.
    pub scheduler: SchedulerStats,
    /// Registry counters.
    pub registry: RegistryStats,
    /// Symbol table counters.
    pub symbols: SymbolStats,
    /// Per-module lines.
    pub modules: Vec<ModuleSummary>,
    /// Count of quarantined modules.
    pub quarantined_modules: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_to_json() {
        let report = KernelReport {
            status: KernelStatus::Ready,
            uptime_ticks: 42,
            scheduler: SchedulerStats::default(),
            registry: RegistryStats::default(),
            symbols: SymbolStats::default(),
            modules: Vec::new(),
            quarantined_modules: 0,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"Ready\""));
        assert!(json.contains("\"uptime_ticks\":42"));
    }
}
