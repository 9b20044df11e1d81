//! Per-module resource limits and accounting.

// Layer 1: Standard library imports
use std::collections::BTreeMap;
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Consumable quantities a sandbox may cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    /// Bytes of memory attributed to the module.
    Memory,
    /// Cpu ticks consumed by module code.
    CpuTime,
    /// Open file handles.
    FileHandles,
    /// Open network connections.
    NetworkConnections,
    /// Actors spawned on the module's behalf.
    ChildActors,
    /// Heap allocations performed.
    HeapAllocs,
    /// Calls into the module's exports.
    ModuleCalls,
    /// Queries against the AI supervisor.
    AiQueries,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One limit record: ceiling, current use, peak, and whether the ceiling is
/// enforced (an advisory record still accounts but never denies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimit {
    /// The ceiling.
    pub limit: u64,
    /// Committed use.
    pub used: u64,
    /// High-water mark.
    pub peak: u64,
    /// Whether `check` may deny.
    pub enforce: bool,
}

impl ResourceLimit {
    /// An enforced limit with zero use.
    pub fn enforced(limit: u64) -> Self {
        Self {
            limit,
            used: 0,
            peak: 0,
            enforce: true,
        }
    }

    /// An advisory limit: accounted, never denied.
    pub fn advisory(limit: u64) -> Self {
        Self {
            limit,
            used: 0,
            peak: 0,
            enforce: false,
        }
    }
}

/// The per-sandbox limit table. Resources without a record are unlimited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitTable {
    limits: BTreeMap<ResourceType, ResourceLimit>,
}

impl LimitTable {
    /// Empty table: everything unlimited.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace a limit record, preserving existing accounting
    /// for the resource.
    pub fn set(&mut self, resource: ResourceType, limit: u64, enforce: bool) {
        let entry = self
            .limits
            .entry(resource)
            .or_insert_with(|| ResourceLimit::enforced(0));
        entry.limit = limit;
        entry.enforce = enforce;
    }

    /// Whether `used + delta` stays within the limit. Resources without a
    /// record, and advisory records, always pass.
    pub fn check(&self, resource: ResourceType, delta: u64) -> Result<(), (u64, u64)> {
        match self.limits.get(&resource) {
            Some(rec) if rec.enforce => {
                let attempted = rec.used.saturating_add(delta);
                if attempted > rec.limit {
                    Err((rec.limit, attempted))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Commit a charge, updating the peak. Creates an accounting-only
    /// record for unlimited resources so their use is still visible.
    pub fn account(&mut self, resource: ResourceType, delta: u64) {
        let rec = self
            .limits
            .entry(resource)
            .or_insert_with(|| ResourceLimit::advisory(u64::MAX));
        rec.used = rec.used.saturating_add(delta);
        if rec.used > rec.peak {
            rec.peak = rec.used;
        }
    }

    /// Return part of a charge.
    pub fn release(&mut self, resource: ResourceType, delta: u64) {
        if let Some(rec) = self.limits.get_mut(&resource) {
            rec.used = rec.used.saturating_sub(delta);
        }
    }

    /// The record for a resource, if one exists.
    pub fn get(&self, resource: ResourceType) -> Option<ResourceLimit> {
        self.limits.get(&resource).copied()
    }

    /// Iterate all records.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, ResourceLimit)> + '_ {
        self.limits.iter().map(|(&r, &l)| (r, l))
    }

    /// Replace the ceilings with `defaults`, keeping accumulated use and
    /// peaks. Records not named in `defaults` are left untouched.
    pub fn reapply(&mut self, defaults: &[(ResourceType, u64)]) {
        for &(resource, limit) in defaults {
            self.set(resource, limit, true);
        }
    }
}
