//! Violation records and the bounded violation ring.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::fmt;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::Serialize;

// Layer 3: Internal module imports
use super::capability::Capability;
use super::limits::ResourceType;
use crate::ids::ModuleId;
use kernos_rt::Tick;

/// Default capacity of the violation ring.
pub const VIOLATION_RING_CAPACITY: usize = 64;

/// Classification of a sandbox violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    /// Missing capability bit.
    Capability,
    /// Resource limit exceeded.
    Resource,
    /// Memory access outside owned ranges.
    Memory,
    /// Denied function call.
    Execution,
    /// Any other policy breach.
    Policy,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One entry in the violation log.
#[derive(Debug, Clone, Serialize)]
pub struct ViolationRecord {
    /// Monotonic id within the sandbox.
    pub id: u64,
    /// Kernel tick of the violation.
    pub tick: Tick,
    /// Wall-clock stamp for external audit readers.
    pub recorded_at: DateTime<Utc>,
    /// The offending module.
    pub module: ModuleId,
    /// Violation class.
    pub kind: ViolationKind,
    /// The capability that failed the check, when the class is Capability.
    pub capability: Option<Capability>,
    /// The resource that was exceeded, when the class is Resource.
    pub resource: Option<ResourceType>,
    /// Human-readable detail.
    pub description: String,
}

/// Bounded ring of violation records; the oldest entry is overwritten when
/// the ring is full.
#[derive(Debug, Clone)]
pub struct ViolationLog {
    ring: VecDeque<ViolationRecord>,
    capacity: usize,
    next_id: u64,
    total: u64,
}

impl Default for ViolationLog {
    fn default() -> Self {
        Self::new(VIOLATION_RING_CAPACITY)
    }
}

impl ViolationLog {
    /// Create a ring with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
            total: 0,
        }
    }

    /// Append a record, evicting the oldest when full. Returns the
    /// record's id.
    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &mut self,
        tick: Tick,
        module: ModuleId,
        kind: ViolationKind,
        capability: Option<Capability>,
        resource: Option<ResourceType>,
        description: String,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.total += 1;
        if self.ring.len() == self.capacity {
            self.ring.pop_front();
        }
        self.ring.push_back(ViolationRecord {
            id,
            tick,
            recorded_at: Utc::now(),
            module,
            kind,
            capability,
            resource,
            description,
        });
        id
    }

    /// Records currently retained, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &ViolationRecord> {
        self.ring.iter()
    }

    /// Retained record count.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Violations recorded over the sandbox lifetime, including evicted
    /// ones.
    pub fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_n(log: &mut ViolationLog, n: usize) {
        for i in 0..n {
            log.push(
                i as u64,
                ModuleId::from_index(1),
                ViolationKind::Capability,
                Some(Capability::FsWrite),
                None,
                format!("violation {i}"),
            );
        }
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut log = ViolationLog::new(8);
        push_n(&mut log, 3);
        let ids: Vec<u64> = log.records().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let mut log = ViolationLog::new(4);
        push_n(&mut log, 6);
        assert_eq!(log.len(), 4);
        assert_eq!(log.total(), 6);
        let ids: Vec<u64> = log.records().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4, 5, 6]);
    }
}
