//! Global byte budget standing in for the external byte allocator.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::Serialize;

// Layer 3: Internal module imports
use crate::error::SchedulerError;

/// Tracks the bytes the kernel is allowed to hand out for stacks, message
/// payloads, and mailbox slabs.
///
/// This is the accounting half of the `alloc/free` collaborator contract:
/// the host allocator does the real allocation, the budget decides whether
/// the kernel may ask for it. A budget of 0 is unlimited.
///
/// # Example
/// ```rust
/// use kernos_rt::sched::MemoryBudget;
///
/// let mut budget = MemoryBudget::new(1024);
/// budget.charge(1000).unwrap();
/// assert!(budget.charge(100).is_err());
/// budget.credit(500);
/// assert!(budget.charge(100).is_ok());
/// ```
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MemoryBudget {
    total: usize,
    used: usize,
    peak: usize,
}

impl MemoryBudget {
    /// Create a budget of `total` bytes; 0 means unlimited.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            used: 0,
            peak: 0,
        }
    }

    /// Charge `bytes` against the budget.
    pub fn charge(&mut self, bytes: usize) -> Result<(), SchedulerError> {
        if self.total != 0 && self.used.saturating_add(bytes) > self.total {
            return Err(SchedulerError::OutOfMemory {
                requested: bytes,
                available: self.total - self.used,
            });
        }
        self.used += bytes;
        if self.used > self.peak {
            self.peak = self.used;
        }
        Ok(())
    }

    /// Return `bytes` to the budget.
    pub fn credit(&mut self, bytes: usize) {
        self.used = self.used.saturating_sub(bytes);
    }

    /// Bytes currently charged.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Highest charge observed.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Configured total (0 = unlimited).
    pub fn total(&self) -> usize {
        self.total
    }
}
