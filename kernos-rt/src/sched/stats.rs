//! Scheduler-wide statistics and the dispatch trace.

// Layer 1: Standard library imports
use std::collections::VecDeque;

// Layer 2: Third-party crate imports
use serde::Serialize;

// Layer 3: Internal module imports
use crate::util::{ActorId, Tick};

/// Bound on retained dispatch-trace entries.
const TRACE_DEPTH: usize = 1024;

/// Aggregate scheduler counters.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct SchedulerStats {
    /// Completed context switches (one per dispatched step run).
    pub context_switches: u64,
    /// Successful sends (enqueues).
    pub messages_sent: u64,
    /// Messages dequeued by their owners.
    pub messages_delivered: u64,
    /// Sends rejected (mailbox full, no recipient, out of memory).
    pub sends_failed: u64,
    /// Global ticks observed.
    pub ticks: Tick,
    /// Actors spawned over the lifetime.
    pub spawns: u64,
    /// Actor slots reclaimed.
    pub terminations: u64,
    /// Timeslice expiries that forced a yield.
    pub preemptions: u64,
    /// Interrupt messages routed to actors.
    pub interrupts_routed: u64,
    /// Interrupts dropped for lack of a registered vector.
    pub interrupts_spurious: u64,
    /// Supervision sweeps run.
    pub sweeps_run: u64,
}

/// Bounded record of which actor ran when.
///
/// Enabled by `SchedulerConfig::trace_dispatch`; scenario tests use it to
/// assert "no other actor ran between" properties.
#[derive(Debug, Default)]
pub struct DispatchTrace {
    entries: VecDeque<(Tick, ActorId)>,
    enabled: bool,
}

impl DispatchTrace {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            entries: VecDeque::new(),
            enabled,
        }
    }

    pub(crate) fn record(&mut self, tick: Tick, id: ActorId) {
        if !self.enabled {
            return;
        }
        if self.entries.len() == TRACE_DEPTH {
            self.entries.pop_front();
        }
        self.entries.push_back((tick, id));
    }

    /// Dispatched actor ids, oldest first.
    pub fn actors(&self) -> Vec<ActorId> {
        self.entries.iter().map(|&(_, id)| id).collect()
    }

    /// Full entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = (Tick, ActorId)> + '_ {
        self.entries.iter().copied()
    }

    /// Drop all recorded entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_trace_records_nothing() {
        let mut trace = DispatchTrace::new(false);
        trace.record(1, ActorId::from_index(1));
        assert!(trace.actors().is_empty());
    }

    #[test]
    fn test_trace_is_bounded() {
        let mut trace = DispatchTrace::new(true);
        for i in 0..(TRACE_DEPTH as u32 + 10) {
            trace.record(u64::from(i), ActorId::from_index(i));
        }
        assert_eq!(trace.actors().len(), TRACE_DEPTH);
        // Oldest entries were evicted.
        assert_eq!(trace.actors()[0], ActorId::from_index(10));
    }
}
