//! Behavior reports and anomaly classification.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::util::{ActorId, Tick};

/// Anomaly classes reported by the external supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// Memory use grows without matching frees.
    MemoryLeak,
    /// Sudden spike in cpu consumption.
    CpuSpike,
    /// Actor keeps the CPU across consecutive full timeslices.
    InfiniteLoop,
    /// Capability violations clustered in time.
    SecurityBreach,
    /// Resource limits approached repeatedly.
    ResourceAbuse,
    /// Mutual blocking pattern across actors.
    Deadlock,
    /// Invariant check failed on owned state.
    Corruption,
    /// Message flood toward one or many mailboxes.
    NetworkFlood,
}

/// Per-actor snapshot handed to the supervisor at each sweep.
#[derive(Debug, Clone, Serialize)]
pub struct BehaviorReport {
    /// Subject actor.
    pub actor: ActorId,
    /// Behavior score 0..=100 at snapshot time.
    pub behavior_score: u8,
    /// Cpu ticks consumed since spawn.
    pub cpu_ticks: u64,
    /// Messages sent since spawn.
    pub messages_sent: u64,
    /// Current mailbox depth.
    pub mailbox_depth: usize,
    /// Mailbox capacity.
    pub mailbox_capacity: usize,
    /// Bytes charged to the actor.
    pub memory_used: usize,
    /// Anomalies recorded so far.
    pub anomalies: u32,
    /// Tick of the snapshot.
    pub tick: Tick,
    /// Wall-clock anchor for external audit readers.
    pub captured_at: DateTime<Utc>,
}

/// What the supervisor wants done after a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intervention {
    /// Suspend the actor until an external resume.
    Suspend(ActorId),
    /// Withhold a percentage of the actor's timeslice.
    Throttle(ActorId, u8),
    /// Record an anomaly against the actor without acting.
    Flag(ActorId, AnomalyKind),
}
