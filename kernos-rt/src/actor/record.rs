//! Actor slot records and per-actor accounting.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::Serialize;

// Layer 3: Internal module imports
use super::behavior::Behavior;
use super::state::{ActorState, WakeReason};
use crate::mailbox::Mailbox;
use crate::message::{Envelope, Priority};
use crate::util::{ActorId, MessageId, Tick};

/// Per-actor resource and behavior accounting.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ActorAccounting {
    /// Scheduler steps charged to this actor.
    pub cpu_ticks: u64,
    /// Messages this actor successfully sent.
    pub messages_sent: u64,
    /// Messages this actor dequeued.
    pub messages_received: u64,
    /// Tick at spawn.
    pub created_tick: Tick,
    /// Tick of the most recent dispatch.
    pub last_scheduled_tick: Tick,
    /// Bytes currently charged to this actor (stack + in-flight payloads).
    pub memory_used: usize,
    /// Byte ceiling; 0 means unlimited (kernel actor only).
    pub memory_limit: usize,
    /// Behavior score, 0..=100; decayed by the supervision sweep.
    pub behavior_score: u8,
    /// Anomalies attributed by the supervisor.
    pub anomalies: u32,
}

impl ActorAccounting {
    pub(crate) fn new(created_tick: Tick, memory_limit: usize) -> Self {
        Self {
            cpu_ticks: 0,
            messages_sent: 0,
            messages_received: 0,
            created_tick,
            last_scheduled_tick: created_tick,
            memory_used: 0,
            memory_limit,
            behavior_score: 100,
            anomalies: 0,
        }
    }

    /// Whether charging `delta` more bytes would break the actor's limit.
    pub fn would_exceed(&self, delta: usize) -> bool {
        self.memory_limit != 0 && self.memory_used + delta > self.memory_limit
    }

    /// Bytes still chargeable before the limit (`usize::MAX` when
    /// unlimited).
    pub fn memory_available(&self) -> usize {
        if self.memory_limit == 0 {
            usize::MAX
        } else {
            self.memory_limit.saturating_sub(self.memory_used)
        }
    }

    /// Charge bytes against the actor (callers check `would_exceed` first).
    pub(crate) fn charge_memory(&mut self, bytes: usize) {
        self.memory_used += bytes;
    }

    /// Return bytes to the actor.
    pub(crate) fn credit_memory(&mut self, bytes: usize) {
        self.memory_used = self.memory_used.saturating_sub(bytes);
    }
}

/// One slot in the scheduler's fixed-size actor table.
///
/// Owns everything the actor owns: stack buffer, entry behavior, user-data
/// word, mailbox, and the bookkeeping that backs blocking, sync replies,
/// suspension, and lazy termination. Cross-entity references are ids, never
/// pointers; the slot table owns all lifetime.
pub struct ActorRecord {
    /// Dense id, equal to the slot index.
    pub id: ActorId,
    /// Lifecycle state.
    pub state: ActorState,
    /// Scheduling class.
    pub priority: Priority,
    /// Entry behavior; `None` only for the kernel actor and transiently
    /// while a step executes.
    pub(crate) behavior: Option<Box<dyn Behavior>>,
    /// Opaque word handed to the entry.
    pub user_data: u64,
    /// Stack buffer, zero-filled at spawn, freed at termination.
    pub(crate) stack: Vec<u8>,
    /// The actor's bounded mailbox.
    pub(crate) mailbox: Mailbox,
    /// Out-of-band landing slot for a sync reply.
    pub(crate) pending_reply: Option<Envelope>,
    /// Message id of the outstanding sync request, if blocked on one.
    pub(crate) awaiting_reply: Option<MessageId>,
    /// Absolute tick at which a timed wait expires.
    pub(crate) wake_at: Option<Tick>,
    /// Why the last block ended; readable by the actor on resume.
    pub(crate) wake_reason: Option<WakeReason>,
    /// State to restore when a suspension is resumed.
    pub(crate) resume_to: Option<ActorState>,
    /// Termination requested while the actor was running; honored at the
    /// next scheduler entry.
    pub(crate) kill_pending: bool,
    /// An allocation failed during the current step; the scheduler moves
    /// the actor to `Error` at the suspension point.
    pub(crate) fault_pending: bool,
    /// Supervisor throttle, percent of timeslice withheld (0 = none).
    pub(crate) throttle_pct: u8,
    /// Resource and behavior accounting.
    pub accounting: ActorAccounting,
}

impl ActorRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ActorId,
        behavior: Option<Box<dyn Behavior>>,
        user_data: u64,
        priority: Priority,
        stack_size: usize,
        mailbox_capacity: usize,
        memory_limit: usize,
        now: Tick,
    ) -> Self {
        let mut accounting = ActorAccounting::new(now, memory_limit);
        accounting.memory_used = stack_size;
        Self {
            id,
            state: ActorState::Created,
            priority,
            behavior,
            user_data,
            stack: vec![0u8; stack_size],
            mailbox: Mailbox::new(mailbox_capacity),
            pending_reply: None,
            awaiting_reply: None,
            wake_at: None,
            wake_reason: None,
            resume_to: None,
            kill_pending: false,
            fault_pending: false,
            throttle_pct: 0,
            accounting,
        }
    }

    /// Stack bytes reserved for this actor.
    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    /// Current mailbox depth.
    pub fn mailbox_len(&self) -> usize {
        self.mailbox.len()
    }

    /// Mailbox capacity.
    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox.capacity()
    }

    /// Free the stack buffer. Finished actors release it eagerly; errored
    /// actors lazily at terminate.
    pub(crate) fn free_stack(&mut self) {
        let len = self.stack.len();
        self.accounting.credit_memory(len);
        self.stack = Vec::new();
    }

    /// Whether an entry behavior is present (the kernel actor has none).
    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }

    /// Slot-level invariant check; a failure here is kernel corruption.
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        let bypass = 1; // one System-kind overflow slot
        if self.mailbox.len() > self.mailbox.capacity() + bypass {
            return Err(format!(
                "{}: mailbox depth {} exceeds capacity {}",
                self.id,
                self.mailbox.len(),
                self.mailbox.capacity()
            ));
        }
        if self.awaiting_reply.is_some() && self.state != ActorState::Blocked {
            return Err(format!(
                "{}: awaiting a reply while {}",
                self.id, self.state
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ActorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRecord")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("priority", &self.priority)
            .field("mailbox_len", &self.mailbox.len())
            .field("has_behavior", &self.behavior.is_some())
            .field("accounting", &self.accounting)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ActorRecord {
        ActorRecord::new(
            ActorId::from_index(1),
            None,
            0xdead,
            Priority::Normal,
            4096,
            64,
            0,
            7,
        )
    }

    #[test]
    fn test_new_record_is_created_with_zeroed_stack() {
        let rec = record();
        assert_eq!(rec.state, ActorState::Created);
        assert_eq!(rec.stack_size(), 4096);
        assert!(rec.stack.iter().all(|&b| b == 0));
        assert_eq!(rec.user_data, 0xdead);
        assert_eq!(rec.accounting.created_tick, 7);
        assert_eq!(rec.accounting.behavior_score, 100);
    }

    #[test]
    fn test_stack_charged_to_memory_used() {
        let rec = record();
        assert_eq!(rec.accounting.memory_used, 4096);
    }

    #[test]
    fn test_free_stack_uncharges() {
        let mut rec = record();
        rec.free_stack();
        assert_eq!(rec.stack_size(), 0);
        assert_eq!(rec.accounting.memory_used, 0);
    }

    #[test]
    fn test_limit_check() {
        let mut rec = record();
        rec.accounting.memory_limit = 5000;
        assert!(!rec.accounting.would_exceed(900));
        assert!(rec.accounting.would_exceed(1000));
        rec.accounting.memory_limit = 0;
        assert!(!rec.accounting.would_exceed(usize::MAX / 2));
    }

    #[test]
    fn test_invariant_check_catches_phantom_await() {
        let mut rec = record();
        rec.awaiting_reply = Some(MessageId::from_raw(1));
        assert!(rec.check_invariants().is_err());
        rec.state = ActorState::Blocked;
        assert!(rec.check_invariants().is_ok());
    }
}
