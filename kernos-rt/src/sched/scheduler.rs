//! Cooperative dispatch across the fixed-size actor table.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use chrono::Utc;
use tracing::{debug, error, warn};

// Layer 3: Internal module imports
use super::config::SchedulerConfig;
use super::memory::MemoryBudget;
use super::queue::ReadyQueue;
use super::stats::{DispatchTrace, SchedulerStats};
use crate::actor::{ActorContext, ActorRecord, ActorState, Behavior, Step, WakeReason};
use crate::error::SchedulerError;
use crate::interrupt::{InterruptBridge, IrqSender};
use crate::message::{Envelope, MessageKind, MessagePool, PoolStats, Priority};
use crate::monitor::{BehaviorReport, Intervention, NoopSupervisor, Supervisor};
use crate::util::{ActorId, MessageId, Tick, Vector};

/// Outcome of a single dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// An actor ran until its next suspension point.
    Ran(ActorId),
    /// No actor was ready; the kernel actor holds the CPU.
    Idle,
}

/// Single-threaded cooperative scheduler.
///
/// Owns the actor table, the ready queues, the message pool, the global
/// memory budget, and the interrupt bridge. All mutation of actor slots goes
/// through this type; cross-entity references are dense ids into the table,
/// never pointers.
///
/// Slot 0 is the kernel actor: it has no behavior (the embedder's main loop
/// is its code), a larger mailbox, no quota, and it is considered `Running`
/// exactly when no other actor is, so at most one actor is ever `Running`.
pub struct Scheduler {
    config: SchedulerConfig,
    slots: Vec<Option<ActorRecord>>,
    ready: ReadyQueue,
    current: Option<ActorId>,
    next_message_id: u64,
    now: Tick,
    pool: MessagePool,
    budget: MemoryBudget,
    irq: InterruptBridge,
    supervisor: Box<dyn Supervisor>,
    stats: SchedulerStats,
    trace: DispatchTrace,
}

impl Scheduler {
    /// Create a scheduler from a validated configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        let mut slots: Vec<Option<ActorRecord>> = Vec::with_capacity(config.max_actors);
        slots.resize_with(config.max_actors, || None);

        let mut kernel = ActorRecord::new(
            ActorId::KERNEL,
            None,
            0,
            Priority::Critical,
            0,
            config.kernel_mailbox_capacity,
            0,
            0,
        );
        kernel.state = ActorState::Running;
        slots[0] = Some(kernel);

        let budget = MemoryBudget::new(config.memory_budget);
        let trace = DispatchTrace::new(config.trace_dispatch);
        Self {
            config,
            slots,
            ready: ReadyQueue::new(),
            current: None,
            next_message_id: 1,
            now: 0,
            pool: MessagePool::new(),
            budget,
            irq: InterruptBridge::new(),
            supervisor: Box::new(NoopSupervisor),
            stats: SchedulerStats::default(),
            trace,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle operations
    // ------------------------------------------------------------------

    /// Allocate an actor slot and stack; the first dispatch lands at the
    /// behavior's `step` with `user_data` visible through the context.
    /// The new actor is `Created` until `start`.
    pub fn spawn(
        &mut self,
        behavior: Box<dyn Behavior>,
        user_data: u64,
        priority: Priority,
        stack_size: usize,
    ) -> Result<ActorId, SchedulerError> {
        let mailbox_capacity = self.config.default_mailbox_capacity;
        self.spawn_with(behavior, user_data, priority, stack_size, mailbox_capacity, 0)
    }

    /// `spawn` with explicit mailbox capacity and per-actor memory limit
    /// (0 = unlimited).
    pub fn spawn_with(
        &mut self,
        behavior: Box<dyn Behavior>,
        user_data: u64,
        priority: Priority,
        stack_size: usize,
        mailbox_capacity: usize,
        memory_limit: usize,
    ) -> Result<ActorId, SchedulerError> {
        if memory_limit != 0 && stack_size > memory_limit {
            return Err(SchedulerError::OutOfMemory {
                requested: stack_size,
                available: memory_limit,
            });
        }
        let index = self
            .slots
            .iter()
            .skip(1)
            .position(Option::is_none)
            .map(|i| i + 1)
            .ok_or(SchedulerError::TableFull {
                max_actors: self.config.max_actors,
            })?;

        self.budget.charge(stack_size)?;
        let id = ActorId::from_index(index as u32);
        let record = ActorRecord::new(
            id,
            Some(behavior),
            user_data,
            priority,
            stack_size,
            mailbox_capacity,
            memory_limit,
            self.now,
        );
        self.slots[index] = Some(record);
        self.stats.spawns += 1;
        debug!(actor = %id, %priority, stack_size, "spawned");
        Ok(id)
    }

    /// `Created -> Ready`: insert into the ready queue.
    pub fn start(&mut self, id: ActorId) -> Result<(), SchedulerError> {
        let slot = self.slot_mut(id)?;
        if slot.state != ActorState::Created {
            return Err(SchedulerError::StateInvalid {
                actor: id,
                state: slot.state,
                op: "start",
            });
        }
        transition(slot, ActorState::Ready);
        let priority = slot.priority;
        self.ready.push(id, priority);
        Ok(())
    }

    /// Remove an actor: releases mailbox contents, frees the stack, and
    /// marks the slot free. Terminating the currently running actor is
    /// edge-triggered: finalization happens at its next suspension point.
    pub fn terminate(&mut self, id: ActorId) -> Result<(), SchedulerError> {
        if id.is_kernel() {
            return Err(SchedulerError::StateInvalid {
                actor: id,
                state: ActorState::Running,
                op: "terminate",
            });
        }
        let is_current = self.current == Some(id);
        let slot = self.slot_mut(id)?;
        if is_current {
            slot.kill_pending = true;
            return Ok(());
        }
        self.finalize_slot(id)
    }

    /// `any -> Suspended`; the actor leaves the ready queue and keeps its
    /// prior scheduling eligibility for `resume`.
    pub fn suspend(&mut self, id: ActorId) -> Result<(), SchedulerError> {
        if id.is_kernel() {
            return Err(SchedulerError::StateInvalid {
                actor: id,
                state: ActorState::Running,
                op: "suspend",
            });
        }
        let slot = self.slot_mut(id)?;
        let resume_to = match slot.state {
            ActorState::Ready | ActorState::Running => ActorState::Ready,
            ActorState::Blocked => ActorState::Blocked,
            ActorState::Created => ActorState::Created,
            state => {
                return Err(SchedulerError::StateInvalid {
                    actor: id,
                    state,
                    op: "suspend",
                })
            }
        };
        slot.resume_to = Some(resume_to);
        transition(slot, ActorState::Suspended);
        self.ready.remove(id);
        debug!(actor = %id, "suspended");
        Ok(())
    }

    /// `Suspended -> prior eligibility`: a previously Ready/Running actor
    /// re-enters the ready queue; a previously blocked one resumes waiting.
    pub fn resume(&mut self, id: ActorId) -> Result<(), SchedulerError> {
        let slot = self.slot_mut(id)?;
        if slot.state != ActorState::Suspended {
            return Err(SchedulerError::StateInvalid {
                actor: id,
                state: slot.state,
                op: "resume",
            });
        }
        let mut restored = slot.resume_to.take().unwrap_or(ActorState::Ready);
        // A message may have arrived while the actor was suspended mid-wait.
        if restored == ActorState::Blocked
            && slot.awaiting_reply.is_none()
            && !slot.mailbox.is_empty()
        {
            restored = ActorState::Ready;
            slot.wake_reason = Some(WakeReason::MessageArrived);
        } else if restored == ActorState::Ready {
            slot.wake_reason = Some(WakeReason::Resumed);
        }
        transition(slot, restored);
        let priority = slot.priority;
        if restored == ActorState::Ready {
            self.ready.push(id, priority);
        }
        Ok(())
    }

    /// Withhold `pct` percent of the actor's timeslice. The concrete
    /// throttling mechanism is scheduler-internal; callers only pick the
    /// percentage.
    pub fn throttle(&mut self, id: ActorId, pct: u8) -> Result<(), SchedulerError> {
        if id.is_kernel() {
            return Err(SchedulerError::StateInvalid {
                actor: id,
                state: ActorState::Running,
                op: "throttle",
            });
        }
        let slot = self.slot_mut(id)?;
        slot.throttle_pct = pct.min(100);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// External timer entry point: advances the global tick, wakes expired
    /// timed waits, and runs the supervision sweep on its cadence. Ticks
    /// are observed at dispatch boundaries only; this never switches away
    /// from a non-yield point.
    pub fn timer_tick(&mut self) {
        self.now += 1;
        self.stats.ticks = self.now;
        let now = self.now;

        for index in 1..self.slots.len() {
            let Some(slot) = self.slots[index].as_mut() else {
                continue;
            };
            if slot.state == ActorState::Blocked
                && slot.awaiting_reply.is_none()
                && matches!(slot.wake_at, Some(at) if at <= now)
            {
                transition(slot, ActorState::Ready);
                slot.wake_at = None;
                slot.wake_reason = Some(WakeReason::TimedOut);
                let id = slot.id;
                let priority = slot.priority;
                self.ready.push(id, priority);
            }
        }

        let interval = self.config.sweep_interval_ticks;
        if interval != 0 && self.now % interval == 0 {
            self.run_sweep();
        }
    }

    /// Current tick.
    pub fn now(&self) -> Tick {
        self.now
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Pick the next ready actor and run it to its next suspension point.
    ///
    /// Returns [`Dispatch::Idle`] when no actor is ready (the kernel actor
    /// then holds the CPU). A slot failing its invariant check is fatal
    /// [`SchedulerError::Corruption`]; every actor-level failure merely
    /// isolates the offender and the scheduler continues.
    pub fn dispatch_one(&mut self) -> Result<Dispatch, SchedulerError> {
        self.route_interrupts();

        let Some(id) = self.ready.pop() else {
            return Ok(Dispatch::Idle);
        };

        let now = self.now;
        {
            let slot = self.slot_mut(id)?;
            if let Err(reason) = slot.check_invariants() {
                error!(actor = %id, %reason, "invariant check failed");
                return Err(SchedulerError::Corruption { reason });
            }
            if slot.state != ActorState::Ready {
                return Err(SchedulerError::Corruption {
                    reason: format!("{id} queued while {}", slot.state),
                });
            }
            transition(slot, ActorState::Running);
            slot.accounting.last_scheduled_tick = now;
        }
        self.set_kernel_state(ActorState::Ready);
        self.current = Some(id);
        self.trace.record(now, id);

        let mut behavior = match self.slot_mut(id)?.behavior.take() {
            Some(behavior) => behavior,
            None => {
                return Err(SchedulerError::Corruption {
                    reason: format!("{id} has no behavior"),
                })
            }
        };

        let mut steps_left = self.effective_timeslice(id);
        let final_step = loop {
            let step = {
                let mut cx = ActorContext::new(self, id);
                behavior.step(&mut cx)
            };
            self.charge_cpu(id);
            let interrupted = self
                .slot_ref(id)
                .is_some_and(|slot| slot.kill_pending || slot.fault_pending);
            match step {
                Step::Continue if interrupted => break Step::Yield,
                Step::Continue if steps_left > 1 => steps_left -= 1,
                Step::Continue => {
                    // Timeslice expiry: forced yield.
                    self.stats.preemptions += 1;
                    break Step::Yield;
                }
                other => break other,
            }
        };

        // Settle the outgoing actor's state at the suspension point.
        let mut stack_freed = 0usize;
        let requeue = {
            let slot = self.slot_mut(id)?;
            slot.behavior = Some(behavior);
            if slot.fault_pending {
                // Allocation failure: isolate the offender. The stack is
                // freed lazily, at terminate.
                slot.fault_pending = false;
                transition(slot, ActorState::Error);
                false
            } else {
                match final_step {
                    Step::Yield | Step::Continue => {
                        transition(slot, ActorState::Ready);
                        true
                    }
                    Step::Wait { timeout } => {
                        if !slot.mailbox.is_empty() || timeout == Some(0) {
                            // A message is already queued, or the timeout is
                            // zero: wait returns without blocking.
                            transition(slot, ActorState::Ready);
                            true
                        } else {
                            transition(slot, ActorState::Blocked);
                            slot.wake_at = timeout.map(|t| now + t);
                            slot.wake_reason = None;
                            false
                        }
                    }
                    Step::AwaitReply => {
                        if slot.awaiting_reply.is_some() {
                            transition(slot, ActorState::Blocked);
                            false
                        } else if slot.pending_reply.is_some() {
                            // Reply landed before the block took effect.
                            transition(slot, ActorState::Ready);
                            slot.wake_reason = Some(WakeReason::ReplyArrived);
                            true
                        } else {
                            warn!(actor = %id, "AwaitReply without an outstanding request");
                            transition(slot, ActorState::Error);
                            false
                        }
                    }
                    Step::Done(code) => {
                        debug!(actor = %id, code, "finished");
                        transition(slot, ActorState::Finished);
                        stack_freed = slot.stack.len();
                        slot.free_stack();
                        false
                    }
                }
            }
        };
        self.budget.credit(stack_freed);
        if requeue {
            let priority = self.slot_ref(id).map(|s| s.priority).unwrap_or_default();
            self.ready.push(id, priority);
        }

        self.stats.context_switches += 1;
        self.current = None;
        self.set_kernel_state(ActorState::Running);

        if self.slot_ref(id).is_some_and(|s| s.kill_pending) {
            self.finalize_slot(id)?;
        }
        Ok(Dispatch::Ran(id))
    }

    /// Dispatch until no actor is ready, bounded by `max_dispatches`.
    /// Returns the number of dispatches performed.
    pub fn run_until_idle(&mut self, max_dispatches: u64) -> Result<u64, SchedulerError> {
        let mut ran = 0;
        while ran < max_dispatches {
            match self.dispatch_one()? {
                Dispatch::Ran(_) => ran += 1,
                Dispatch::Idle => break,
            }
        }
        Ok(ran)
    }

    // ------------------------------------------------------------------
    // Messaging
    // ------------------------------------------------------------------

    /// Send from the kernel actor (the embedder's main loop).
    pub fn send_from_kernel(
        &mut self,
        to: ActorId,
        kind: MessageKind,
        payload: &[u8],
    ) -> Result<MessageId, SchedulerError> {
        self.send_message(ActorId::KERNEL, to, kind, payload, None, None)
    }

    /// Kernel send with an advisory deadline tick.
    pub fn send_from_kernel_with_deadline(
        &mut self,
        to: ActorId,
        kind: MessageKind,
        payload: &[u8],
        deadline: Tick,
    ) -> Result<MessageId, SchedulerError> {
        self.send_message(ActorId::KERNEL, to, kind, payload, Some(deadline), None)
    }

    /// Broadcast from the kernel actor: N independent sends with per-target
    /// outcomes.
    pub fn broadcast_from_kernel(
        &mut self,
        targets: &[ActorId],
        payload: &[u8],
    ) -> Vec<(ActorId, Result<MessageId, SchedulerError>)> {
        targets
            .iter()
            .map(|&to| {
                let result = self.send_message(
                    ActorId::KERNEL,
                    to,
                    MessageKind::Broadcast,
                    payload,
                    None,
                    None,
                );
                (to, result)
            })
            .collect()
    }

    /// Non-blocking receive on the kernel actor's mailbox.
    pub fn kernel_receive(&mut self) -> Option<Envelope> {
        self.receive_for(ActorId::KERNEL)
    }

    /// Release an envelope received on the kernel mailbox: payload dropped,
    /// buffer recycled, budgets credited.
    pub fn release_envelope(&mut self, envelope: Envelope) {
        self.release_envelope_for(ActorId::KERNEL, envelope);
    }

    /// Release on behalf of `owner`: the payload bytes charged to the owner
    /// at delivery are returned along with the global budget.
    pub(crate) fn release_envelope_for(&mut self, owner: ActorId, envelope: Envelope) {
        let len = envelope.payload.len();
        self.budget.credit(len);
        if let Some(slot) = self
            .slots
            .get_mut(owner.index() as usize)
            .and_then(Option::as_mut)
        {
            slot.accounting.credit_memory(len);
        }
        self.pool.release(envelope);
    }

    pub(crate) fn send_message(
        &mut self,
        sender: ActorId,
        to: ActorId,
        kind: MessageKind,
        payload: &[u8],
        deadline: Option<Tick>,
        forced_id: Option<MessageId>,
    ) -> Result<MessageId, SchedulerError> {
        let recipient_live = self
            .slot_ref(to)
            .is_some_and(|slot| !slot.state.is_terminal());
        if !recipient_live {
            self.stats.sends_failed += 1;
            return Err(SchedulerError::NoSuchId(to));
        }

        // The payload is charged to the recipient on delivery; a recipient
        // at its memory limit rejects the send.
        if let Some(slot) = self.slot_ref(to) {
            if slot.accounting.would_exceed(payload.len()) {
                let available = slot.accounting.memory_available();
                self.stats.sends_failed += 1;
                return Err(SchedulerError::OutOfMemory {
                    requested: payload.len(),
                    available,
                });
            }
        }

        if let Err(err) = self.budget.charge(payload.len()) {
            self.stats.sends_failed += 1;
            self.mark_fault(sender);
            return Err(err);
        }

        let message_id = forced_id.unwrap_or_else(|| {
            let id = MessageId::from_raw(self.next_message_id);
            self.next_message_id += 1;
            id
        });

        let priority = self
            .slot_ref(sender)
            .map(|slot| slot.priority)
            .unwrap_or_default();
        // The kernel id doubles as the broadcast marker in the recipient
        // field; delivery still targets one concrete mailbox.
        let recipient_field = if kind == MessageKind::Broadcast {
            ActorId::KERNEL
        } else {
            to
        };
        let mut envelope = Envelope::new(
            message_id,
            sender,
            recipient_field,
            kind,
            priority,
            self.now,
            self.pool.make_payload(payload),
        );
        envelope.deadline = deadline;
        if kind == MessageKind::SyncRequest {
            envelope = envelope.with_reply_to(sender);
        }

        // A sync reply lands out-of-band in the requester's reply slot.
        if kind == MessageKind::SyncReply {
            let awaited = self.slot_ref(to).and_then(|slot| slot.awaiting_reply);
            if awaited == Some(message_id) {
                let slot = self.slot_mut(to)?;
                slot.awaiting_reply = None;
                slot.pending_reply = Some(envelope);
                slot.accounting.charge_memory(payload.len());
                slot.wake_at = None;
                let wake = slot.state == ActorState::Blocked;
                let priority = slot.priority;
                if wake {
                    transition(slot, ActorState::Ready);
                    slot.wake_reason = Some(WakeReason::ReplyArrived);
                    self.ready.push(to, priority);
                }
                self.stats.messages_sent += 1;
                self.bump_sender(sender);
                return Ok(message_id);
            }
        }

        let payload_len = payload.len();
        let push_result = {
            let slot = self.slot_mut(to)?;
            slot.mailbox.push(envelope)
        };
        match push_result {
            Ok(()) => {
                self.stats.messages_sent += 1;
                self.bump_sender(sender);
                let slot = self.slot_mut(to)?;
                slot.accounting.charge_memory(payload_len);
                let wake = slot.state == ActorState::Blocked && slot.awaiting_reply.is_none();
                let priority = slot.priority;
                if wake {
                    transition(slot, ActorState::Ready);
                    slot.wake_at = None;
                    slot.wake_reason = Some(WakeReason::MessageArrived);
                    self.ready.push(to, priority);
                }
                Ok(message_id)
            }
            Err((_, rejected)) => {
                self.budget.credit(payload_len);
                self.pool.release(rejected);
                self.stats.sends_failed += 1;
                let capacity = self
                    .slot_ref(to)
                    .map(|slot| slot.mailbox.capacity())
                    .unwrap_or_default();
                Err(SchedulerError::MailboxFull {
                    recipient: to,
                    capacity,
                })
            }
        }
    }

    pub(crate) fn begin_sync_request(
        &mut self,
        sender: ActorId,
        to: ActorId,
        payload: &[u8],
    ) -> Result<MessageId, SchedulerError> {
        let message_id =
            self.send_message(sender, to, MessageKind::SyncRequest, payload, None, None)?;
        let slot = self.slot_mut(sender)?;
        slot.awaiting_reply = Some(message_id);
        Ok(message_id)
    }

    pub(crate) fn reply_to_message(
        &mut self,
        sender: ActorId,
        request: &Envelope,
        payload: &[u8],
    ) -> Result<MessageId, SchedulerError> {
        if !request.requires_reply {
            return Err(SchedulerError::ReplyNotExpected {
                message: request.message_id,
            });
        }
        let Some(target) = request.reply_to else {
            return Err(SchedulerError::ReplyNotExpected {
                message: request.message_id,
            });
        };
        self.send_message(
            sender,
            target,
            MessageKind::SyncReply,
            payload,
            None,
            Some(request.message_id),
        )
    }

    pub(crate) fn receive_for(&mut self, id: ActorId) -> Option<Envelope> {
        let slot = self
            .slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)?;
        let envelope = slot.mailbox.pop();
        if envelope.is_some() {
            slot.accounting.messages_received += 1;
            self.stats.messages_delivered += 1;
        }
        envelope
    }

    pub(crate) fn take_reply_for(&mut self, id: ActorId) -> Option<Envelope> {
        let slot = self
            .slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)?;
        let envelope = slot.pending_reply.take();
        if envelope.is_some() {
            slot.accounting.messages_received += 1;
            self.stats.messages_delivered += 1;
        }
        envelope
    }

    // ------------------------------------------------------------------
    // Interrupts
    // ------------------------------------------------------------------

    /// Stub handle for IDT glue; may cross threads.
    pub fn irq_sender(&self) -> IrqSender {
        self.irq.sender()
    }

    /// Register the target actor for an interrupt vector.
    pub fn register_vector(&mut self, vector: Vector, actor: ActorId) {
        self.irq.register(vector, actor);
    }

    fn route_interrupts(&mut self) {
        let (routed, spurious) = self.irq.drain(self.now);
        self.stats.interrupts_spurious += spurious;
        for (actor, message) in routed {
            let payload = message.encode();
            match self.send_message(
                ActorId::KERNEL,
                actor,
                MessageKind::System,
                &payload,
                None,
                None,
            ) {
                Ok(_) => self.stats.interrupts_routed += 1,
                Err(err) => {
                    warn!(%actor, vector = %message.vector, %err, "interrupt delivery failed");
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Supervision
    // ------------------------------------------------------------------

    /// Replace the supervisor consulted by the periodic sweep.
    pub fn set_supervisor(&mut self, supervisor: Box<dyn Supervisor>) {
        self.supervisor = supervisor;
    }

    fn run_sweep(&mut self) {
        let captured_at = Utc::now();
        let reports: Vec<BehaviorReport> = self
            .slots
            .iter()
            .skip(1)
            .flatten()
            .filter(|slot| !slot.state.is_terminal())
            .map(|slot| BehaviorReport {
                actor: slot.id,
                behavior_score: slot.accounting.behavior_score,
                cpu_ticks: slot.accounting.cpu_ticks,
                messages_sent: slot.accounting.messages_sent,
                mailbox_depth: slot.mailbox.len(),
                mailbox_capacity: slot.mailbox.capacity(),
                memory_used: slot.accounting.memory_used,
                anomalies: slot.accounting.anomalies,
                tick: self.now,
                captured_at,
            })
            .collect();

        let interventions = self.supervisor.sweep(&reports);
        for intervention in interventions {
            match intervention {
                Intervention::Suspend(id) => {
                    if let Err(err) = self.suspend(id) {
                        debug!(actor = %id, %err, "sweep suspend skipped");
                    }
                }
                Intervention::Throttle(id, pct) => {
                    if let Some(slot) = self
                        .slots
                        .get_mut(id.index() as usize)
                        .and_then(Option::as_mut)
                    {
                        slot.throttle_pct = pct.min(100);
                    }
                }
                Intervention::Flag(id, kind) => {
                    if let Some(slot) = self
                        .slots
                        .get_mut(id.index() as usize)
                        .and_then(Option::as_mut)
                    {
                        slot.accounting.anomalies += 1;
                        slot.accounting.behavior_score =
                            slot.accounting.behavior_score.saturating_sub(10);
                        warn!(actor = %id, ?kind, "anomaly flagged");
                    }
                }
            }
        }
        self.stats.sweeps_run += 1;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Borrow an actor record for inspection.
    pub fn actor(&self, id: ActorId) -> Option<&ActorRecord> {
        self.slot_ref(id)
    }

    /// State of an actor, if its slot is live.
    pub fn state_of(&self, id: ActorId) -> Option<ActorState> {
        self.slot_ref(id).map(|slot| slot.state)
    }

    /// Aggregate counters.
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Message-pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Global byte budget.
    pub fn budget(&self) -> MemoryBudget {
        self.budget
    }

    /// The dispatch trace (empty unless enabled in config).
    pub fn trace(&self) -> &DispatchTrace {
        &self.trace
    }

    /// Scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Count of live (non-terminal) actors, kernel included.
    pub fn live_actors(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| !slot.state.is_terminal())
            .count()
    }

    pub(crate) fn user_data_of(&self, id: ActorId) -> u64 {
        self.slot_ref(id).map(|slot| slot.user_data).unwrap_or(0)
    }

    pub(crate) fn wake_reason_of(&self, id: ActorId) -> Option<WakeReason> {
        self.slot_ref(id).and_then(|slot| slot.wake_reason)
    }

    pub(crate) fn mailbox_len_of(&self, id: ActorId) -> usize {
        self.slot_ref(id)
            .map(|slot| slot.mailbox.len())
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn slot_ref(&self, id: ActorId) -> Option<&ActorRecord> {
        self.slots.get(id.index() as usize).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: ActorId) -> Result<&mut ActorRecord, SchedulerError> {
        self.slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
            .ok_or(SchedulerError::NoSuchId(id))
    }

    fn set_kernel_state(&mut self, state: ActorState) {
        if let Some(kernel) = self.slots[0].as_mut() {
            transition(kernel, state);
        }
    }

    fn bump_sender(&mut self, sender: ActorId) {
        if let Some(slot) = self
            .slots
            .get_mut(sender.index() as usize)
            .and_then(Option::as_mut)
        {
            slot.accounting.messages_sent += 1;
        }
    }

    fn mark_fault(&mut self, id: ActorId) {
        if id.is_kernel() || self.current != Some(id) {
            return;
        }
        if let Some(slot) = self
            .slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
        {
            slot.fault_pending = true;
        }
    }

    fn charge_cpu(&mut self, id: ActorId) {
        if let Some(slot) = self
            .slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
        {
            slot.accounting.cpu_ticks += 1;
        }
    }

    fn effective_timeslice(&self, id: ActorId) -> u32 {
        let base = self.config.timeslice_ticks;
        let throttle = self
            .slot_ref(id)
            .map(|slot| u32::from(slot.throttle_pct))
            .unwrap_or(0);
        let scaled = base.saturating_mul(100 - throttle.min(99)) / 100;
        scaled.max(1)
    }

    fn finalize_slot(&mut self, id: ActorId) -> Result<(), SchedulerError> {
        self.ready.remove(id);
        let Some(mut slot) = self
            .slots
            .get_mut(id.index() as usize)
            .and_then(Option::take)
        else {
            return Err(SchedulerError::NoSuchId(id));
        };

        // Free payloads of undelivered messages exactly once.
        let mut freed = 0usize;
        for envelope in slot.mailbox.drain() {
            freed += envelope.payload.len();
        }
        if let Some(envelope) = slot.pending_reply.take() {
            freed += envelope.payload.len();
            self.pool.release(envelope);
        }
        self.budget.credit(freed);
        self.budget.credit(slot.stack.len());
        slot.free_stack();
        self.stats.terminations += 1;
        debug!(actor = %id, "terminated");
        Ok(())
    }
}

/// State write guard: every scheduler-side state change must be an edge
/// of the documented actor state machine.
fn transition(slot: &mut ActorRecord, to: ActorState) {
    debug_assert!(
        slot.state.can_transition_to(to),
        "illegal transition {} -> {} for {}",
        slot.state,
        to,
        slot.id
    );
    slot.state = to;
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("current", &self.current)
            .field("live_actors", &self.live_actors())
            .field("ready", &self.ready.len())
            .finish_non_exhaustive()
    }
}
