//! Kernel API surface available to a running actor.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::state::WakeReason;
use crate::error::SchedulerError;
use crate::message::{Envelope, MessageKind};
use crate::sched::Scheduler;
use crate::util::{ActorId, MessageId, Tick};

/// Handle through which a behavior talks to the kernel during a step.
///
/// Every operation here returns before any other actor runs; the only ways
/// to give up the CPU are the [`Step`](super::Step) tokens the behavior
/// returns. Send failures are reported, never retried silently.
pub struct ActorContext<'a> {
    sched: &'a mut Scheduler,
    id: ActorId,
}

impl<'a> ActorContext<'a> {
    pub(crate) fn new(sched: &'a mut Scheduler, id: ActorId) -> Self {
        Self { sched, id }
    }

    /// The running actor's id.
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Current kernel tick.
    pub fn now(&self) -> Tick {
        self.sched.now()
    }

    /// The user-data word passed at spawn.
    pub fn user_data(&self) -> u64 {
        self.sched.user_data_of(self.id)
    }

    /// Why the last block ended, if the actor just woke up.
    pub fn wake_reason(&self) -> Option<WakeReason> {
        self.sched.wake_reason_of(self.id)
    }

    /// Depth of this actor's mailbox.
    pub fn mailbox_len(&self) -> usize {
        self.sched.mailbox_len_of(self.id)
    }

    /// Asynchronous send. The payload is copied once into a buffer owned by
    /// the message; on success this actor retains no reference to it.
    pub fn send(
        &mut self,
        to: ActorId,
        kind: MessageKind,
        payload: &[u8],
    ) -> Result<MessageId, SchedulerError> {
        self.sched.send_message(self.id, to, kind, payload, None, None)
    }

    /// Asynchronous send with an advisory deadline tick.
    pub fn send_with_deadline(
        &mut self,
        to: ActorId,
        kind: MessageKind,
        payload: &[u8],
        deadline: Tick,
    ) -> Result<MessageId, SchedulerError> {
        self.sched
            .send_message(self.id, to, kind, payload, Some(deadline), None)
    }

    /// Request half of a synchronous exchange.
    ///
    /// Sends a `SyncRequest` with reply routing back to this actor and marks
    /// it as awaiting the reply; the behavior must return
    /// [`Step::AwaitReply`](super::Step::AwaitReply) from the current step.
    /// After waking with [`WakeReason::ReplyArrived`], [`take_reply`]
    /// yields the reply envelope, which carries the request's message id.
    ///
    /// [`take_reply`]: ActorContext::take_reply
    pub fn send_sync(
        &mut self,
        to: ActorId,
        payload: &[u8],
    ) -> Result<MessageId, SchedulerError> {
        self.sched.begin_sync_request(self.id, to, payload)
    }

    /// N independent sends; each target's outcome is reported separately.
    pub fn broadcast(
        &mut self,
        targets: &[ActorId],
        payload: &[u8],
    ) -> Vec<(ActorId, Result<MessageId, SchedulerError>)> {
        targets
            .iter()
            .map(|&to| {
                let result =
                    self.sched
                        .send_message(self.id, to, MessageKind::Broadcast, payload, None, None);
                (to, result)
            })
            .collect()
    }

    /// Non-blocking receive: head of this actor's mailbox, or `None`.
    pub fn receive(&mut self) -> Option<Envelope> {
        self.sched.receive_for(self.id)
    }

    /// Reply to a `requires_reply` request. The reply routes to the
    /// request's `reply_to` with kind `SyncReply` and the request's id.
    pub fn reply(
        &mut self,
        request: &Envelope,
        payload: &[u8],
    ) -> Result<MessageId, SchedulerError> {
        self.sched.reply_to_message(self.id, request, payload)
    }

    /// Take the sync reply after waking from `AwaitReply`.
    pub fn take_reply(&mut self) -> Option<Envelope> {
        self.sched.take_reply_for(self.id)
    }

    /// Release a received envelope: the payload is dropped, the buffer
    /// returns to the message pool, and the bytes charged to this actor at
    /// delivery are credited back.
    pub fn release(&mut self, envelope: Envelope) {
        self.sched.release_envelope_for(self.id, envelope);
    }
}
