//! Message envelopes: routing metadata plus an owned payload.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::types::{MessageKind, Payload, Priority};
use crate::util::{ActorId, MessageId, Tick};

/// A message in flight or at rest in a mailbox.
///
/// # Ownership
/// On enqueue the envelope and its payload transfer to the recipient's
/// mailbox; the sender retains nothing. On receive, ownership transfers to
/// the receiver, which releases the envelope back to the pool when done.
/// An envelope is referenced by at most one mailbox at a time; Rust move
/// semantics make the alternative unrepresentable.
///
/// # Example
/// ```rust
/// use kernos_rt::message::{Envelope, MessageKind, Payload, Priority};
/// use kernos_rt::util::{ActorId, MessageId};
///
/// let env = Envelope::new(
///     MessageId::from_raw(1),
///     ActorId::KERNEL,
///     ActorId::from_index(2),
///     MessageKind::Async,
///     Priority::Normal,
///     0,
///     Payload::copy_from(b"hi"),
/// );
/// assert_eq!(env.sender, ActorId::KERNEL);
/// assert!(!env.requires_reply);
/// ```
#[derive(Debug)]
pub struct Envelope {
    /// Monotonic message id; a sync reply reuses its request's id.
    pub message_id: MessageId,
    /// Originating actor.
    pub sender: ActorId,
    /// Destination actor; the kernel id doubles as the broadcast marker
    /// on `Broadcast`-kind envelopes.
    pub recipient: ActorId,
    /// Message kind, fixed at send time.
    pub kind: MessageKind,
    /// Advisory priority; never reorders a mailbox.
    pub priority: Priority,
    /// Kernel tick at send time.
    pub timestamp: Tick,
    /// Optional advisory deadline tick. Expiry flags the message, it never
    /// drops it.
    pub deadline: Option<Tick>,
    /// Reply routing for `requires_reply` requests.
    pub reply_to: Option<ActorId>,
    /// Whether the recipient is expected to call `reply`.
    pub requires_reply: bool,
    /// Owned payload bytes.
    pub payload: Payload,
}

impl Envelope {
    /// Construct an envelope with no reply routing and no deadline.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        message_id: MessageId,
        sender: ActorId,
        recipient: ActorId,
        kind: MessageKind,
        priority: Priority,
        timestamp: Tick,
        payload: Payload,
    ) -> Self {
        Self {
            message_id,
            sender,
            recipient,
            kind,
            priority,
            timestamp,
            deadline: None,
            reply_to: None,
            requires_reply: false,
            payload,
        }
    }

    /// Builder method: set an advisory deadline tick.
    pub fn with_deadline(mut self, deadline: Tick) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Builder method: mark as a reply-expecting request routed to `sender`.
    pub fn with_reply_to(mut self, reply_to: ActorId) -> Self {
        self.reply_to = Some(reply_to);
        self.requires_reply = true;
        self
    }

    /// Whether the advisory deadline has passed at `now`.
    ///
    /// Expired messages are still delivered; expiry is a flag the receiver
    /// may consult, never a drop.
    pub fn is_expired(&self, now: Tick) -> bool {
        matches!(self.deadline, Some(d) if now > d)
    }
}
