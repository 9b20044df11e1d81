//! Message kinds, priorities, and owned payload buffers.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Scheduling priority, shared by actors and messages.
///
/// Strictly ordered: `Critical` outranks `High`, and so on down to `Idle`.
/// For messages the priority is advisory for the scheduler only; mailbox
/// ordering is always FIFO by enqueue.
///
/// # Example
/// ```rust
/// use kernos_rt::message::Priority;
///
/// assert!(Priority::Critical > Priority::High);
/// assert!(Priority::Low > Priority::Idle);
/// assert_eq!(Priority::default(), Priority::Normal);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Lowest class; dispatched only when nothing else is ready.
    Idle,
    /// Background work.
    Low,
    /// Default class.
    Normal,
    /// Latency-sensitive work.
    High,
    /// Reserved for kernel-critical actors.
    Critical,
}

impl Priority {
    /// Number of priority classes.
    pub const COUNT: usize = 5;

    /// Ready-queue index, highest class first.
    pub const fn queue_index(self) -> usize {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
            Priority::Idle => 4,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// Kind of a message, fixed at send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Fire-and-forget send.
    Async,
    /// Request half of a synchronous exchange; carries `requires_reply`.
    SyncRequest,
    /// Reply half; shares the request's message id.
    SyncReply,
    /// One of N fan-out sends.
    Broadcast,
    /// Kernel-originated message; may overflow a full mailbox by one slot.
    System,
}

impl MessageKind {
    /// System messages bypass the mailbox cap by one slot to preserve
    /// kernel liveness.
    pub const fn bypasses_cap(self) -> bool {
        matches!(self, MessageKind::System)
    }
}

/// Owned message payload.
///
/// The byte buffer is copied exactly once, at send time, into a buffer owned
/// by the message; from then on ownership moves with the envelope. An empty
/// payload is legal and allocation-free.
///
/// # Example
/// ```rust
/// use kernos_rt::message::Payload;
///
/// let p = Payload::copy_from(&[1, 2, 3]);
/// assert_eq!(p.bytes(), &[1, 2, 3]);
/// assert_eq!(p.len(), 3);
/// assert!(Payload::empty().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    buf: Vec<u8>,
}

impl Payload {
    /// The empty payload.
    pub const fn empty() -> Self {
        Self { buf: Vec::new() }
    }

    /// Copy `bytes` into a new owned buffer.
    pub fn copy_from(bytes: &[u8]) -> Self {
        Self {
            buf: bytes.to_vec(),
        }
    }

    /// Wrap an already-owned buffer without copying.
    pub fn from_vec(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    /// Borrow the payload bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the payload, returning the buffer for reuse.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    /// Drop the contents but keep the buffer capacity.
    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }

    /// Reuse a recycled buffer, copying `bytes` into it.
    pub(crate) fn refill(mut recycled: Vec<u8>, bytes: &[u8]) -> Self {
        recycled.clear();
        recycled.extend_from_slice(bytes);
        Self { buf: recycled }
    }
}
