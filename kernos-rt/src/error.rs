//! Error types for the actor runtime.
//!
//! Nothing is swallowed: every failed operation surfaces one of these to the
//! caller. The scheduler itself never aborts on an actor-level error, it
//! isolates the offender; only invariant corruption is fatal.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::actor::ActorState;
use crate::util::{ActorId, MessageId};

/// Errors surfaced by scheduler and messaging operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// The byte allocator refused a stack, payload, or mailbox charge.
    #[error("out of memory: {requested} bytes requested, {available} available")]
    OutOfMemory {
        /// Bytes the failing operation asked for.
        requested: usize,
        /// Bytes left in the budget at the time.
        available: usize,
    },

    /// Lookup of an actor id found no live slot.
    #[error("no such actor: {0}")]
    NoSuchId(ActorId),

    /// The actor table has no free slot.
    #[error("actor table full ({max_actors} slots)")]
    TableFull {
        /// Configured table size.
        max_actors: usize,
    },

    /// A lifecycle operation was applied in the wrong state.
    #[error("invalid state for {op}: {actor} is {state}")]
    StateInvalid {
        /// The offending actor.
        actor: ActorId,
        /// Its state at the time.
        state: ActorState,
        /// The rejected operation.
        op: &'static str,
    },

    /// Send into a mailbox at capacity; the caller decides drop or retry.
    #[error("mailbox of {recipient} full (capacity {capacity})")]
    MailboxFull {
        /// The rejecting recipient.
        recipient: ActorId,
        /// Its configured capacity.
        capacity: usize,
    },

    /// `reply` called on a message that did not ask for one.
    #[error("message {message} does not require a reply")]
    ReplyNotExpected {
        /// Id of the offending request.
        message: MessageId,
    },

    /// A slot failed its invariant check. Fatal: the kernel halts in a
    /// fault-safe loop rather than dispatch from corrupted state.
    #[error("kernel corruption: {reason}")]
    Corruption {
        /// What the invariant check found.
        reason: String,
    },
}

impl SchedulerError {
    /// Whether this error is fatal to the whole kernel (vs. isolated to the
    /// offending actor or operation).
    pub fn is_fatal(&self) -> bool {
        matches!(self, SchedulerError::Corruption { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(SchedulerError::Corruption {
            reason: "bad slot".into()
        }
        .is_fatal());
        assert!(!SchedulerError::NoSuchId(ActorId::from_index(3)).is_fatal());
        assert!(!SchedulerError::OutOfMemory {
            requested: 1,
            available: 0
        }
        .is_fatal());
    }

    #[test]
    fn test_display_carries_context() {
        let err = SchedulerError::MailboxFull {
            recipient: ActorId::from_index(2),
            capacity: 64,
        };
        let text = err.to_string();
        assert!(text.contains("actor#2"));
        assert!(text.contains("64"));
    }
}
