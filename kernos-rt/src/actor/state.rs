//! Actor lifecycle state machine.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Actor state in the lifecycle state machine.
///
/// # State Transitions
///
/// ```text
/// Created -> Ready -> Running -> Ready      (yield, timeslice expiry)
///                       |    \-> Blocked    (wait on empty mailbox)
///                       |    \-> Finished   (normal return)
///            Blocked -> Ready               (message arrival, timeout)
///            any     -> Suspended           (suspend; resume restores)
///            any     -> Error               (uncaught fault)
/// ```
///
/// `Finished` and `Error` are terminal; the slot is reclaimed by an explicit
/// `terminate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorState {
    /// Spawned but not yet started.
    Created,
    /// Eligible for dispatch; in the ready queue.
    Ready,
    /// Currently on the (single) logical CPU.
    Running,
    /// Waiting on an empty mailbox or a sync reply.
    Blocked,
    /// Returned normally from its entry.
    Finished,
    /// Faulted; isolated, slot reclaimed lazily.
    Error,
    /// Externally suspended; not in the ready queue.
    Suspended,
}

impl ActorState {
    /// Whether the exhaustive transition table permits `self -> to`.
    pub fn can_transition_to(self, to: ActorState) -> bool {
        use ActorState::*;
        match (self, to) {
            (Created, Ready) => true,
            (Ready, Running) => true,
            (Running, Ready | Blocked | Finished) => true,
            (Blocked, Ready) => true,
            // Suspension is legal from any live state; resume restores the
            // pre-suspension scheduling eligibility.
            (Created | Ready | Running | Blocked, Suspended) => true,
            (Suspended, Ready | Blocked | Created) => true,
            // Faults can strike anywhere.
            (_, Error) => true,
            _ => false,
        }
    }

    /// Terminal states; only `terminate` reclaims the slot from here.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActorState::Finished | ActorState::Error)
    }
}

impl fmt::Display for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActorState::Created => "created",
            ActorState::Ready => "ready",
            ActorState::Running => "running",
            ActorState::Blocked => "blocked",
            ActorState::Finished => "finished",
            ActorState::Error => "error",
            ActorState::Suspended => "suspended",
        };
        f.write_str(name)
    }
}

/// Why a blocked or suspended actor became ready again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WakeReason {
    /// A message was enqueued into the empty mailbox it was waiting on.
    MessageArrived,
    /// The sync reply it was awaiting arrived.
    ReplyArrived,
    /// Its wait timeout expired with no message.
    TimedOut,
    /// An external `resume` restored it.
    Resumed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(ActorState::Created.can_transition_to(ActorState::Ready));
        assert!(ActorState::Ready.can_transition_to(ActorState::Running));
        assert!(ActorState::Running.can_transition_to(ActorState::Ready));
        assert!(ActorState::Running.can_transition_to(ActorState::Blocked));
        assert!(ActorState::Running.can_transition_to(ActorState::Finished));
        assert!(ActorState::Blocked.can_transition_to(ActorState::Ready));
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        assert!(!ActorState::Created.can_transition_to(ActorState::Running));
        assert!(!ActorState::Blocked.can_transition_to(ActorState::Running));
        assert!(!ActorState::Finished.can_transition_to(ActorState::Ready));
        assert!(!ActorState::Ready.can_transition_to(ActorState::Finished));
    }

    #[test]
    fn test_error_reachable_from_anywhere() {
        for state in [
            ActorState::Created,
            ActorState::Ready,
            ActorState::Running,
            ActorState::Blocked,
            ActorState::Suspended,
        ] {
            assert!(state.can_transition_to(ActorState::Error));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(ActorState::Finished.is_terminal());
        assert!(ActorState::Error.is_terminal());
        assert!(!ActorState::Suspended.is_terminal());
    }
}
