//! Priority-class ready queues.

// Layer 1: Standard library imports
use std::collections::VecDeque;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::message::Priority;
use crate::util::ActorId;

/// Strict-priority, round-robin-within-class ready queue.
///
/// Five FIFO queues, one per priority class. Selection always drains the
/// highest non-empty class; within a class, actors are dispatched in queue
/// order and re-enqueued at the back, which is exactly
/// least-recently-dispatched-first and prevents starvation inside a class.
/// The kernel actor is never enqueued here; it is the fallback when every
/// queue is empty.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    classes: [VecDeque<ActorId>; Priority::COUNT],
}

impl ReadyQueue {
    /// Create empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an actor at the back of its class.
    pub fn push(&mut self, id: ActorId, priority: Priority) {
        self.classes[priority.queue_index()].push_back(id);
    }

    /// Dequeue the next actor: highest class first, FIFO within class.
    pub fn pop(&mut self) -> Option<ActorId> {
        self.classes.iter_mut().find_map(VecDeque::pop_front)
    }

    /// Remove an actor from whichever class holds it (suspend, terminate).
    pub fn remove(&mut self, id: ActorId) -> bool {
        for class in &mut self.classes {
            if let Some(pos) = class.iter().position(|&queued| queued == id) {
                class.remove(pos);
                return true;
            }
        }
        false
    }

    /// Whether the actor is queued anywhere.
    pub fn contains(&self, id: ActorId) -> bool {
        self.classes
            .iter()
            .any(|class| class.iter().any(|&queued| queued == id))
    }

    /// Total queued actors across all classes.
    pub fn len(&self) -> usize {
        self.classes.iter().map(VecDeque::len).sum()
    }

    /// Whether every class is empty.
    pub fn is_empty(&self) -> bool {
        self.classes.iter().all(VecDeque::is_empty)
    }
}
