//! Bounded FIFO mailbox owned by a single actor.

// Layer 1: Standard library imports
use std::collections::VecDeque;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use super::metrics::MailboxMetrics;
use crate::message::Envelope;
#[cfg(test)]
use crate::message::MessageKind;

/// Error returned by mailbox operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MailboxError {
    /// The mailbox is at capacity; the caller decides retry or drop.
    #[error("mailbox full (capacity {capacity})")]
    Full {
        /// Configured capacity of the rejecting mailbox.
        capacity: usize,
    },
}

/// Bounded, strictly-FIFO message queue owned by exactly one actor.
///
/// Ordering is FIFO by enqueue; message priority never reorders a mailbox.
/// A full mailbox rejects sends with [`MailboxError::Full`], except
/// `System`-kind messages, which may overflow the cap by exactly one slot so
/// the kernel can always reach an actor.
///
/// # Example
/// ```rust
/// use kernos_rt::mailbox::Mailbox;
///
/// let mb = Mailbox::new(4);
/// assert_eq!(mb.capacity(), 4);
/// assert!(mb.is_empty());
/// ```
#[derive(Debug)]
pub struct Mailbox {
    queue: VecDeque<Envelope>,
    capacity: usize,
    metrics: MailboxMetrics,
}

impl Mailbox {
    /// Create a mailbox with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            metrics: MailboxMetrics::default(),
        }
    }

    /// Enqueue a message, transferring ownership into the mailbox.
    ///
    /// Fails with [`MailboxError::Full`] at capacity unless the message kind
    /// bypasses the cap. The rejected envelope is handed back so the caller
    /// can recycle its payload.
    pub fn push(&mut self, envelope: Envelope) -> Result<(), (MailboxError, Envelope)> {
        let cap = if envelope.kind.bypasses_cap() {
            self.capacity + 1
        } else {
            self.capacity
        };
        if self.queue.len() >= cap {
            self.metrics.record_rejection();
            return Err((
                MailboxError::Full {
                    capacity: self.capacity,
                },
                envelope,
            ));
        }
        self.queue.push_back(envelope);
        self.metrics.record_enqueue(self.queue.len());
        Ok(())
    }

    /// Dequeue the head message, transferring ownership to the caller.
    pub fn pop(&mut self) -> Option<Envelope> {
        let envelope = self.queue.pop_front();
        if envelope.is_some() {
            self.metrics.record_delivery();
        }
        envelope
    }

    /// Drain every queued message, in FIFO order. Used at actor termination
    /// to free undelivered payloads exactly once.
    pub fn drain(&mut self) -> impl Iterator<Item = Envelope> + '_ {
        self.queue.drain(..)
    }

    /// Current queue depth.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mailbox counters.
    pub fn metrics(&self) -> MailboxMetrics {
        self.metrics
    }
}
