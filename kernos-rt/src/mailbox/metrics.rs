//! Per-mailbox counters.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::Serialize;

// Layer 3: Internal module imports
// (none)

/// Counters maintained by a single mailbox.
///
/// The scheduler is single-threaded by construction, so plain integers
/// suffice; there is no concurrent writer to race with.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct MailboxMetrics {
    /// Messages accepted into the queue.
    pub enqueued: u64,
    /// Messages handed to the owning actor.
    pub delivered: u64,
    /// Sends rejected because the queue was at capacity.
    pub rejected: u64,
    /// Highest queue depth observed.
    pub peak_depth: usize,
}

impl MailboxMetrics {
    pub(crate) fn record_enqueue(&mut self, depth: usize) {
        self.enqueued += 1;
        if depth > self.peak_depth {
            self.peak_depth = depth;
        }
    }

    pub(crate) fn record_delivery(&mut self) {
        self.delivered += 1;
    }

    pub(crate) fn record_rejection(&mut self) {
        self.rejected += 1;
    }
}
