//! Bounded per-actor mailboxes.

pub mod bounded;
pub mod metrics;

pub use bounded::{Mailbox, MailboxError};
pub use metrics::MailboxMetrics;
