//! # kernos-rt - Cooperative Actor Runtime
//!
//! The concurrency core of the kernos kernel: every unit of in-kernel
//! concurrency is a cooperatively scheduled actor, and actors communicate
//! exclusively by asynchronous messages through bounded mailboxes. Hardware
//! interrupts are lifted into the same world: the interrupt stub enqueues a
//! message and returns; it never runs actor code.
//!
//! # Quick Start
//!
//! ```rust
//! use kernos_rt::prelude::*;
//!
//! // An actor that waits for one message, then finishes.
//! struct Collector;
//!
//! impl Behavior for Collector {
//!     fn step(&mut self, cx: &mut ActorContext<'_>) -> Step {
//!         match cx.receive() {
//!             Some(msg) => {
//!                 cx.release(msg);
//!                 Step::Done(0)
//!             }
//!             None => Step::Wait { timeout: None },
//!         }
//!     }
//! }
//!
//! let mut sched = Scheduler::new(SchedulerConfig::default());
//! let id = sched
//!     .spawn(Box::new(Collector), 0, Priority::Normal, 4096)
//!     .unwrap();
//! sched.start(id).unwrap();
//! sched.send_from_kernel(id, MessageKind::Async, b"hello").unwrap();
//! sched.run_until_idle(16).unwrap();
//! assert_eq!(sched.state_of(id), Some(ActorState::Finished));
//! ```
//!
//! # Concurrency Model
//!
//! Single logical thread; no preemption across actors. An actor runs until
//! it returns one of three suspension tokens (explicit yield, mailbox wait,
//! or sync-send), and every other kernel operation returns to the caller
//! before any other actor runs. Timer ticks only advance accounting and
//! force yields at timeslice boundaries; they are observed at dispatch
//! boundaries, never mid-step.
//!
//! # Module Organization
//!
//! - [`actor`] - lifecycle state machine, behaviors, slot records, context
//! - [`message`] - kinds, priorities, envelopes, payload pool
//! - [`mailbox`] - bounded FIFO mailboxes with per-mailbox metrics
//! - [`sched`] - actor table, ready queues, dispatch, memory budget
//! - [`interrupt`] - stub-to-scheduler interrupt bridge
//! - [`monitor`] - behavior reports and the supervisor contract
//! - [`util`] - dense ids and the tick type

pub mod actor;
pub mod error;
pub mod interrupt;
pub mod mailbox;
pub mod message;
pub mod monitor;
pub mod prelude;
pub mod sched;
pub mod util;

// Re-export commonly used types
pub use actor::{ActorContext, ActorRecord, ActorState, Behavior, Step, WakeReason};
pub use error::SchedulerError;
pub use interrupt::{InterruptBridge, InterruptMessage, IrqSender};
pub use mailbox::{Mailbox, MailboxError, MailboxMetrics};
pub use message::{Envelope, MessageKind, MessagePool, Payload, Priority};
pub use monitor::{AnomalyKind, BehaviorReport, Intervention, Supervisor};
pub use sched::{Dispatch, MemoryBudget, Scheduler, SchedulerConfig, SchedulerStats};
pub use util::{ActorId, MessageId, Tick, Vector};
