//! Convenience re-exports for embedders and tests.
//!
//! ```rust
//! use kernos_rt::prelude::*;
//!
//! let mut sched = Scheduler::new(SchedulerConfig::default());
//! let idle = sched.dispatch_one();
//! assert_eq!(idle, Ok(Dispatch::Idle));
//! ```

pub use crate::actor::{ActorContext, ActorState, Behavior, Step, WakeReason};
pub use crate::error::SchedulerError;
pub use crate::interrupt::{InterruptMessage, IrqSender};
pub use crate::mailbox::{Mailbox, MailboxError};
pub use crate::message::{Envelope, MessageKind, Payload, Priority};
pub use crate::monitor::{
    AnomalyKind, BehaviorReport, Intervention, NoopSupervisor, Supervisor, ThresholdSupervisor,
};
pub use crate::sched::{Dispatch, MemoryBudget, Scheduler, SchedulerConfig, SchedulerStats};
pub use crate::util::{ActorId, MessageId, Tick, Vector};
