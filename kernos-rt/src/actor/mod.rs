//! Actors: lifecycle state machine, behaviors, slot records, and the
//! in-step kernel API.

pub mod behavior;
pub mod context;
pub mod record;
pub mod state;

pub use behavior::{Behavior, Step};
pub use context::ActorContext;
pub use record::{ActorAccounting, ActorRecord};
pub use state::{ActorState, WakeReason};
