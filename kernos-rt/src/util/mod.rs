//! Shared identifier and time types.

pub mod ids;

pub use ids::{ActorId, MessageId, Tick, Vector};
