//! Message model: kinds, priorities, envelopes, and the payload pool.

pub mod envelope;
pub mod pool;
pub mod types;

pub use envelope::Envelope;
pub use pool::{MessagePool, PoolStats};
pub use types::{MessageKind, Payload, Priority};
