//! Interrupt bridge: lifting hardware interrupts into messages.
//!
//! Interrupts are the only truly asynchronous event in the system. The stub
//! half ([`IrqSender`]) may be driven from a foreign thread or an interrupt
//! context; it performs exactly one bounded enqueue per fire and returns.
//! The scheduler drains the channel at dispatch boundaries and routes each
//! interrupt as a `System`-kind message to the actor registered for its
//! vector. Interrupt handlers never run actor code; they synthesize
//! messages.

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

// Layer 3: Internal module imports
use crate::util::{ActorId, Tick, Vector};

/// Capacity of the stub-to-scheduler ring.
pub const IRQ_RING_CAPACITY: usize = 64;

/// Wire size of an encoded interrupt payload.
pub const INTERRUPT_PAYLOAD_LEN: usize = 25;

/// The distinguished interrupt payload routed to a registered actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptMessage {
    /// Interrupt vector that fired.
    pub vector: Vector,
    /// Hardware error code, 0 when the vector carries none.
    pub error_code: u32,
    /// Tick at which the scheduler routed the interrupt.
    pub timestamp: Tick,
    /// Originating CPU.
    pub cpu_id: u32,
    /// Saved interrupt frame pointer, opaque to the core.
    pub frame_ptr: u64,
}

impl InterruptMessage {
    /// Encode into the fixed little-endian wire layout.
    pub fn encode(&self) -> [u8; INTERRUPT_PAYLOAD_LEN] {
        let mut buf = [0u8; INTERRUPT_PAYLOAD_LEN];
        buf[0] = self.vector.0;
        buf[1..5].copy_from_slice(&self.error_code.to_le_bytes());
        buf[5..13].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[13..17].copy_from_slice(&self.cpu_id.to_le_bytes());
        buf[17..25].copy_from_slice(&self.frame_ptr.to_le_bytes());
        buf
    }

    /// Decode the fixed wire layout; `None` if the slice has the wrong size.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != INTERRUPT_PAYLOAD_LEN {
            return None;
        }
        Some(Self {
            vector: Vector(bytes[0]),
            error_code: u32::from_le_bytes(bytes[1..5].try_into().ok()?),
            timestamp: u64::from_le_bytes(bytes[5..13].try_into().ok()?),
            cpu_id: u32::from_le_bytes(bytes[13..17].try_into().ok()?),
            frame_ptr: u64::from_le_bytes(bytes[17..25].try_into().ok()?),
        })
    }
}

/// A raw interrupt fire, before the scheduler stamps and routes it.
#[derive(Debug, Clone, Copy)]
pub struct IrqFire {
    /// Vector that fired.
    pub vector: Vector,
    /// Hardware error code.
    pub error_code: u32,
    /// Originating CPU.
    pub cpu_id: u32,
    /// Saved frame pointer.
    pub frame_ptr: u64,
}

/// Stub half of the bridge. `Clone + Send`; safe to hand to IDT glue on
/// another thread.
#[derive(Debug, Clone)]
pub struct IrqSender {
    tx: Sender<IrqFire>,
}

impl IrqSender {
    /// One bounded enqueue. Returns `false` when the ring is full and the
    /// fire was dropped; the stub must not block or retry.
    pub fn raise(&self, vector: Vector, error_code: u32, cpu_id: u32, frame_ptr: u64) -> bool {
        match self.tx.try_send(IrqFire {
            vector,
            error_code,
            cpu_id,
            frame_ptr,
        }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Scheduler half of the bridge: vector registrations plus the drain side of
/// the ring.
#[derive(Debug)]
pub struct InterruptBridge {
    rx: Receiver<IrqFire>,
    tx: Sender<IrqFire>,
    registered: HashMap<Vector, ActorId>,
}

impl Default for InterruptBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptBridge {
    /// Create a bridge with the default ring capacity.
    pub fn new() -> Self {
        let (tx, rx) = bounded(IRQ_RING_CAPACITY);
        Self {
            rx,
            tx,
            registered: HashMap::new(),
        }
    }

    /// Obtain a stub handle for IDT glue.
    pub fn sender(&self) -> IrqSender {
        IrqSender {
            tx: self.tx.clone(),
        }
    }

    /// Register the target actor for a vector, replacing any previous one.
    pub fn register(&mut self, vector: Vector, actor: ActorId) {
        self.registered.insert(vector, actor);
    }

    /// Remove a vector registration.
    pub fn unregister(&mut self, vector: Vector) -> Option<ActorId> {
        self.registered.remove(&vector)
    }

    /// Target actor for a vector, if any.
    pub fn target(&self, vector: Vector) -> Option<ActorId> {
        self.registered.get(&vector).copied()
    }

    /// Drain pending fires, stamping each with `now`. Fires on unregistered
    /// vectors are spurious: logged and dropped.
    pub fn drain(&mut self, now: Tick) -> (Vec<(ActorId, InterruptMessage)>, u64) {
        let mut routed = Vec::new();
        let mut spurious = 0u64;
        while let Ok(fire) = self.rx.try_recv() {
            match self.registered.get(&fire.vector) {
                Some(&actor) => routed.push((
                    actor,
                    InterruptMessage {
                        vector: fire.vector,
                        error_code: fire.error_code,
                        timestamp: now,
                        cpu_id: fire.cpu_id,
                        frame_ptr: fire.frame_ptr,
                    },
                )),
                None => {
                    spurious += 1;
                    warn!(vector = %fire.vector, "spurious interrupt: no registered actor");
                }
            }
        }
        (routed, spurious)
    }
}
