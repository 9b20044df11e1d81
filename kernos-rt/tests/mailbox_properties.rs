//! Property tests: mailbox capacity and FIFO invariants under arbitrary
//! operation sequences.

#![allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity

use proptest::prelude::*;

use kernos_rt::mailbox::Mailbox;
use kernos_rt::message::{Envelope, MessageKind, Payload, Priority};
use kernos_rt::util::{ActorId, MessageId};

fn envelope(id: u64, kind: MessageKind) -> Envelope {
    Envelope::new(
        MessageId::from_raw(id),
        ActorId::KERNEL,
        ActorId::from_index(1),
        kind,
        Priority::Normal,
        0,
        Payload::empty(),
    )
}

#[derive(Debug, Clone)]
enum Op {
    Push(MessageKind),
    Pop,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Push(MessageKind::Async)),
        1 => Just(Op::Push(MessageKind::System)),
        2 => Just(Op::Pop),
    ]
}

proptest! {
    #[test]
    fn depth_never_exceeds_cap_plus_bypass(
        capacity in 1usize..16,
        ops in proptest::collection::vec(arb_op(), 0..200),
    ) {
        let mut mb = Mailbox::new(capacity);
        let mut next_id = 0u64;
        for op in ops {
            match op {
                Op::Push(kind) => {
                    let _ = mb.push(envelope(next_id, kind));
                    next_id += 1;
                }
                Op::Pop => {
                    let _ = mb.pop();
                }
            }
            // One System-kind overflow slot, never more.
            prop_assert!(mb.len() <= capacity + 1);
        }
    }

    #[test]
    fn delivery_order_is_enqueue_order(
        capacity in 1usize..16,
        ops in proptest::collection::vec(arb_op(), 0..200),
    ) {
        let mut mb = Mailbox::new(capacity);
        let mut next_id = 0u64;
        let mut accepted = std::collections::VecDeque::new();
        for op in ops {
            match op {
                Op::Push(kind) => {
                    if mb.push(envelope(next_id, kind)).is_ok() {
                        accepted.push_back(next_id);
                    }
                    next_id += 1;
                }
                Op::Pop => {
                    let popped = mb.pop().map(|env| env.message_id.raw());
                    prop_assert_eq!(popped, accepted.pop_front());
                }
            }
        }
        // Drain delivers the remainder, still in order.
        let rest: Vec<u64> = mb.drain().map(|env| env.message_id.raw()).collect();
        let expected: Vec<u64> = accepted.into_iter().collect();
        prop_assert_eq!(rest, expected);
    }

    #[test]
    fn rejected_sends_are_counted_not_queued(
        capacity in 1usize..8,
        pushes in 0usize..40,
    ) {
        let mut mb = Mailbox::new(capacity);
        let mut rejected = 0u64;
        for id in 0..pushes {
            if mb.push(envelope(id as u64, MessageKind::Async)).is_err() {
                rejected += 1;
            }
        }
        prop_assert_eq!(mb.metrics().rejected, rejected);
        prop_assert_eq!(mb.len() as u64 + rejected, pushes as u64);
    }
}
