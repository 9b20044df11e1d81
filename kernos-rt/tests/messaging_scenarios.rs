//! End-to-end messaging scenarios: spawn/send/receive, mailbox
//! back-pressure, and synchronous request/reply.

#![allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity

use std::cell::RefCell;
use std::rc::Rc;

use kernos_rt::prelude::*;

fn scheduler() -> Scheduler {
    let config = SchedulerConfig::builder()
        .with_max_actors(16)
        .with_dispatch_trace()
        .build()
        .unwrap();
    Scheduler::new(config)
}

/// Collects every received message, then finishes after `expect` of them.
struct Collector {
    seen: Rc<RefCell<Vec<(ActorId, Vec<u8>)>>>,
    expect: usize,
}

impl Behavior for Collector {
    fn step(&mut self, cx: &mut ActorContext<'_>) -> Step {
        while let Some(env) = cx.receive() {
            self.seen
                .borrow_mut()
                .push((env.sender, env.payload.bytes().to_vec()));
            cx.release(env);
        }
        if self.seen.borrow().len() >= self.expect {
            Step::Done(0)
        } else {
            Step::Wait { timeout: None }
        }
    }
}

#[test]
fn s1_spawn_send_receive() {
    let mut sched = scheduler();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let a = sched
        .spawn(
            Box::new(Collector {
                seen: Rc::clone(&seen),
                expect: 1,
            }),
            0,
            Priority::Normal,
            4096,
        )
        .unwrap();
    sched.start(a).unwrap();

    sched
        .send_from_kernel(a, MessageKind::Async, &[0x48, 0x65, 0x6c, 0x6c, 0x6f])
        .unwrap();
    sched.run_until_idle(16).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, ActorId::KERNEL);
    assert_eq!(seen[0].1, vec![0x48, 0x65, 0x6c, 0x6c, 0x6f]);
    assert_eq!(sched.state_of(a), Some(ActorState::Finished));

    let stats = sched.stats();
    assert_eq!(stats.messages_sent, 1);
    assert_eq!(stats.messages_delivered, 1);
}

/// Receives at most one message per dispatch, then yields.
struct SlowDrain;

impl Behavior for SlowDrain {
    fn step(&mut self, cx: &mut ActorContext<'_>) -> Step {
        if let Some(env) = cx.receive() {
            cx.release(env);
        }
        Step::Yield
    }
}

#[test]
fn s2_mailbox_backpressure() {
    let mut sched = scheduler();
    let a = sched
        .spawn_with(Box::new(SlowDrain), 0, Priority::Normal, 1024, 4, 0)
        .unwrap();
    sched.start(a).unwrap();

    for _ in 0..4 {
        sched.send_from_kernel(a, MessageKind::Async, b"m").unwrap();
    }
    let err = sched
        .send_from_kernel(a, MessageKind::Async, b"m")
        .unwrap_err();
    assert_eq!(
        err,
        SchedulerError::MailboxFull {
            recipient: a,
            capacity: 4
        }
    );

    // One receive re-opens exactly one slot.
    sched.dispatch_one().unwrap();
    assert!(sched.send_from_kernel(a, MessageKind::Async, b"m").is_ok());
    assert!(sched
        .send_from_kernel(a, MessageKind::Async, b"m")
        .is_err());
}

/// Sync requester: sends one request, then returns the reply payload.
struct Requester {
    to: ActorId,
    request_id: Rc<RefCell<Option<MessageId>>>,
    reply: Rc<RefCell<Option<(MessageId, Vec<u8>)>>>,
    sent: bool,
}

impl Behavior for Requester {
    fn step(&mut self, cx: &mut ActorContext<'_>) -> Step {
        if !self.sent {
            self.sent = true;
            let id = cx.send_sync(self.to, &[0x01]).unwrap();
            *self.request_id.borrow_mut() = Some(id);
            return Step::AwaitReply;
        }
        assert_eq!(cx.wake_reason(), Some(WakeReason::ReplyArrived));
        let env = cx.take_reply().unwrap();
        *self.reply.borrow_mut() = Some((env.message_id, env.payload.bytes().to_vec()));
        cx.release(env);
        Step::Done(0)
    }
}

/// Sync responder: answers the first request with `[0x02]`.
struct Responder;

impl Behavior for Responder {
    fn step(&mut self, cx: &mut ActorContext<'_>) -> Step {
        match cx.receive() {
            Some(req) => {
                assert!(req.requires_reply);
                assert_eq!(req.kind, MessageKind::SyncRequest);
                assert_eq!(req.payload.bytes(), &[0x01]);
                cx.reply(&req, &[0x02]).unwrap();
                cx.release(req);
                Step::Done(0)
            }
            None => Step::Wait { timeout: None },
        }
    }
}

#[test]
fn s3_sync_request_reply() {
    let mut sched = scheduler();
    let request_id = Rc::new(RefCell::new(None));
    let reply = Rc::new(RefCell::new(None));

    let b = sched
        .spawn(Box::new(Responder), 0, Priority::Normal, 4096)
        .unwrap();
    let a = sched
        .spawn(
            Box::new(Requester {
                to: b,
                request_id: Rc::clone(&request_id),
                reply: Rc::clone(&reply),
                sent: false,
            }),
            0,
            Priority::Normal,
            4096,
        )
        .unwrap();
    sched.start(a).unwrap();
    sched.start(b).unwrap();

    sched.run_until_idle(16).unwrap();

    let (reply_id, payload) = reply.borrow().clone().unwrap();
    assert_eq!(payload, vec![0x02]);
    // The reply carries the request's message id.
    assert_eq!(Some(reply_id), *request_id.borrow());

    // No other actor ran between A's yield and its resume except B.
    let dispatched = sched.trace().actors();
    let a_block = dispatched.iter().position(|&id| id == a).unwrap();
    let a_resume = dispatched.iter().rposition(|&id| id == a).unwrap();
    assert!(a_resume > a_block);
    assert!(dispatched[a_block + 1..a_resume]
        .iter()
        .all(|&id| id == b));
}

#[test]
fn reply_without_request_flag_is_rejected() {
    let mut sched = scheduler();
    let seen = Rc::new(RefCell::new(Vec::new()));

    struct BadReplier {
        outcome: Rc<RefCell<Vec<SchedulerError>>>,
    }
    impl Behavior for BadReplier {
        fn step(&mut self, cx: &mut ActorContext<'_>) -> Step {
            match cx.receive() {
                Some(env) => {
                    if let Err(err) = cx.reply(&env, b"no") {
                        self.outcome.borrow_mut().push(err);
                    }
                    cx.release(env);
                    Step::Done(0)
                }
                None => Step::Wait { timeout: None },
            }
        }
    }

    let a = sched
        .spawn(
            Box::new(BadReplier {
                outcome: Rc::clone(&seen),
            }),
            0,
            Priority::Normal,
            1024,
        )
        .unwrap();
    sched.start(a).unwrap();
    sched.send_from_kernel(a, MessageKind::Async, b"x").unwrap();
    sched.run_until_idle(8).unwrap();

    let outcome = seen.borrow();
    assert_eq!(outcome.len(), 1);
    assert!(matches!(
        outcome[0],
        SchedulerError::ReplyNotExpected { .. }
    ));
}

#[test]
fn mailbox_fifo_across_senders() {
    let mut sched = scheduler();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = sched
        .spawn(
            Box::new(Collector {
                seen: Rc::clone(&seen),
                expect: 6,
            }),
            0,
            Priority::Normal,
            1024,
        )
        .unwrap();
    sched.start(sink).unwrap();

    for byte in 0u8..6 {
        sched
            .send_from_kernel(sink, MessageKind::Async, &[byte])
            .unwrap();
    }
    sched.run_until_idle(8).unwrap();

    let order: Vec<u8> = seen.borrow().iter().map(|(_, p)| p[0]).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn broadcast_reports_partial_failure() {
    let mut sched = scheduler();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let roomy = sched
        .spawn(
            Box::new(Collector {
                seen: Rc::clone(&seen),
                expect: 1,
            }),
            0,
            Priority::Normal,
            1024,
        )
        .unwrap();
    let cramped = sched
        .spawn_with(Box::new(SlowDrain), 0, Priority::Normal, 1024, 1, 0)
        .unwrap();
    sched.start(roomy).unwrap();
    sched.start(cramped).unwrap();

    // Fill the cramped mailbox first.
    sched
        .send_from_kernel(cramped, MessageKind::Async, b"fill")
        .unwrap();

    let results = sched.broadcast_from_kernel(&[roomy, cramped], b"all");
    assert_eq!(results.len(), 2);
    assert!(results[0].1.is_ok());
    assert!(matches!(
        results[1].1,
        Err(SchedulerError::MailboxFull { .. })
    ));
}

#[test]
fn send_to_unknown_actor_fails() {
    let mut sched = scheduler();
    let err = sched
        .send_from_kernel(ActorId::from_index(9), MessageKind::Async, b"x")
        .unwrap_err();
    assert_eq!(err, SchedulerError::NoSuchId(ActorId::from_index(9)));
    assert_eq!(sched.stats().sends_failed, 1);
}

#[test]
fn deadline_expiry_still_delivers() {
    let mut sched = scheduler();
    let seen = Rc::new(RefCell::new(Vec::new()));

    struct DeadlineProbe {
        expired: Rc<RefCell<Vec<bool>>>,
    }
    impl Behavior for DeadlineProbe {
        fn step(&mut self, cx: &mut ActorContext<'_>) -> Step {
            match cx.receive() {
                Some(env) => {
                    let now = cx.now();
                    self.expired.borrow_mut().push(env.is_expired(now));
                    cx.release(env);
                    Step::Done(0)
                }
                None => Step::Wait { timeout: None },
            }
        }
    }

    let a = sched
        .spawn(
            Box::new(DeadlineProbe {
                expired: Rc::clone(&seen),
            }),
            0,
            Priority::Normal,
            1024,
        )
        .unwrap();
    // Send with a deadline 2 ticks out, then let 5 ticks lapse before the
    // actor runs: the message must still be delivered, flagged expired.
    sched
        .send_from_kernel_with_deadline(a, MessageKind::Async, b"late", 2)
        .unwrap();
    sched.start(a).unwrap();
    for _ in 0..5 {
        sched.timer_tick();
    }
    sched.run_until_idle(8).unwrap();

    let expired = seen.borrow();
    assert_eq!(*expired, vec![true]);
}
