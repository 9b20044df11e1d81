//! Cooperative actor behaviors and suspension tokens.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::context::ActorContext;

/// Next-action token returned from a behavior step.
///
/// These are the only suspension points in the system: explicit yield,
/// mailbox wait, and sync-send. Every other kernel operation returns to the
/// caller before any other actor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep the CPU; the scheduler re-enters `step` immediately, until the
    /// timeslice expires.
    Continue,
    /// Give up the CPU and go back to the ready queue.
    Yield,
    /// Wait for a mailbox message. `timeout` is in ticks; `Some(0)` with an
    /// empty mailbox does not block; the actor stays ready and retries.
    Wait {
        /// Ticks to wait before waking with `WakeReason::TimedOut`.
        timeout: Option<u64>,
    },
    /// Block until the reply to the sync request issued this step arrives.
    AwaitReply,
    /// Normal return from the entry with an exit code.
    Done(i32),
}

/// A cooperative actor: an iterated state machine driven by the scheduler.
///
/// `step` runs with the actor in `Running` state and exclusive access to the
/// kernel API through [`ActorContext`]; the returned [`Step`] tells the
/// scheduler how to suspend it. Entry semantics: the first `step` call is
/// the dispatch landing at `entry(user_data)`; the user-data word is
/// available via the context.
///
/// # Example
/// ```rust
/// use kernos_rt::actor::{ActorContext, Behavior, Step};
///
/// struct EchoOnce;
///
/// impl Behavior for EchoOnce {
///     fn step(&mut self, cx: &mut ActorContext<'_>) -> Step {
///         match cx.receive() {
///             Some(msg) => {
///                 cx.release(msg);
///                 Step::Done(0)
///             }
///             None => Step::Wait { timeout: None },
///         }
///     }
/// }
/// ```
pub trait Behavior {
    /// Run until the next suspension point.
    fn step(&mut self, cx: &mut ActorContext<'_>) -> Step;
}

/// Blanket impl so plain `FnMut` closures can serve as simple behaviors in
/// tests and fixtures.
impl<F> Behavior for F
where
    F: FnMut(&mut ActorContext<'_>) -> Step,
{
    fn step(&mut self, cx: &mut ActorContext<'_>) -> Step {
        self(cx)
    }
}
