use futures::future::FusedFuture;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use crate::Tracked;

#[derive(Default)]
struct State {
    expected: u32,
    done: u32,
    wakers: Vec<Waker>,
}
impl State {
    fn is_settled(&self) -> bool {
        self.done >= self.expected
    }
}

/// An expected/done counter pair that wakes its waiters once every expected
/// operation has settled.
///
/// Counters only ever grow, with one exception: [`abandon()`](Self::abandon)
/// takes a failed operation back out of the expected count.
pub struct Gate {
    name: &'static str,
    state: Mutex<State>,
}

impl Gate {
    pub fn new(name: &'static str) -> Self {
        Self { name, state: Mutex::new(State::default()) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    // Every critical section is a couple of integer updates; a panic while
    // holding the lock can't leave the counters half-written.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `n` more operations that must settle before the gate opens.
    pub fn expect(&self, n: u32) {
        let mut state = self.lock();
        state.expected = state.expected.saturating_add(n);
    }

    /// Mark one operation as successfully settled.
    pub fn complete(&self) {
        let wakers = {
            let mut state = self.lock();
            state.done = state.done.saturating_add(1);
            Self::drain_if_settled(&mut state)
        };
        wakers.into_iter().for_each(Waker::wake);
    }

    /// Mark one operation as failed by removing it from the expected count.
    pub fn abandon(&self) {
        let wakers = {
            let mut state = self.lock();
            state.expected = state.expected.saturating_sub(1);
            Self::drain_if_settled(&mut state)
        };
        wakers.into_iter().for_each(Waker::wake);
    }

    fn drain_if_settled(state: &mut State) -> Vec<Waker> {
        match state.is_settled() {
            true => std::mem::take(&mut state.wakers),
            false => Vec::new(),
        }
    }

    /// Current `(expected, done)` counters.
    pub fn counts(&self) -> (u32, u32) {
        let state = self.lock();
        (state.expected, state.done)
    }

    pub fn is_settled(&self) -> bool {
        self.lock().is_settled()
    }

    /// Resolves once `done >= expected`. Resolves immediately for a gate
    /// that never expected anything.
    pub fn settled(&self) -> Settled<'_> {
        Settled { gate: self, finished: false }
    }

    /// Wrap a fallible future so that its outcome settles one slot of this
    /// gate: `Ok` completes, `Err` abandons.
    ///
    /// The slot itself must already have been registered with
    /// [`expect()`](Self::expect).
    pub fn track<F, T, E>(self: &Arc<Self>, future: F) -> Tracked<F>
    where
        F: Future<Output = Result<T, E>>,
    {
        Tracked::new(future, Arc::clone(self))
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (expected, done) = self.counts();
        f.debug_struct("Gate").field("name", &self.name).field("expected", &expected).field("done", &done).finish()
    }
}

/// Future returned by [`Gate::settled`].
#[must_use = "futures do nothing unless polled"]
pub struct Settled<'a> {
    gate: &'a Gate,
    finished: bool,
}

impl Future for Settled<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.gate.lock();
        if state.is_settled() {
            drop(state);
            self.finished = true;
            return Poll::Ready(());
        }
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl FusedFuture for Settled<'_> {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn test_empty_gate_is_settled() {
        let gate = Gate::new("empty");
        assert!(gate.is_settled());
        gate.settled().await;
    }

    #[rstest]
    #[case(3, 3, 0, true)]
    #[case(3, 2, 0, false)]
    #[case(3, 2, 1, true)]
    #[case(3, 0, 3, true)]
    #[case(1, 0, 0, false)]
    fn test_predicate(#[case] expected: u32, #[case] completed: u32, #[case] abandoned: u32, #[case] open: bool) {
        let gate = Gate::new("test");
        gate.expect(expected);
        (0..completed).for_each(|_| gate.complete());
        (0..abandoned).for_each(|_| gate.abandon());
        assert_eq!(gate.is_settled(), open);
        assert_eq!(gate.counts(), (expected - abandoned, completed));
    }

    #[test]
    fn test_abandon_saturates() {
        let gate = Gate::new("test");
        gate.abandon();
        assert_eq!(gate.counts(), (0, 0));
    }

    #[tokio::test]
    async fn test_waiter_wakes_on_last_completion() {
        let gate = Arc::new(Gate::new("css"));
        gate.expect(2);
        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.settled().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        gate.complete();
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        gate.abandon();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_settled_is_fused() {
        let gate = Gate::new("test");
        let mut settled = gate.settled();
        assert!(!settled.is_terminated());
        (&mut settled).await;
        assert!(settled.is_terminated());
    }
}
