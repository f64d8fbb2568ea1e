use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::Gate;

pin_project! {
    /// A fallible future that settles one slot of a [`Gate`] when it finishes.
    ///
    /// Created by [`Gate::track`]. The inner output is passed through
    /// untouched.
    #[must_use = "futures do nothing unless polled"]
    pub struct Tracked<F> {
        #[pin]
        inner: F,
        gate: Arc<Gate>,
    }
}

impl<F> Tracked<F> {
    pub(crate) fn new(inner: F, gate: Arc<Gate>) -> Self {
        Self { inner, gate }
    }
}

impl<F, T, E> Future for Tracked<F>
where
    F: Future<Output = Result<T, E>>,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let output = std::task::ready!(this.inner.poll(cx));
        match &output {
            Ok(_) => this.gate.complete(),
            Err(_) => this.gate.abandon(),
        }
        Poll::Ready(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ok_completes() {
        let gate = Arc::new(Gate::new("test"));
        gate.expect(1);
        let value = gate.track(async { Ok::<_, ()>(42) }).await;
        assert_eq!(value, Ok(42));
        assert_eq!(gate.counts(), (1, 1));
        assert!(gate.is_settled());
    }

    #[tokio::test]
    async fn test_err_abandons() {
        let gate = Arc::new(Gate::new("test"));
        gate.expect(2);
        let value = gate.track(async { Err::<(), _>("not found") }).await;
        assert_eq!(value, Err("not found"));
        assert_eq!(gate.counts(), (1, 0));
        assert!(!gate.is_settled());
    }

    #[tokio::test]
    async fn test_mixed_outcomes_open_the_gate_in_any_order() {
        let gate = Arc::new(Gate::new("test"));
        gate.expect(4);
        let futures = (0..4).map(|i| gate.track(async move { if i % 2 == 0 { Ok(i) } else { Err(i) } }));
        let results = futures::future::join_all(futures.rev()).await;
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
        assert_eq!(gate.counts(), (2, 2));
        gate.settled().await;
    }
}
