//! One-shot result delivery.
//!
//! `ResultObserver` is the completion handle handed to every executable.
//! The first `on_result` call wins; later calls are discarded, which is
//! what makes a late real result harmless after the dispatcher has already
//! delivered a synthesized timeout fault.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use venue_core::{ExecutionResult, TimeConstraints};

// ---------------------------------------------------------------------------
// ResultObserver
// ---------------------------------------------------------------------------

type CompletionFn = Box<dyn FnOnce(ExecutionResult) + Send>;

struct ObserverInner {
    /// Operation identity, carried only for log context.
    operation: String,
    slot: Mutex<Option<CompletionFn>>,
}

/// Completion handle that accepts exactly one result.
///
/// Clones share the same slot, so exactly one `on_result` across all
/// clones takes effect. If every clone is dropped without a result, the
/// completion closure is dropped with them; channel-backed observers
/// surface that to the waiting side as abandonment.
#[derive(Clone)]
pub struct ResultObserver {
    inner: Arc<ObserverInner>,
}

impl ResultObserver {
    /// Observer invoking `on_result` on first completion.
    pub fn new(
        operation: impl Into<String>,
        on_result: impl FnOnce(ExecutionResult) + Send + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(ObserverInner {
                operation: operation.into(),
                slot: Mutex::new(Some(Box::new(on_result))),
            }),
        }
    }

    /// Channel-backed observer pair: completions arrive on the receiver.
    ///
    /// Dropping every observer clone without completing closes the channel,
    /// so the receiving side can distinguish "abandoned" from "pending".
    #[must_use]
    pub fn channel(operation: impl Into<String>) -> (Self, oneshot::Receiver<ExecutionResult>) {
        let (tx, rx) = oneshot::channel();
        let observer = Self::new(operation, move |result| {
            // Receiver may be gone (deadline already delivered); the result
            // is simply discarded.
            let _ = tx.send(result);
        });
        (observer, rx)
    }

    /// Deliver the result. First call wins; duplicates are no-ops.
    pub fn on_result(&self, result: ExecutionResult) {
        let completion = self.inner.slot.lock().take();
        match completion {
            Some(complete) => complete(result),
            None => {
                tracing::debug!(
                    operation = %self.inner.operation,
                    "duplicate result delivery discarded"
                );
            }
        }
    }

    /// Whether a result has already been accepted.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.inner.slot.lock().is_none()
    }
}

// ---------------------------------------------------------------------------
// WaitingObserver
// ---------------------------------------------------------------------------

/// Why a `WaitingObserver` wait ended without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("timed out waiting for execution result")]
    TimedOut,
    #[error("execution abandoned without delivering a result")]
    Abandoned,
}

/// Blocking facade over an async execution.
///
/// Used by callers that explicitly want to await a dispatch in place; it
/// suspends only the calling task, bounded either by an explicit timeout or
/// by the call's inherited `TimeConstraints`.
pub struct WaitingObserver {
    rx: oneshot::Receiver<ExecutionResult>,
}

impl WaitingObserver {
    /// Paired (observer, waiter) for one execution.
    #[must_use]
    pub fn pair(operation: impl Into<String>) -> (ResultObserver, Self) {
        let (observer, rx) = ResultObserver::channel(operation);
        (observer, Self { rx })
    }

    /// Await the result with a fixed millisecond bound.
    ///
    /// # Errors
    ///
    /// `TimedOut` if no result arrives in time, `Abandoned` if every
    /// observer clone was dropped without completing.
    pub async fn wait(self, timeout_ms: u64) -> Result<ExecutionResult, WaitError> {
        let duration = std::time::Duration::from_millis(timeout_ms);
        match tokio::time::timeout(duration, self.rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_closed)) => Err(WaitError::Abandoned),
            Err(_elapsed) => Err(WaitError::TimedOut),
        }
    }

    /// Await the result bounded by the call's time constraints.
    ///
    /// Unconstrained waits indefinitely; an already-expired constraint
    /// still accepts a result that is ready immediately.
    ///
    /// # Errors
    ///
    /// Same as [`WaitingObserver::wait`].
    pub async fn wait_constrained(
        self,
        constraints: TimeConstraints,
    ) -> Result<ExecutionResult, WaitError> {
        match constraints.remaining_ms() {
            None => self.rx.await.map_err(|_closed| WaitError::Abandoned),
            Some(ms) => self.wait(ms.max(0).unsigned_abs()).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use venue_core::Value;

    use super::*;

    #[test]
    fn first_delivery_wins() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let observer = ResultObserver::new("test", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        observer.on_result(ExecutionResult::success("a"));
        observer.on_result(ExecutionResult::success("b"));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(observer.completed());
    }

    #[test]
    fn clones_share_the_slot() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let observer = ResultObserver::new("test", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let clone = observer.clone();

        clone.on_result(ExecutionResult::void());
        observer.on_result(ExecutionResult::void());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn waiting_observer_receives_result() {
        let (observer, waiter) = WaitingObserver::pair("test");
        tokio::spawn(async move {
            observer.on_result(ExecutionResult::success(Value::from("10")));
        });
        let result = waiter.wait(1_000).await.unwrap();
        assert_eq!(result, ExecutionResult::success("10"));
    }

    #[tokio::test]
    async fn waiting_observer_times_out() {
        let (observer, waiter) = WaitingObserver::pair("test");
        let err = waiter.wait(20).await.unwrap_err();
        assert_eq!(err, WaitError::TimedOut);
        // Late delivery is a silent no-op.
        observer.on_result(ExecutionResult::void());
    }

    #[tokio::test]
    async fn dropped_observer_reports_abandoned() {
        let (observer, waiter) = WaitingObserver::pair("test");
        drop(observer);
        let err = waiter.wait(1_000).await.unwrap_err();
        assert_eq!(err, WaitError::Abandoned);
    }

    #[tokio::test]
    async fn unconstrained_wait_completes_on_delivery() {
        let (observer, waiter) = WaitingObserver::pair("test");
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            observer.on_result(ExecutionResult::void());
        });
        let result = waiter
            .wait_constrained(TimeConstraints::unconstrained())
            .await
            .unwrap();
        assert_eq!(result, ExecutionResult::void());
    }

    #[tokio::test]
    async fn expired_constraint_still_accepts_ready_result() {
        let (observer, waiter) = WaitingObserver::pair("test");
        observer.on_result(ExecutionResult::success("early"));
        let constraints = TimeConstraints::rebase(
            std::time::Instant::now() - std::time::Duration::from_secs(5),
            100,
        );
        let result = waiter.wait_constrained(constraints).await.unwrap();
        assert_eq!(result, ExecutionResult::success("early"));
    }
}
