//! The atomic unit of dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use venue_core::{ExecutionContext, Fault, OperationKey, TimeConstraints, Value};

use crate::observer::ResultObserver;
use crate::venue::ExecutionVenue;

// ---------------------------------------------------------------------------
// ExecutionRequest
// ---------------------------------------------------------------------------

/// Everything an executable needs for one call. Owned, so the venue can
/// hand it to a spawned task.
pub struct ExecutionRequest {
    pub ctx: Arc<ExecutionContext>,
    pub key: OperationKey,
    pub args: Vec<Value>,
    /// Completion handle. Must be completed exactly once on every path.
    pub observer: ResultObserver,
    /// The owning venue, for recursive sub-dispatch. Nested calls inherit
    /// `constraints` unchanged so a chain cannot exceed the original
    /// caller's budget.
    pub venue: Arc<ExecutionVenue>,
    pub constraints: TimeConstraints,
}

// ---------------------------------------------------------------------------
// Executable
// ---------------------------------------------------------------------------

/// Capability tag exposed by a wrapping executable, letting infrastructure
/// code reach through layers of wrapping without type introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability(pub &'static str);

/// The dispatch-time unit performing an operation's work.
///
/// Implementations must eventually complete `req.observer` exactly once,
/// on every code path. Wrapping executables (interceptor-style
/// composition) expose their child via `wrapped()`.
#[async_trait]
pub trait Executable: Send + Sync {
    async fn execute(&self, req: ExecutionRequest);

    /// The child executable, for wrappers. Leaf executables return `None`.
    fn wrapped(&self) -> Option<&dyn Executable> {
        None
    }

    /// Capability tag of this layer, if it advertises one.
    fn capability(&self) -> Option<Capability> {
        None
    }
}

/// Depth-first search down the wrap chain for the first layer advertising
/// `capability`. Returns `None` when no layer matches.
#[must_use]
pub fn find_capability<'a>(
    root: &'a dyn Executable,
    capability: Capability,
) -> Option<&'a dyn Executable> {
    if root.capability() == Some(capability) {
        return Some(root);
    }
    root.wrapped()
        .and_then(|child| find_capability(child, capability))
}

// ---------------------------------------------------------------------------
// FnExecutable
// ---------------------------------------------------------------------------

/// Adapter for synchronous handlers, which most service operations are.
///
/// The handler's `Result` is classified into an `ExecutionResult` and the
/// observer completed, satisfying the exactly-once contract by
/// construction.
pub struct FnExecutable<F> {
    handler: F,
}

impl<F> FnExecutable<F>
where
    F: Fn(&ExecutionContext, &[Value]) -> Result<Value, Fault> + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> Executable for FnExecutable<F>
where
    F: Fn(&ExecutionContext, &[Value]) -> Result<Value, Fault> + Send + Sync,
{
    async fn execute(&self, req: ExecutionRequest) {
        let outcome = (self.handler)(&req.ctx, &req.args);
        req.observer.on_result(outcome.into());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use venue_core::{ExecutionResult, OperationType, ServiceVersion};

    use super::*;
    use crate::config::VenueConfig;
    use crate::observer::WaitingObserver;
    use crate::venue::ExecutionVenue;

    struct TaggedWrapper {
        tag: Capability,
        child: Arc<dyn Executable>,
    }

    #[async_trait]
    impl Executable for TaggedWrapper {
        async fn execute(&self, req: ExecutionRequest) {
            self.child.execute(req).await;
        }

        fn wrapped(&self) -> Option<&dyn Executable> {
            Some(&*self.child)
        }

        fn capability(&self) -> Option<Capability> {
            Some(self.tag)
        }
    }

    fn echo() -> Arc<dyn Executable> {
        Arc::new(FnExecutable::new(|_ctx, args| {
            Ok(args.first().cloned().unwrap_or(Value::Null))
        }))
    }

    fn request(observer: ResultObserver) -> ExecutionRequest {
        ExecutionRequest {
            ctx: Arc::new(ExecutionContext::new("t-exec")),
            key: OperationKey::new(
                "Baseline",
                ServiceVersion::new(2, 0),
                "testSimpleGet",
                OperationType::Request,
            ),
            args: vec![Value::from("10")],
            observer,
            venue: ExecutionVenue::new(VenueConfig::default()),
            constraints: TimeConstraints::unconstrained(),
        }
    }

    #[tokio::test]
    async fn fn_executable_completes_observer_once() {
        let (observer, waiter) = WaitingObserver::pair("test");
        echo().execute(request(observer)).await;
        assert_eq!(waiter.wait(100).await.unwrap(), ExecutionResult::success("10"));
    }

    #[tokio::test]
    async fn wrapper_forwards_to_child() {
        let wrapper = TaggedWrapper {
            tag: Capability("trace"),
            child: echo(),
        };
        let (observer, waiter) = WaitingObserver::pair("test");
        wrapper.execute(request(observer)).await;
        assert_eq!(waiter.wait(100).await.unwrap(), ExecutionResult::success("10"));
    }

    #[test]
    fn find_capability_walks_the_chain() {
        let inner = Arc::new(TaggedWrapper {
            tag: Capability("transport"),
            child: echo(),
        });
        let outer = TaggedWrapper {
            tag: Capability("trace"),
            child: inner,
        };

        assert!(find_capability(&outer, Capability("trace")).is_some());
        let found = find_capability(&outer, Capability("transport")).expect("inner layer");
        assert_eq!(found.capability(), Some(Capability("transport")));
        assert!(find_capability(&outer, Capability("absent")).is_none());
    }

    #[test]
    fn first_match_wins_on_duplicate_tags() {
        let inner = Arc::new(TaggedWrapper {
            tag: Capability("trace"),
            child: echo(),
        });
        let outer = TaggedWrapper {
            tag: Capability("trace"),
            child: inner,
        };
        let found = find_capability(&outer, Capability("trace")).expect("outermost layer");
        // Outermost layer matches first in depth-first order.
        let found_ptr = (found as *const dyn Executable).cast::<()>();
        let outer_ptr = (&outer as &dyn Executable as *const dyn Executable).cast::<()>();
        assert_eq!(found_ptr, outer_ptr);
    }
}
