//! Pre/post execution interceptors.
//!
//! Cross-cutting logic that runs immediately around the target executable.
//! Pre-processors can short-circuit the dispatch entirely; post-processors
//! can rewrite the outgoing result. Chains are mutable during the
//! configuration phase and iterated lock-free during traffic.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use parking_lot::Mutex;
use venue_core::{ExecutionContext, ExecutionResult, Fault, OperationKey, Value};

// ---------------------------------------------------------------------------
// ExecutionRequirement
// ---------------------------------------------------------------------------

/// Where in the dispatch an interceptor wants to run when more than one
/// injection point exists (i.e. when dispatch crosses an executor
/// boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionRequirement {
    /// Framework picks one optimal point: the earliest available.
    ExactlyOnce,
    /// Before the call enters any worker queue.
    PreQueue,
    /// Immediately before the target executable is invoked.
    PreExecute,
    /// At every eligible point. For idempotent, cheap interceptors such as
    /// trace-start.
    EveryOpportunity,
}

/// The two injection points a dispatch can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPoint {
    /// Before handing the call to an executor.
    PreQueue,
    /// Immediately before invoking the executable.
    PreExecute,
}

impl ExecutionRequirement {
    /// Whether an interceptor with this requirement runs at `point`.
    ///
    /// `queued` says whether the dispatch crosses an executor boundary at
    /// all; when it does not, `PreExecute` is the only point offered and
    /// every requirement collapses onto it.
    #[must_use]
    pub fn runs_at(self, point: InjectionPoint, queued: bool) -> bool {
        match self {
            ExecutionRequirement::EveryOpportunity => true,
            ExecutionRequirement::PreExecute => point == InjectionPoint::PreExecute,
            ExecutionRequirement::ExactlyOnce | ExecutionRequirement::PreQueue => {
                if queued {
                    point == InjectionPoint::PreQueue
                } else {
                    point == InjectionPoint::PreExecute
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pre-processors
// ---------------------------------------------------------------------------

/// Outcome of one pre-processor invocation.
pub enum InterceptorResult {
    /// Proceed to the next interceptor, then the target.
    Continue,
    /// Abort the remaining pre-chain and deliver this fault. Used when the
    /// interceptor itself detects an unrecoverable condition, e.g. invalid
    /// credentials.
    ForceOnException(Fault),
    /// Abort the remaining pre-chain and deliver this result without
    /// invoking the target. Used for cached or short-circuited responses.
    ForceOnResult(ExecutionResult),
}

/// Cross-cutting logic run before the target executable.
///
/// Failures are reported through `ForceOnException`, never by panicking:
/// interceptors run on the dispatching task itself (unlike executables,
/// which are isolated in their own task), so a panic here is a bug that
/// unwinds out of `execute`.
#[async_trait]
pub trait ExecutionPreProcessor: Send + Sync {
    fn name(&self) -> &str;

    fn requirement(&self) -> ExecutionRequirement {
        ExecutionRequirement::ExactlyOnce
    }

    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        key: &OperationKey,
        args: &[Value],
    ) -> InterceptorResult;
}

// ---------------------------------------------------------------------------
// Post-processors
// ---------------------------------------------------------------------------

/// Outcome of one post-processor invocation.
pub enum PostProcessResult {
    /// Leave the result as-is.
    Unchanged,
    /// Replace the outgoing result. Tag changes from Fault to Success are
    /// treated as explicit recovery and logged by the dispatcher.
    Replace(ExecutionResult),
}

/// Cross-cutting logic run after a result is produced, before it reaches
/// the caller's observer.
///
/// Same panic policy as [`ExecutionPreProcessor`]: replace the result to
/// signal a failure; a panic unwinds out of the dispatch.
#[async_trait]
pub trait ExecutionPostProcessor: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        key: &OperationKey,
        result: &ExecutionResult,
    ) -> PostProcessResult;
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Shared, configuration-time-mutable list of processors that several
/// registration helpers contribute to before being spliced into a chain.
pub struct SharedProcessorList<P: ?Sized> {
    items: Arc<Mutex<Vec<Arc<P>>>>,
}

impl<P: ?Sized> Default for SharedProcessorList<P> {
    fn default() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<P: ?Sized> Clone for SharedProcessorList<P> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<P: ?Sized> SharedProcessorList<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, processor: Arc<P>) {
        self.items.lock().push(processor);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<P>> {
        self.items.lock().clone()
    }
}

/// One registration input: an optional single processor, an explicit list,
/// and an optional shared reference list, spliced in that order
/// (reference first, then single, then list).
pub struct ProcessorRegistration<P: ?Sized> {
    pub reference: Option<SharedProcessorList<P>>,
    pub single: Option<Arc<P>>,
    pub list: Vec<Arc<P>>,
}

impl<P: ?Sized> Default for ProcessorRegistration<P> {
    fn default() -> Self {
        Self {
            reference: None,
            single: None,
            list: Vec::new(),
        }
    }
}

impl<P: ?Sized> ProcessorRegistration<P> {
    #[must_use]
    pub fn single(processor: Arc<P>) -> Self {
        Self {
            single: Some(processor),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn list(list: Vec<Arc<P>>) -> Self {
        Self {
            list,
            ..Self::default()
        }
    }

    fn merged(&self) -> Vec<Arc<P>> {
        let mut out = self
            .reference
            .as_ref()
            .map(SharedProcessorList::snapshot)
            .unwrap_or_default();
        out.extend(self.single.iter().cloned());
        out.extend(self.list.iter().cloned());
        out
    }
}

// ---------------------------------------------------------------------------
// InterceptorChains
// ---------------------------------------------------------------------------

/// The venue's pre and post chains.
///
/// Pre-processors are appended in registration order; post-processors are
/// prepended, so the most recently registered post-processor runs first
/// (LIFO unwind, symmetric with a call stack).
pub struct InterceptorChains {
    pre: ArcSwap<Vec<Arc<dyn ExecutionPreProcessor>>>,
    post: ArcSwap<Vec<Arc<dyn ExecutionPostProcessor>>>,
}

impl Default for InterceptorChains {
    fn default() -> Self {
        Self {
            pre: ArcSwap::from_pointee(Vec::new()),
            post: ArcSwap::from_pointee(Vec::new()),
        }
    }
}

impl InterceptorChains {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pre(&self, registration: &ProcessorRegistration<dyn ExecutionPreProcessor>) {
        let added = registration.merged();
        self.pre.rcu(|current| {
            let mut next = current.as_ref().clone();
            next.extend(added.iter().cloned());
            next
        });
    }

    pub fn register_post(&self, registration: &ProcessorRegistration<dyn ExecutionPostProcessor>) {
        let added = registration.merged();
        self.post.rcu(|current| {
            let mut next = added.clone();
            next.extend(current.iter().cloned());
            next
        });
    }

    /// Lock-free snapshot of the pre chain, in execution order.
    #[must_use]
    pub fn pre_chain(&self) -> Arc<Vec<Arc<dyn ExecutionPreProcessor>>> {
        self.pre.load_full()
    }

    /// Lock-free snapshot of the post chain, in execution order.
    #[must_use]
    pub fn post_chain(&self) -> Arc<Vec<Arc<dyn ExecutionPostProcessor>>> {
        self.post.load_full()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedPre(&'static str);

    #[async_trait]
    impl ExecutionPreProcessor for NamedPre {
        fn name(&self) -> &str {
            self.0
        }

        async fn invoke(
            &self,
            _ctx: &ExecutionContext,
            _key: &OperationKey,
            _args: &[Value],
        ) -> InterceptorResult {
            InterceptorResult::Continue
        }
    }

    struct NamedPost(&'static str);

    #[async_trait]
    impl ExecutionPostProcessor for NamedPost {
        fn name(&self) -> &str {
            self.0
        }

        async fn invoke(
            &self,
            _ctx: &ExecutionContext,
            _key: &OperationKey,
            _result: &ExecutionResult,
        ) -> PostProcessResult {
            PostProcessResult::Unchanged
        }
    }

    fn pre_names(chains: &InterceptorChains) -> Vec<String> {
        chains
            .pre_chain()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    fn post_names(chains: &InterceptorChains) -> Vec<String> {
        chains
            .post_chain()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    #[test]
    fn pre_processors_append_in_registration_order() {
        let chains = InterceptorChains::new();
        chains.register_pre(&ProcessorRegistration::single(Arc::new(NamedPre("A"))));
        chains.register_pre(&ProcessorRegistration::single(Arc::new(NamedPre("B"))));
        assert_eq!(pre_names(&chains), ["A", "B"]);
    }

    #[test]
    fn post_processors_prepend_for_lifo_unwind() {
        let chains = InterceptorChains::new();
        chains.register_post(&ProcessorRegistration::single(Arc::new(NamedPost("C"))));
        chains.register_post(&ProcessorRegistration::single(Arc::new(NamedPost("D"))));
        // Most recently registered runs first.
        assert_eq!(post_names(&chains), ["D", "C"]);
    }

    #[test]
    fn registration_splices_reference_single_and_list() {
        let reference: SharedProcessorList<dyn ExecutionPreProcessor> = SharedProcessorList::new();
        reference.push(Arc::new(NamedPre("ref-1")));
        reference.push(Arc::new(NamedPre("ref-2")));

        let chains = InterceptorChains::new();
        chains.register_pre(&ProcessorRegistration {
            reference: Some(reference),
            single: Some(Arc::new(NamedPre("one"))),
            list: vec![Arc::new(NamedPre("list-1")), Arc::new(NamedPre("list-2"))],
        });

        assert_eq!(
            pre_names(&chains),
            ["ref-1", "ref-2", "one", "list-1", "list-2"]
        );
    }

    #[test]
    fn requirement_routing_with_queue_boundary() {
        use ExecutionRequirement as R;
        use InjectionPoint as P;

        assert!(R::PreQueue.runs_at(P::PreQueue, true));
        assert!(!R::PreQueue.runs_at(P::PreExecute, true));
        assert!(R::ExactlyOnce.runs_at(P::PreQueue, true));
        assert!(!R::ExactlyOnce.runs_at(P::PreExecute, true));
        assert!(!R::PreExecute.runs_at(P::PreQueue, true));
        assert!(R::PreExecute.runs_at(P::PreExecute, true));
        assert!(R::EveryOpportunity.runs_at(P::PreQueue, true));
        assert!(R::EveryOpportunity.runs_at(P::PreExecute, true));
    }

    #[test]
    fn requirement_routing_collapses_without_queue() {
        use ExecutionRequirement as R;
        use InjectionPoint as P;

        for requirement in [R::ExactlyOnce, R::PreQueue, R::PreExecute, R::EveryOpportunity] {
            assert!(requirement.runs_at(P::PreExecute, false));
        }
    }
}
