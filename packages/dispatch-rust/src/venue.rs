//! The execution venue: registry plus dispatcher.
//!
//! Dispatch never lets an error escape its boundary: lookup misses,
//! validation failures, interceptor aborts, timeouts, and abandoned
//! executions all arrive at the caller's observer as structured faults.
//! Batch transports rely on this to keep processing sibling calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use venue_core::{
    ExecutionContext, ExecutionResult, Fault, FaultCode, OperationDefinition, OperationKey,
    ResultTag, TimeConstraints, Value,
};

use crate::config::VenueConfig;
use crate::executable::{Executable, ExecutionRequest};
use crate::interceptor::{
    ExecutionPostProcessor, ExecutionPreProcessor, InjectionPoint, InterceptorChains,
    InterceptorResult, PostProcessResult, ProcessorRegistration,
};
use crate::observer::ResultObserver;
use crate::recorder::{ExecutionTimingRecorder, NullRecorder};
use crate::registry::{OperationRegistry, RegisteredOperation, RegistrationError};

// ---------------------------------------------------------------------------
// ExecutionVenue
// ---------------------------------------------------------------------------

/// Registry + dispatcher binding operation keys to executables.
///
/// Constructed once at process start; operations and interceptors are
/// registered during startup, then the venue serves concurrent dispatches
/// with lock-free lookups for the rest of its life.
pub struct ExecutionVenue {
    config: VenueConfig,
    registry: OperationRegistry,
    chains: InterceptorChains,
    /// Accounts calls that cannot be attributed to a registered operation
    /// (unknown keys have no per-operation recorder). Set at startup,
    /// cloned out per miss.
    unattributed: RwLock<Arc<dyn ExecutionTimingRecorder>>,
}

impl ExecutionVenue {
    #[must_use]
    pub fn new(config: VenueConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: OperationRegistry::new(),
            chains: InterceptorChains::new(),
            unattributed: RwLock::new(Arc::new(NullRecorder)),
        })
    }

    #[must_use]
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Bind an operation under `key`.
    ///
    /// # Errors
    ///
    /// Fails fast at startup on duplicate keys or wire paths; see
    /// [`RegistrationError`].
    pub fn register_operation(
        &self,
        key: OperationKey,
        definition: OperationDefinition,
        executable: Arc<dyn Executable>,
        recorder: Arc<dyn ExecutionTimingRecorder>,
        max_execution_time_ms: u64,
    ) -> Result<(), RegistrationError> {
        tracing::debug!(operation = %key, max_execution_time_ms, "registering operation");
        self.registry.register(RegisteredOperation {
            key,
            definition,
            executable,
            recorder,
            max_execution_time_ms,
        })
    }

    pub fn register_pre_processors(
        &self,
        registration: &ProcessorRegistration<dyn ExecutionPreProcessor>,
    ) {
        self.chains.register_pre(registration);
    }

    pub fn register_post_processors(
        &self,
        registration: &ProcessorRegistration<dyn ExecutionPostProcessor>,
    ) {
        self.chains.register_post(registration);
    }

    /// Recorder for calls with no registered operation to attribute to.
    pub fn set_unattributed_recorder(&self, recorder: Arc<dyn ExecutionTimingRecorder>) {
        *self.unattributed.write() = recorder;
    }

    // -----------------------------------------------------------------------
    // Dispatch entry points
    // -----------------------------------------------------------------------

    /// Dispatch on the caller's task. Completes `observer` exactly once,
    /// then returns; never panics across the dispatch boundary.
    pub async fn execute(
        self: &Arc<Self>,
        ctx: Arc<ExecutionContext>,
        key: OperationKey,
        args: Vec<Value>,
        observer: ResultObserver,
        constraints: TimeConstraints,
    ) {
        self.clone()
            .dispatch(ctx, key, args, observer, constraints, false)
            .await;
    }

    /// Dispatch via the runtime's executor.
    ///
    /// Pre-processors requiring the pre-queue injection point run on the
    /// caller's task before the hand-off; the rest of the dispatch runs on
    /// a spawned task and this call returns as soon as it is queued.
    pub async fn execute_spawned(
        self: &Arc<Self>,
        ctx: Arc<ExecutionContext>,
        key: OperationKey,
        args: Vec<Value>,
        observer: ResultObserver,
        constraints: TimeConstraints,
    ) {
        let started = Instant::now();
        let Some(op) = self.resolve(&ctx, &key, &args, &observer, started).await else {
            return;
        };

        if let Some(forced) = self
            .run_pre_chain(&ctx, &key, &args, InjectionPoint::PreQueue, true)
            .await
        {
            self.finish(&ctx, &key, forced, started, &op.recorder, &observer)
                .await;
            return;
        }

        let venue = self.clone();
        tokio::spawn(async move {
            venue
                .dispatch_resolved(op, ctx, key, args, observer, constraints, true, started)
                .await;
        });
    }

    // -----------------------------------------------------------------------
    // Dispatch internals
    // -----------------------------------------------------------------------

    async fn dispatch(
        self: Arc<Self>,
        ctx: Arc<ExecutionContext>,
        key: OperationKey,
        args: Vec<Value>,
        observer: ResultObserver,
        constraints: TimeConstraints,
        queued: bool,
    ) {
        let started = Instant::now();
        let Some(op) = self.resolve(&ctx, &key, &args, &observer, started).await else {
            return;
        };
        self.dispatch_resolved(op, ctx, key, args, observer, constraints, queued, started)
            .await;
    }

    /// Resolve the key and validate arguments. On failure the fault is
    /// delivered and `None` returned.
    async fn resolve(
        self: &Arc<Self>,
        ctx: &Arc<ExecutionContext>,
        key: &OperationKey,
        args: &[Value],
        observer: &ResultObserver,
        started: Instant,
    ) -> Option<Arc<RegisteredOperation>> {
        let Some(op) = self.registry.lookup(key) else {
            let fault = Fault::no_such_operation(&key.to_string());
            let recorder = self.unattributed.read().clone();
            self.finish(
                ctx,
                key,
                ExecutionResult::Fault(fault),
                started,
                &recorder,
                observer,
            )
            .await;
            return None;
        };

        if let Err(fault) = op.definition.validate_args(args) {
            self.finish(
                ctx,
                key,
                ExecutionResult::Fault(fault),
                started,
                &op.recorder,
                observer,
            )
            .await;
            return None;
        }
        Some(op)
    }

    /// The post-resolution dispatch: pre chain, target, deadline race,
    /// post chain, accounting, delivery.
    #[allow(clippy::too_many_arguments)]
    async fn dispatch_resolved(
        self: &Arc<Self>,
        op: Arc<RegisteredOperation>,
        ctx: Arc<ExecutionContext>,
        key: OperationKey,
        args: Vec<Value>,
        observer: ResultObserver,
        constraints: TimeConstraints,
        queued: bool,
        started: Instant,
    ) {
        if let Some(forced) = self
            .run_pre_chain(&ctx, &key, &args, InjectionPoint::PreExecute, queued)
            .await
        {
            self.finish(&ctx, &key, forced, started, &op.recorder, &observer)
                .await;
            return;
        }

        // An exhausted budget (inherited deadline already passed) fails the
        // call up front; the executable is never invoked.
        let budget = effective_budget_ms(op.max_execution_time_ms, constraints);
        if budget == Some(0) {
            tracing::warn!(operation = %key, "deadline expired before execution");
            let fault = Fault::timed_out(&key.to_string(), 0);
            self.finish(
                &ctx,
                &key,
                ExecutionResult::Fault(fault),
                started,
                &op.recorder,
                &observer,
            )
            .await;
            return;
        }

        let (internal, rx) = ResultObserver::channel(key.to_string());
        let request = ExecutionRequest {
            ctx: ctx.clone(),
            key: key.clone(),
            args,
            observer: internal,
            venue: self.clone(),
            // Deadlines are inherited, never reset per hop: a chain of
            // nested calls cannot exceed the original caller's budget.
            constraints,
        };
        let executable = op.executable.clone();
        // The executable runs as its own task: exceeding the budget below
        // reports a timeout but does not abort the work in flight. A late
        // result lands on a closed channel and is discarded.
        tokio::spawn(async move { executable.execute(request).await });

        let outcome = match budget {
            None => rx.await.map_err(|_closed| ()),
            Some(budget_ms) => {
                match tokio::time::timeout(Duration::from_millis(budget_ms), rx).await {
                    Ok(delivered) => delivered.map_err(|_closed| ()),
                    Err(_elapsed) => {
                        tracing::warn!(operation = %key, budget_ms, "execution budget exceeded");
                        let fault = Fault::timed_out(&key.to_string(), budget_ms);
                        self.finish(
                            &ctx,
                            &key,
                            ExecutionResult::Fault(fault),
                            started,
                            &op.recorder,
                            &observer,
                        )
                        .await;
                        return;
                    }
                }
            }
        };

        let result = outcome.unwrap_or_else(|()| {
            // Every observer clone was dropped without a result. Contain
            // the broken executable instead of leaking the caller.
            tracing::error!(operation = %key, "executable abandoned its observer");
            ExecutionResult::Fault(Fault::new(
                FaultCode::InternalError,
                "ResultNotDelivered",
                "executable completed without delivering a result",
            ))
        });

        self.finish(&ctx, &key, result, started, &op.recorder, &observer)
            .await;
    }

    /// Run pre-processors eligible at `point`. A forced termination
    /// returns the result to deliver; `None` means proceed.
    async fn run_pre_chain(
        &self,
        ctx: &ExecutionContext,
        key: &OperationKey,
        args: &[Value],
        point: InjectionPoint,
        queued: bool,
    ) -> Option<ExecutionResult> {
        for processor in self.chains.pre_chain().iter() {
            if !processor.requirement().runs_at(point, queued) {
                continue;
            }
            match processor.invoke(ctx, key, args).await {
                InterceptorResult::Continue => {}
                InterceptorResult::ForceOnException(fault) => {
                    tracing::debug!(
                        operation = %key,
                        processor = processor.name(),
                        "pre-processor forced exception path"
                    );
                    return Some(ExecutionResult::Fault(fault));
                }
                InterceptorResult::ForceOnResult(result) => {
                    tracing::debug!(
                        operation = %key,
                        processor = processor.name(),
                        "pre-processor short-circuited execution"
                    );
                    return Some(result);
                }
            }
        }
        None
    }

    /// Terminal path for every dispatch: post chain, accounting, delivery.
    async fn finish(
        &self,
        ctx: &ExecutionContext,
        key: &OperationKey,
        mut result: ExecutionResult,
        started: Instant,
        recorder: &Arc<dyn ExecutionTimingRecorder>,
        observer: &ResultObserver,
    ) {
        for processor in self.chains.post_chain().iter() {
            match processor.invoke(ctx, key, &result).await {
                PostProcessResult::Unchanged => {}
                PostProcessResult::Replace(replacement) => {
                    let before = result.tag();
                    let after = replacement.tag();
                    if before == ResultTag::Fault && after == ResultTag::Success {
                        tracing::info!(
                            operation = %key,
                            processor = processor.name(),
                            "post-processor recovered fault to success"
                        );
                    } else if before != after {
                        tracing::warn!(
                            operation = %key,
                            processor = processor.name(),
                            ?before,
                            ?after,
                            "post-processor changed result tag"
                        );
                    }
                    result = replacement;
                }
            }
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        if result.is_fault() {
            recorder.record_failure(elapsed_ms);
        } else {
            recorder.record_call(elapsed_ms);
        }

        let outcome = match result.tag() {
            ResultTag::Success => "ok",
            ResultTag::Fault => "fault",
            ResultTag::Subscription => "subscription",
        };
        #[allow(clippy::cast_precision_loss)]
        let slow_warn_ms = self.config.slow_call_warn_ms as f64;
        if slow_warn_ms > 0.0 && elapsed_ms > slow_warn_ms {
            tracing::warn!(
                venue = %self.config.name,
                operation = %key,
                elapsed_ms,
                "slow operation"
            );
        }
        tracing::debug!(
            venue = %self.config.name,
            operation = %key,
            trace_id = %ctx.trace_id,
            outcome,
            elapsed_ms,
            "dispatch complete"
        );

        observer.on_result(result);
    }
}

/// Combine the per-operation bound (0 = unbounded) with the inherited
/// deadline. An already-expired constraint yields a zero budget, so the
/// call fails as timed out instead of silently proceeding.
fn effective_budget_ms(max_execution_time_ms: u64, constraints: TimeConstraints) -> Option<u64> {
    let inherited = constraints
        .remaining_ms()
        .map(|ms| u64::try_from(ms.max(0)).unwrap_or(0));
    match (max_execution_time_ms, inherited) {
        (0, None) => None,
        (0, Some(remaining)) => Some(remaining),
        (bound, None) => Some(bound),
        (bound, Some(remaining)) => Some(bound.min(remaining)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
