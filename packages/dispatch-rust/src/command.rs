//! Transport-facing inbound contract.
//!
//! Protocol adapters (HTTP, socket framing, batch JSON-RPC) reduce a wire
//! request to an `ExecutionCommand` and wire the observer back into their
//! response path. Everything protocol-specific stays on their side.

use std::sync::Arc;

use venue_core::{ExecutionContext, ExecutionResult, Fault, OperationKey, TimeConstraints, Value};

use crate::observer::ResultObserver;
use crate::registry::OperationRegistry;
use crate::venue::ExecutionVenue;

/// One resolved call: operation key, arguments, deadline, and the
/// completion handle the transport listens on.
pub struct ExecutionCommand {
    pub key: OperationKey,
    pub args: Vec<Value>,
    pub constraints: TimeConstraints,
    pub observer: ResultObserver,
}

impl ExecutionCommand {
    #[must_use]
    pub fn new(
        key: OperationKey,
        args: Vec<Value>,
        constraints: TimeConstraints,
        observer: ResultObserver,
    ) -> Self {
        Self {
            key,
            args,
            constraints,
            observer,
        }
    }

    /// Resolve a wire path into a command.
    ///
    /// On an unknown path the "method not found" fault is delivered through
    /// `observer` and `None` returned, so a batch transport keeps
    /// processing sibling calls without exception-driven control flow.
    pub fn resolve(
        registry: &OperationRegistry,
        path: &str,
        args: Vec<Value>,
        constraints: TimeConstraints,
        observer: ResultObserver,
    ) -> Option<Self> {
        match registry.resolve_path(path) {
            Some(key) => Some(Self::new(key, args, constraints, observer)),
            None => {
                observer.on_result(ExecutionResult::Fault(Fault::no_such_operation(path)));
                None
            }
        }
    }
}

impl ExecutionVenue {
    /// Dispatch a resolved command on the caller's task.
    pub async fn execute_command(
        self: &Arc<Self>,
        ctx: Arc<ExecutionContext>,
        command: ExecutionCommand,
    ) {
        let ExecutionCommand {
            key,
            args,
            constraints,
            observer,
        } = command;
        self.execute(ctx, key, args, observer, constraints).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use venue_core::{
        FaultCode, OperationDefinition, OperationType, Parameter, ServiceVersion, ValueKind,
    };

    use super::*;
    use crate::config::VenueConfig;
    use crate::executable::FnExecutable;
    use crate::observer::WaitingObserver;
    use crate::recorder::NullRecorder;

    fn venue_with_echo() -> Arc<ExecutionVenue> {
        let venue = ExecutionVenue::new(VenueConfig::default());
        venue
            .register_operation(
                OperationKey::new(
                    "Baseline",
                    ServiceVersion::new(2, 0),
                    "testSimpleGet",
                    OperationType::Request,
                ),
                OperationDefinition::new(
                    vec![Parameter::mandatory("message", ValueKind::String)],
                    ValueKind::String,
                ),
                Arc::new(FnExecutable::new(|_ctx, args| {
                    Ok(args.first().cloned().unwrap_or(Value::Null))
                })),
                Arc::new(NullRecorder),
                0,
            )
            .unwrap();
        venue
    }

    #[tokio::test]
    async fn resolved_command_round_trips() {
        let venue = venue_with_echo();
        let (observer, waiter) = WaitingObserver::pair("command");
        let command = ExecutionCommand::resolve(
            venue.registry(),
            "baseline/v2.0/testSimpleGet",
            vec![Value::from("10")],
            TimeConstraints::unconstrained(),
            observer,
        )
        .expect("known path");

        venue
            .execute_command(Arc::new(ExecutionContext::new("t-cmd")), command)
            .await;

        assert_eq!(
            waiter.wait(1_000).await.unwrap(),
            ExecutionResult::success("10")
        );
    }

    #[tokio::test]
    async fn minor_agnostic_path_resolves() {
        let venue = venue_with_echo();
        let (observer, _waiter) = WaitingObserver::pair("command");
        let command = ExecutionCommand::resolve(
            venue.registry(),
            "baseline/v2/testSimpleGet",
            vec![Value::from("10")],
            TimeConstraints::unconstrained(),
            observer,
        )
        .expect("major alias resolves");
        assert_eq!(command.key.version(), ServiceVersion::new(2, 0));
    }

    #[tokio::test]
    async fn unknown_path_delivers_fault_through_observer() {
        let venue = venue_with_echo();
        let (observer, waiter) = WaitingObserver::pair("command");
        let command = ExecutionCommand::resolve(
            venue.registry(),
            "baseline/v2.0/doesNotExist",
            vec![],
            TimeConstraints::unconstrained(),
            observer,
        );
        assert!(command.is_none());

        let result = waiter.wait(100).await.unwrap();
        assert_eq!(result.fault().expect("fault").code, FaultCode::NoSuchOperation);
    }
}
