//! Tri-state result envelope delivered to a call's observer.

use serde::{Deserialize, Serialize};

use crate::fault::{Fault, FaultCode};
use crate::value::Value;

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle for a connected-object (streaming) operation.
///
/// The venue only routes the handle; stream lifecycle lives with the
/// transport that owns the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    id: String,
}

impl Subscription {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// ExecutionResult
// ---------------------------------------------------------------------------

/// Discriminant of an `ExecutionResult`, without payload.
///
/// Post-processors may rewrite a result but are expected to preserve its
/// tag; the dispatcher compares tags to detect explicit fault recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTag {
    Success,
    Fault,
    Subscription,
}

/// Outcome of one dispatched call. Exactly one payload, matching the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionResult {
    /// Completed normally. Void operations carry `Value::Null`.
    Success(Value),
    /// Completed with a structured failure.
    Fault(Fault),
    /// Established a streaming subscription.
    Subscription(Subscription),
}

impl ExecutionResult {
    #[must_use]
    pub fn success(value: impl Into<Value>) -> Self {
        ExecutionResult::Success(value.into())
    }

    /// Result of a void/unit-returning operation.
    #[must_use]
    pub const fn void() -> Self {
        ExecutionResult::Success(Value::Null)
    }

    /// Classify a business-level exception raised by application code.
    ///
    /// Wraps it as a `ServiceCheckedException` fault so transports can
    /// distinguish declared application failures from framework errors.
    #[must_use]
    pub fn app_fault(
        detail_code: impl Into<String>,
        message: impl Into<String>,
        detail: Option<Value>,
    ) -> Self {
        let mut fault = Fault::new(FaultCode::ServiceCheckedException, detail_code, message);
        fault.detail = detail;
        ExecutionResult::Fault(fault)
    }

    #[must_use]
    pub const fn tag(&self) -> ResultTag {
        match self {
            ExecutionResult::Success(_) => ResultTag::Success,
            ExecutionResult::Fault(_) => ResultTag::Fault,
            ExecutionResult::Subscription(_) => ResultTag::Subscription,
        }
    }

    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, ExecutionResult::Fault(_))
    }

    /// Borrow the fault payload, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<&Fault> {
        match self {
            ExecutionResult::Fault(f) => Some(f),
            _ => None,
        }
    }
}

/// Classification of a handler's `Result`: `Ok` values (including unit)
/// become `Success`; already-structured faults pass through unchanged.
impl From<Result<Value, Fault>> for ExecutionResult {
    fn from(outcome: Result<Value, Fault>) -> Self {
        match outcome {
            Ok(value) => ExecutionResult::Success(value),
            Err(fault) => ExecutionResult::Fault(fault),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
