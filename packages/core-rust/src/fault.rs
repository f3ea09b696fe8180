//! Structured fault model delivered through the observer callback.
//!
//! Every failure category the dispatcher can produce is a `Fault` value, so
//! no error ever crosses the dispatch boundary as a panic or bubbled
//! `Result::Err`. Batch transports rely on this to keep processing sibling
//! calls after one fails, and each transport implements a single
//! fault-to-wire mapping.

use serde::{Deserialize, Serialize};

use crate::value::Value;

// ---------------------------------------------------------------------------
// FaultCode
// ---------------------------------------------------------------------------

/// Machine-readable fault category.
///
/// Transports map these to their own wire conventions (HTTP status,
/// JSON-RPC numeric code, SOAP fault element); the triggering conditions
/// are identical regardless of transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultCode {
    /// Operation key has no registered executable. HTTP-equivalent: 404.
    NoSuchOperation,
    /// Caller-supplied arguments failed mandatory/type checks.
    /// HTTP-equivalent: 400.
    InvalidParameters,
    /// The executable completed with a business-level exception.
    ServiceCheckedException,
    /// Unexpected failure inside dispatch, interceptors, or argument
    /// resolution. HTTP-equivalent: 500.
    InternalError,
    /// The dispatcher's execution-time bound or the inherited deadline
    /// elapsed before a result was produced.
    Timeout,
}

impl FaultCode {
    /// Stable wire code for this category.
    #[must_use]
    pub const fn wire_code(&self) -> &'static str {
        match self {
            FaultCode::NoSuchOperation => "EVX-0404",
            FaultCode::InvalidParameters => "EVX-0400",
            FaultCode::ServiceCheckedException => "EVX-0001",
            FaultCode::InternalError => "EVX-0500",
            FaultCode::Timeout => "EVX-0504",
        }
    }
}

// ---------------------------------------------------------------------------
// Fault
// ---------------------------------------------------------------------------

/// Structured failure envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{} ({}): {}", .code.wire_code(), .detail_code, .message)]
pub struct Fault {
    /// Category driving transport-level mapping.
    pub code: FaultCode,
    /// Application- or framework-assigned detail code
    /// (e.g. `"NoSuchOperation"`, or a service's own exception name).
    pub detail_code: String,
    /// Human-readable description.
    pub message: String,
    /// Optional structured detail carried to the wire unchanged.
    pub detail: Option<Value>,
}

impl Fault {
    #[must_use]
    pub fn new(code: FaultCode, detail_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            detail_code: detail_code.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// Attach structured detail for the transport to serialize.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Fault for a dispatch against an unregistered key.
    #[must_use]
    pub fn no_such_operation(operation: &str) -> Self {
        Self::new(
            FaultCode::NoSuchOperation,
            "NoSuchOperation",
            format!("no operation registered for {operation}"),
        )
    }

    /// Fault for a call whose execution-time bound elapsed.
    #[must_use]
    pub fn timed_out(operation: &str, budget_ms: u64) -> Self {
        Self::new(
            FaultCode::Timeout,
            "ExecutionTimeout",
            format!("{operation} exceeded {budget_ms}ms execution budget"),
        )
    }
}
