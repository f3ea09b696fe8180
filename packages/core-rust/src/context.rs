//! Per-call execution context.
//!
//! The venue consumes an already-resolved context; identity and
//! geolocation resolution happen in the transport layer before dispatch.

use std::time::{Instant, SystemTime};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// One resolved identity in the caller's credential chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Principal name (e.g. an account id).
    pub principal: String,
    /// Name of the credential that resolved this identity.
    pub credential_name: String,
}

/// Resolved caller geolocation, as far as the edge could determine it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeoLocation {
    pub remote_addr: Option<String>,
    pub country: Option<String>,
}

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// Context threaded through every dispatch for auth, audit, and tracing.
///
/// `received_time` is the wall-clock arrival instant (for logging and
/// audit); `request_time` is the monotonic instant deadlines are rebased
/// onto.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Identity chain, outermost caller first. Empty when unauthenticated.
    pub identities: Vec<Identity>,
    pub location: GeoLocation,
    /// Whether this call carries a distributed trace.
    pub traced: bool,
    pub trace_id: String,
    pub received_time: SystemTime,
    pub request_time: Instant,
}

impl ExecutionContext {
    /// Context for a request arriving now.
    #[must_use]
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            identities: Vec::new(),
            location: GeoLocation::default(),
            traced: false,
            trace_id: trace_id.into(),
            received_time: SystemTime::now(),
            request_time: Instant::now(),
        }
    }

    /// Attach a resolved identity chain.
    #[must_use]
    pub fn with_identities(mut self, identities: Vec<Identity>) -> Self {
        self.identities = identities;
        self
    }

    #[must_use]
    pub fn with_tracing(mut self) -> Self {
        self.traced = true;
        self
    }
}
