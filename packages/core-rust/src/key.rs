//! Operation identity: namespaced, versioned operation keys.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ServiceVersion
// ---------------------------------------------------------------------------

/// Major/minor version of a service binding.
///
/// Ordering is lexicographic on (major, minor), so `v2.1 > v2.0 > v1.9`.
/// Used by the registry to resolve minor-version-agnostic lookups to the
/// highest compatible binding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ServiceVersion {
    pub major: u32,
    pub minor: u32,
}

impl ServiceVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ServiceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

// ---------------------------------------------------------------------------
// OperationType
// ---------------------------------------------------------------------------

/// Kind of remote invocation an operation represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// Request/response call.
    Request,
    /// Fire-and-forget event.
    Event,
    /// Long-lived streaming subscription.
    ConnectedObject,
}

// ---------------------------------------------------------------------------
// OperationKey
// ---------------------------------------------------------------------------

/// Immutable identity of an operation binding.
///
/// Constructed once at service-binding time and used as a map key for the
/// lifetime of the venue. Equality and hashing cover all five components,
/// so the same operation bound under two namespaces yields two distinct
/// keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationKey {
    namespace: Option<String>,
    service_name: String,
    operation_name: String,
    version: ServiceVersion,
    op_type: OperationType,
}

impl OperationKey {
    /// Create a key in the default (global) namespace.
    #[must_use]
    pub fn new(
        service_name: impl Into<String>,
        version: ServiceVersion,
        operation_name: impl Into<String>,
        op_type: OperationType,
    ) -> Self {
        Self {
            namespace: None,
            service_name: service_name.into(),
            operation_name: operation_name.into(),
            version,
            op_type,
        }
    }

    /// Create a copy of this key bound under `namespace`.
    #[must_use]
    pub fn namespaced(&self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..self.clone()
        }
    }

    /// The unnamespaced variant of this key.
    ///
    /// Namespaced bindings resolve back to the same local operation; a key
    /// with no namespace is its own local key.
    #[must_use]
    pub fn local_key(&self) -> Self {
        Self {
            namespace: None,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    #[must_use]
    pub const fn version(&self) -> ServiceVersion {
        self.version
    }

    #[must_use]
    pub const fn op_type(&self) -> OperationType {
        self.op_type
    }

    /// Wire-level method name: `lowercase(service)/v{major}.{minor}/{operation}`.
    ///
    /// This is the canonical path JSON-RPC-style adapters dispatch on, and
    /// the path the registry de-duplicates on at bind time.
    #[must_use]
    pub fn method_name(&self) -> String {
        format!(
            "{}/{}/{}",
            self.service_name.to_lowercase(),
            self.version,
            self.operation_name
        )
    }

    /// Minor-version-stripped method name: `lowercase(service)/v{major}/{operation}`.
    ///
    /// Minor-agnostic clients dispatch on this; the registry resolves it to
    /// the highest registered minor of the major version.
    #[must_use]
    pub fn major_method_name(&self) -> String {
        format!(
            "{}/v{}/{}",
            self.service_name.to_lowercase(),
            self.version.major,
            self.operation_name
        )
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{ns}:")?;
        }
        write!(
            f,
            "{}/{}/{}",
            self.service_name, self.version, self.operation_name
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
