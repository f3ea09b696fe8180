//! Operation registry: binds keys to executables, recorders, and bounds.
//!
//! Registration is a startup-time, single-writer phase; steady-state
//! lookups are lock-free concurrent reads. Misses are `None`, never
//! panics or errors, so batch transports can build structured
//! "method not found" faults without exception-driven control flow.

use std::sync::Arc;

use dashmap::DashMap;
use venue_core::{OperationDefinition, OperationKey};

use crate::executable::Executable;
use crate::recorder::ExecutionTimingRecorder;

// ---------------------------------------------------------------------------
// RegisteredOperation
// ---------------------------------------------------------------------------

/// One bound operation. Created once at bind time, read-only afterward.
pub struct RegisteredOperation {
    pub key: OperationKey,
    pub definition: OperationDefinition,
    pub executable: Arc<dyn Executable>,
    pub recorder: Arc<dyn ExecutionTimingRecorder>,
    /// Wall-clock execution bound in milliseconds. 0 = unbounded.
    pub max_execution_time_ms: u64,
}

impl RegisteredOperation {
    /// Wire path this binding dispatches on. Namespaced bindings are
    /// prefixed so two namespaces can host the same local operation.
    #[must_use]
    pub fn wire_path(&self) -> String {
        wire_path(&self.key)
    }
}

fn wire_path(key: &OperationKey) -> String {
    match key.namespace() {
        Some(ns) => format!("{ns}/{}", key.method_name()),
        None => key.method_name(),
    }
}

fn major_wire_path(key: &OperationKey) -> String {
    match key.namespace() {
        Some(ns) => format!("{ns}/{}", key.major_method_name()),
        None => key.major_method_name(),
    }
}

// ---------------------------------------------------------------------------
// RegistrationError
// ---------------------------------------------------------------------------

/// Bind-time failures. Raised at startup, never at request time.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("operation {key} is already registered")]
    DuplicateKey { key: String },
    /// Two bindings resolving to the same wire-level path. Keys differing
    /// only in operation type collide here.
    #[error("wire path {path} is already bound by {existing}")]
    DuplicateBinding { path: String, existing: String },
}

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// Key → binding map plus the wire-path index used by method-name
/// dispatching transports.
#[derive(Default)]
pub struct OperationRegistry {
    operations: DashMap<OperationKey, Arc<RegisteredOperation>>,
    /// Full wire path → key.
    paths: DashMap<String, OperationKey>,
    /// Minor-stripped wire path → key of the highest registered minor,
    /// for minor-version-agnostic clients.
    major_paths: DashMap<String, OperationKey>,
}

impl OperationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an operation. Fails fast on a duplicate key or a wire path
    /// already bound under a different key.
    ///
    /// # Errors
    ///
    /// See [`RegistrationError`].
    pub fn register(&self, entry: RegisteredOperation) -> Result<(), RegistrationError> {
        let key = entry.key.clone();
        if self.operations.contains_key(&key) {
            return Err(RegistrationError::DuplicateKey {
                key: key.to_string(),
            });
        }
        let path = entry.wire_path();
        if let Some(existing) = self.paths.get(&path) {
            tracing::warn!(%path, existing = %existing.value(), "rejected duplicate wire binding");
            return Err(RegistrationError::DuplicateBinding {
                path,
                existing: existing.value().to_string(),
            });
        }

        self.paths.insert(path, key.clone());
        self.update_major_alias(&key);
        self.operations.insert(key, Arc::new(entry));
        Ok(())
    }

    /// Point the minor-stripped alias at the highest registered minor.
    fn update_major_alias(&self, key: &OperationKey) {
        let alias = major_wire_path(key);
        match self.major_paths.entry(alias) {
            dashmap::Entry::Vacant(slot) => {
                slot.insert(key.clone());
            }
            dashmap::Entry::Occupied(mut slot) => {
                if key.version() > slot.get().version() {
                    slot.insert(key.clone());
                }
            }
        }
    }

    /// Look up a binding. `None` for unregistered keys.
    #[must_use]
    pub fn lookup(&self, key: &OperationKey) -> Option<Arc<RegisteredOperation>> {
        self.operations.get(key).map(|entry| entry.value().clone())
    }

    /// Definition of a bound operation, if any.
    #[must_use]
    pub fn definition_of(&self, key: &OperationKey) -> Option<OperationDefinition> {
        self.lookup(key).map(|op| op.definition.clone())
    }

    /// Resolve a wire path to a key. Exact paths take precedence; a
    /// minor-stripped path resolves to the highest compatible minor.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> Option<OperationKey> {
        if let Some(key) = self.paths.get(path) {
            return Some(key.value().clone());
        }
        self.major_paths.get(path).map(|key| key.value().clone())
    }

    /// Stable snapshot of all registered keys, for introspection and
    /// endpoint-listing pages.
    #[must_use]
    pub fn all_keys(&self) -> Vec<OperationKey> {
        let mut keys: Vec<_> = self
            .operations
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort_by_key(std::string::ToString::to_string);
        keys
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
