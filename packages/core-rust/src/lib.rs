//! Venue Core: operation identity, definitions, deadlines, and the result model.

pub mod context;
pub mod definition;
pub mod fault;
pub mod key;
pub mod result;
pub mod time;
pub mod value;

pub use context::{ExecutionContext, GeoLocation, Identity};
pub use definition::{OperationDefinition, Parameter};
pub use fault::{Fault, FaultCode};
pub use key::{OperationKey, OperationType, ServiceVersion};
pub use result::{ExecutionResult, ResultTag, Subscription};
pub use time::TimeConstraints;
pub use value::{Value, ValueKind};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
