//! Static operation metadata: parameter lists and return types.

use serde::{Deserialize, Serialize};

use crate::fault::{Fault, FaultCode};
use crate::value::{Value, ValueKind};

// ---------------------------------------------------------------------------
// Parameter
// ---------------------------------------------------------------------------

/// Declared parameter of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ValueKind,
    pub mandatory: bool,
}

impl Parameter {
    #[must_use]
    pub fn mandatory(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mandatory: true,
        }
    }

    #[must_use]
    pub fn optional(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mandatory: false,
        }
    }
}

// ---------------------------------------------------------------------------
// OperationDefinition
// ---------------------------------------------------------------------------

/// Immutable (parameters, return type) pair associated 1:1 with an
/// `OperationKey`. Created at service-registration time and shared by all
/// callers; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDefinition {
    parameters: Vec<Parameter>,
    return_kind: ValueKind,
}

impl OperationDefinition {
    #[must_use]
    pub fn new(parameters: Vec<Parameter>, return_kind: ValueKind) -> Self {
        Self {
            parameters,
            return_kind,
        }
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    #[must_use]
    pub const fn return_kind(&self) -> ValueKind {
        self.return_kind
    }

    /// Check caller-supplied arguments against the declared parameters.
    ///
    /// Positional: `args[i]` corresponds to `parameters[i]`; trailing
    /// optional parameters may be omitted, and `Null` counts as absent.
    /// Runs before the executable is invoked, so a failing call never
    /// reaches application code.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidParameters` fault on surplus arguments, a missing
    /// mandatory parameter, or a type mismatch.
    pub fn validate_args(&self, args: &[Value]) -> Result<(), Fault> {
        if args.len() > self.parameters.len() {
            return Err(Fault::new(
                FaultCode::InvalidParameters,
                "TooManyArguments",
                format!(
                    "expected at most {} arguments, got {}",
                    self.parameters.len(),
                    args.len()
                ),
            ));
        }
        for (index, param) in self.parameters.iter().enumerate() {
            let value = args.get(index).unwrap_or(&Value::Null);
            if value.is_null() {
                if param.mandatory {
                    return Err(Fault::new(
                        FaultCode::InvalidParameters,
                        "MandatoryParameterMissing",
                        format!("mandatory parameter '{}' not supplied", param.name),
                    ));
                }
                continue;
            }
            if value.kind() != param.kind {
                return Err(Fault::new(
                    FaultCode::InvalidParameters,
                    "ParameterTypeMismatch",
                    format!(
                        "parameter '{}' expects {:?}, got {:?}",
                        param.name,
                        param.kind,
                        value.kind()
                    ),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_get() -> OperationDefinition {
        OperationDefinition::new(
            vec![Parameter::mandatory("message", ValueKind::String)],
            ValueKind::String,
        )
    }

    #[test]
    fn accepts_matching_arguments() {
        assert!(simple_get().validate_args(&[Value::from("10")]).is_ok());
    }

    #[test]
    fn missing_mandatory_parameter_is_invalid() {
        let fault = simple_get().validate_args(&[]).unwrap_err();
        assert_eq!(fault.code, FaultCode::InvalidParameters);
        assert_eq!(fault.detail_code, "MandatoryParameterMissing");
    }

    #[test]
    fn null_counts_as_absent_for_mandatory() {
        let fault = simple_get().validate_args(&[Value::Null]).unwrap_err();
        assert_eq!(fault.detail_code, "MandatoryParameterMissing");
    }

    #[test]
    fn optional_parameter_may_be_omitted() {
        let def = OperationDefinition::new(
            vec![
                Parameter::mandatory("id", ValueKind::Int),
                Parameter::optional("hint", ValueKind::String),
            ],
            ValueKind::Null,
        );
        assert!(def.validate_args(&[Value::from(7i64)]).is_ok());
        assert!(def
            .validate_args(&[Value::from(7i64), Value::Null])
            .is_ok());
    }

    #[test]
    fn type_mismatch_is_invalid() {
        let fault = simple_get().validate_args(&[Value::from(10i64)]).unwrap_err();
        assert_eq!(fault.detail_code, "ParameterTypeMismatch");
    }

    #[test]
    fn surplus_arguments_are_invalid() {
        let fault = simple_get()
            .validate_args(&[Value::from("a"), Value::from("b")])
            .unwrap_err();
        assert_eq!(fault.detail_code, "TooManyArguments");
    }
}
