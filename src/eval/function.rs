//! Callable functions: signatures, argument checking and dispatch.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::value::{convert::convert, RefinementBuilder, Type, Value};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FunctionError {
    /// A problem with one specific argument, by position.
    #[error("{message}")]
    Argument { index: usize, message: String },
    #[error("{0}")]
    Call(String),
    #[error("expected {expected} argument(s), got {got}")]
    Arity { expected: usize, got: usize },
}

impl FunctionError {
    pub fn argument(index: usize, message: impl Into<String>) -> Self {
        FunctionError::Argument {
            index,
            message: message.into(),
        }
    }

    pub fn call(message: impl Into<String>) -> Self {
        FunctionError::Call(message.into())
    }
}

pub type FunctionResult = Result<Value, FunctionError>;

/// Receives the arguments already converted to the parameter types.
pub type Implementation = Arc<dyn Fn(&[Value]) -> FunctionResult + Send + Sync>;

/// Adds what is known about a function's result when it cannot be computed
/// because an argument is unknown.
pub type ResultRefiner = fn(RefinementBuilder) -> RefinementBuilder;

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub description: String,
    pub ty: Type,
    pub allow_null: bool,
    /// Whether the implementation handles unknown values itself. When false
    /// an argument that is not wholly known makes the result unknown
    /// without calling the implementation.
    pub allow_unknown: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            ty,
            allow_null: false,
            allow_unknown: false,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown = true;
        self
    }
}

pub struct FunctionSpec {
    pub description: String,
    pub params: Vec<Parameter>,
    pub variadic: Option<Parameter>,
    pub return_type: Type,
    pub refine_result: Option<ResultRefiner>,
    pub implementation: Implementation,
}

impl FunctionSpec {
    pub fn new<F>(description: impl Into<String>, return_type: Type, implementation: F) -> Self
    where
        F: Fn(&[Value]) -> FunctionResult + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            params: Vec::new(),
            variadic: None,
            return_type,
            refine_result: None,
            implementation: Arc::new(implementation),
        }
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn variadic(mut self, param: Parameter) -> Self {
        self.variadic = Some(param);
        self
    }

    pub fn refine_result(mut self, refiner: ResultRefiner) -> Self {
        self.refine_result = Some(refiner);
        self
    }
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("description", &self.description)
            .field("params", &self.params)
            .field("variadic", &self.variadic)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// A shareable handle to a [`FunctionSpec`].
#[derive(Debug, Clone)]
pub struct Function(Arc<FunctionSpec>);

pub type FunctionTable = BTreeMap<String, Function>;

impl Function {
    pub fn new(spec: FunctionSpec) -> Self {
        Self(Arc::new(spec))
    }

    pub fn spec(&self) -> &FunctionSpec {
        &self.0
    }

    /// The parameter that receives argument `index`, if any.
    pub fn parameter_for(&self, index: usize) -> Option<&Parameter> {
        self.0
            .params
            .get(index)
            .or(self.0.variadic.as_ref().filter(|_| index >= self.0.params.len()))
    }

    /// Checks and converts the arguments, then runs the implementation.
    #[tracing::instrument(level = "debug", skip(self, args), fields(args = args.len()))]
    pub fn call(&self, args: &[Value]) -> FunctionResult {
        let spec = &self.0;
        let min = spec.params.len();
        if args.len() < min || (spec.variadic.is_none() && args.len() > min) {
            return Err(FunctionError::Arity {
                expected: min,
                got: args.len(),
            });
        }

        let mut converted = Vec::with_capacity(args.len());
        let mut short_circuit = false;
        for (index, arg) in args.iter().enumerate() {
            let Some(param) = self.parameter_for(index) else {
                return Err(FunctionError::Arity {
                    expected: min,
                    got: args.len(),
                });
            };
            if arg.is_null() && !param.allow_null {
                return Err(FunctionError::argument(index, "argument must not be null"));
            }
            let value = convert(arg, &param.ty)
                .map_err(|e| FunctionError::argument(index, e.to_string()))?;
            if !param.allow_unknown && !value.is_wholly_known() {
                short_circuit = true;
            }
            converted.push(value);
        }

        if short_circuit {
            tracing::debug!("unknown argument, skipping call");
            return Ok(self.unknown_result());
        }

        let result = (spec.implementation)(&converted)?;
        match spec.refine_result {
            Some(refiner) if !result.is_known() => Ok(refiner(result.refine()).new_value()),
            _ => Ok(result),
        }
    }

    /// The result of a call whose arguments are not all known.
    pub fn unknown_result(&self) -> Value {
        let unknown = Value::unknown(self.0.return_type.clone());
        match self.0.refine_result {
            Some(refiner) => refiner(unknown.refine()).new_value(),
            None => unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn concat_strings() -> Function {
        Function::new(
            FunctionSpec::new("Joins strings.", Type::String, |args| {
                let mut out = String::new();
                for arg in args {
                    out.push_str(arg.as_str().unwrap_or_default());
                }
                Ok(Value::string(out))
            })
            .param(Parameter::new("first", Type::String))
            .variadic(Parameter::new("rest", Type::String))
            .refine_result(|b| b.not_null()),
        )
    }

    #[test]
    fn test_call_converts_arguments() {
        let f = concat_strings();
        let result = f
            .call(&[Value::string("a"), Value::number(1), Value::bool(true)])
            .unwrap();
        assert_eq!(result, Value::string("a1true"));
    }

    #[test]
    fn test_arity() {
        let err = concat_strings().call(&[]).unwrap_err();
        assert_eq!(err, FunctionError::Arity { expected: 1, got: 0 });
    }

    #[test]
    fn test_null_argument_rejected() {
        let err = concat_strings()
            .call(&[Value::string("a"), Value::null(Type::String)])
            .unwrap_err();
        assert_eq!(err, FunctionError::argument(1, "argument must not be null"));
    }

    #[test]
    fn test_argument_conversion_error() {
        let err = concat_strings()
            .call(&[Value::tuple(vec![])])
            .unwrap_err();
        assert_eq!(err, FunctionError::argument(0, "string required"));
    }

    #[test]
    fn test_unknown_short_circuits_with_refinement() {
        let result = concat_strings()
            .call(&[Value::unknown(Type::String)])
            .unwrap();
        assert_eq!(result, Value::unknown(Type::String).refine_not_null());
    }
}
