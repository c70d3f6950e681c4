//! # Provider
//!
//! The four user-facing operations, registered as ordinary functions so
//! that a host can list them with their signatures and call them by name:
//!
//! | name              | parameters              | result                 |
//! |-------------------|-------------------------|------------------------|
//! | `evalexpr`        | `src`, `vars`           | any value              |
//! | `evaltemplate`    | `src`, `vars`           | string                 |
//! | `evalconfigattrs` | `src`, `vars`           | object of attributes   |
//! | `evalconfig`      | `src`, `specfile`, `vars` | the spec's decoded value |
//!
//! Each operation runs its passes in order (load spec, parse, evaluate,
//! convert) and stops at the first pass that reports errors. The failure is
//! a [`FunctionError::Argument`] naming the argument to blame, with every
//! diagnostic of that pass rendered into the message.

mod eval_config;
mod eval_config_attrs;
mod eval_expr;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::eval::function::{Function, FunctionError, FunctionSpec, FunctionTable, Parameter};
use crate::eval::Limits;
use crate::functions::standard_library_with_limit;
use crate::value::{Type, Value};
use crate::{Error, InternalResult};

const VARS_NOT_OBJECT: &str =
    "must be an object whose attributes represent the variables to include in the HCL evaluation scope";

/// What every operation needs: the configuration and the built-in
/// function table, shared across calls.
#[derive(Debug)]
pub(crate) struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) limits: Limits,
    pub(crate) stdlib: Arc<FunctionTable>,
}

impl Engine {
    fn new(config: EngineConfig) -> Self {
        let limits = Limits::from(&config);
        let stdlib = Arc::new(standard_library_with_limit(config.max_iterations));
        Self {
            config,
            limits,
            stdlib,
        }
    }
}

/// One entry of the function catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub params: Vec<Parameter>,
    pub return_type: Type,
}

pub struct Provider {
    functions: FunctionTable,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Provider {
    pub fn new(config: EngineConfig) -> Self {
        let engine = Arc::new(Engine::new(config));
        let mut functions = FunctionTable::new();
        let mut register = |name: &str, spec: FunctionSpec| {
            functions.insert(name.to_string(), Function::new(spec));
        };
        register("evalexpr", eval_expr::evalexpr(engine.clone()));
        register("evaltemplate", eval_expr::evaltemplate(engine.clone()));
        register(
            "evalconfigattrs",
            eval_config_attrs::evalconfigattrs(engine.clone()),
        );
        register("evalconfig", eval_config::evalconfig(engine));
        Self { functions }
    }

    /// Calls the operation `name`. Argument problems and failed passes come
    /// back as [`Error::Function`].
    #[tracing::instrument(level = "debug", skip(self, args), fields(args = args.len()))]
    pub fn call(&self, name: &str, args: &[Value]) -> InternalResult<Value> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
        function.call(args).map_err(|err| {
            tracing::warn!(function = name, error = %err, "call failed");
            Error::from(err)
        })
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Every operation with its signature, sorted by name.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.functions
            .iter()
            .map(|(name, function)| {
                let spec = function.spec();
                CatalogEntry {
                    name: name.clone(),
                    description: spec.description.clone(),
                    params: spec.params.clone(),
                    return_type: spec.return_type.clone(),
                }
            })
            .collect()
    }
}

fn src_param(description: &str) -> Parameter {
    Parameter::new("src", Type::String).describe(description)
}

fn vars_param(description: &str) -> Parameter {
    Parameter::new("vars", Type::Dynamic)
        .allow_unknown()
        .describe(description)
}

/// The variables passed in argument `index`. `Ok(None)` when the argument
/// itself is unknown, in which case the operation's result is unknown too.
fn variables(value: &Value, index: usize) -> Result<Option<BTreeMap<String, Value>>, FunctionError> {
    match value {
        Value::Unknown(..) => Ok(None),
        Value::Object(attributes) => Ok(Some(
            attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )),
        _ => Err(FunctionError::argument(index, VARS_NOT_OBJECT)),
    }
}

fn src_arg(args: &[Value]) -> &str {
    args.first().and_then(Value::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_catalog() {
        let provider = Provider::default();
        let names: Vec<String> = provider.catalog().into_iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec!["evalconfig", "evalconfigattrs", "evalexpr", "evaltemplate"]
        );
        let evalconfig = &provider.catalog()[0];
        let params: Vec<&str> = evalconfig.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["src", "specfile", "vars"]);
        assert!(provider
            .catalog()
            .iter()
            .all(|entry| entry.params.iter().all(|p| !p.description.is_empty())));
    }

    #[test]
    fn test_unknown_operation() {
        let err = Provider::default().call("evalnothing", &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownFunction(name) if name == "evalnothing"));
    }

    #[test]
    fn test_arity_checked() {
        let err = Provider::default()
            .call("evalexpr", &[Value::string("1")])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Function(FunctionError::Arity {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_vars_must_be_object() {
        for vars in [Value::string("nope"), Value::map(Type::String, [("a", Value::string("b"))])] {
            let err = Provider::default()
                .call("evalexpr", &[Value::string("1"), vars])
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Function(FunctionError::Argument { index: 1, ref message }) if message == VARS_NOT_OBJECT
            ));
        }
    }

    #[test]
    fn test_unknown_inputs_give_unknown_results() {
        let provider = Provider::default();
        assert_eq!(
            provider
                .call("evalexpr", &[Value::unknown(Type::String), Value::empty_object()])
                .unwrap(),
            Value::dynamic()
        );
        assert_eq!(
            provider
                .call("evalexpr", &[Value::string("1"), Value::dynamic()])
                .unwrap(),
            Value::dynamic()
        );
        assert_eq!(
            provider
                .call("evaltemplate", &[Value::unknown(Type::String), Value::empty_object()])
                .unwrap(),
            Value::unknown(Type::String).refine_not_null()
        );
    }
}
