use std::sync::Arc;

use indexmap::IndexMap;

use crate::analyzer::parse_config_limited;
use crate::eval::function::{FunctionError, FunctionResult, FunctionSpec};
use crate::eval::{EvalContext, Evaluator};
use crate::value::{Type, Value};

use super::{src_arg, src_param, variables, vars_param, Engine};

pub(super) fn evalconfigattrs(engine: Arc<Engine>) -> FunctionSpec {
    FunctionSpec::new(
        "Evaluates HCL configuration source code in \"Just Attributes\" mode, returning an object representing the attributes.",
        Type::Dynamic,
        move |args| run(&engine, args),
    )
    .param(src_param(
        "The source code of the HCL native syntax configuration to parse and evaluate.",
    ))
    .param(vars_param(
        "An object describing the variables to include in the evaluation scope.",
    ))
}

#[tracing::instrument(level = "debug", skip_all)]
fn run(engine: &Engine, args: &[Value]) -> FunctionResult {
    let Some(vars) = variables(args.get(1).unwrap_or(&Value::dynamic()), 1)? else {
        return Ok(Value::dynamic());
    };
    let src = src_arg(args);
    tracing::debug!(src_len = src.len(), vars = vars.len(), "evaluating attributes");

    let (body, diags) = parse_config_limited(src, &engine.config.source_name, engine.limits.max_depth);
    if diags.has_errors() {
        tracing::warn!(first = ?diags.first(), "syntax errors");
        return Err(FunctionError::argument(0, format!("invalid syntax: {}", diags)));
    }

    let (attributes, diags) = body.just_attributes();
    if diags.has_errors() {
        tracing::warn!(first = ?diags.first(), "blocks present");
        return Err(FunctionError::argument(0, format!("invalid config: {}", diags)));
    }

    let ctx = Arc::new(
        EvalContext::new()
            .with_variables(vars)
            .with_functions(engine.stdlib.clone()),
    );

    let mut names: Vec<&String> = attributes.keys().collect();
    names.sort();

    let mut result = IndexMap::with_capacity(names.len());
    for name in names {
        let attr = &attributes[name];
        let (value, diags) = Evaluator::new(ctx.clone())
            .with_limits(engine.limits)
            .evaluate(&attr.expr);
        if diags.has_errors() {
            tracing::warn!(attribute = %name, first = ?diags.first(), "evaluation errors");
            return Err(FunctionError::argument(
                0,
                format!("evaluation failed for {:?}: {}", name, diags),
            ));
        }
        result.insert(name.clone(), value);
    }
    Ok(Value::Object(result))
}
