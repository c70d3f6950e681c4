use std::sync::Arc;

use crate::analyzer::{parse_expression_limited, parse_template_limited};
use crate::ast::Expression;
use crate::diagnostics::Diagnostics;
use crate::eval::function::{FunctionError, FunctionResult, FunctionSpec};
use crate::eval::{EvalContext, Evaluator};
use crate::value::{convert::convert, Type, Value};

use super::{src_arg, src_param, variables, vars_param, Engine};

type Parse = fn(&str, &str, usize) -> (Expression, Diagnostics);

pub(super) fn evalexpr(engine: Arc<Engine>) -> FunctionSpec {
    parse_and_eval(
        engine,
        "Evaluates a given string as an HCL expression.",
        "The source code of the expression to evaluate.",
        parse_expression_limited,
        Type::Dynamic,
    )
}

pub(super) fn evaltemplate(engine: Arc<Engine>) -> FunctionSpec {
    parse_and_eval(
        engine,
        "Evaluates a given string as an HCL template.",
        "The source code of the template to evaluate.",
        parse_template_limited,
        Type::String,
    )
    .refine_result(|b| b.not_null())
}

fn parse_and_eval(
    engine: Arc<Engine>,
    description: &str,
    src_description: &str,
    parse: Parse,
    return_type: Type,
) -> FunctionSpec {
    let target = return_type.clone();
    FunctionSpec::new(description, return_type, move |args| {
        run(&engine, parse, &target, args)
    })
    .param(src_param(src_description))
    .param(vars_param(
        "An object describing the variables to include in the evaluation scope.",
    ))
}

#[tracing::instrument(level = "debug", skip_all)]
fn run(engine: &Engine, parse: Parse, target: &Type, args: &[Value]) -> FunctionResult {
    let Some(vars) = variables(args.get(1).unwrap_or(&Value::dynamic()), 1)? else {
        return Ok(Value::unknown(target.clone()));
    };
    let src = src_arg(args);
    tracing::debug!(src_len = src.len(), vars = vars.len(), "evaluating");

    let (expr, diags) = parse(src, &engine.config.source_name, engine.limits.max_depth);
    if diags.has_errors() {
        tracing::warn!(first = ?diags.first(), "syntax errors");
        return Err(FunctionError::argument(0, format!("invalid syntax: {}", diags)));
    }

    let ctx = Arc::new(
        EvalContext::new()
            .with_variables(vars)
            .with_functions(engine.stdlib.clone()),
    );
    let (result, diags) = Evaluator::new(ctx).with_limits(engine.limits).evaluate(&expr);
    if diags.has_errors() {
        tracing::warn!(first = ?diags.first(), "evaluation errors");
        return Err(FunctionError::argument(
            0,
            format!("evaluation failed: {}", diags),
        ));
    }

    convert(&result, target)
        .map_err(|err| FunctionError::argument(0, format!("invalid result type: {}", err)))
}
