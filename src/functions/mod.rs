//! # Standard Library
//!
//! The built-in functions available to expressions, templates and spec
//! files. [`standard_library`] builds the table once; callers share it
//! behind an `Arc`.
//!
//! Implementations receive their arguments already converted to the
//! declared parameter types, so they only need to handle the shapes those
//! types allow.

mod collection;
mod conversion;
mod encoding;
mod number;
mod string;

use crate::config::EngineConfig;
use crate::eval::function::{Function, FunctionSpec, FunctionTable};
use crate::value::Value;

/// Every built-in function, with `range` bounded by the default iteration
/// ceiling.
pub fn standard_library() -> FunctionTable {
    standard_library_with_limit(EngineConfig::default().max_iterations)
}

/// Every built-in function, with `range` refusing to produce more than
/// `max_iterations` elements.
pub fn standard_library_with_limit(max_iterations: usize) -> FunctionTable {
    let mut table = FunctionTable::new();
    let mut register = |name: &str, spec: FunctionSpec| {
        table.insert(name.to_string(), Function::new(spec));
    };

    register("upper", string::upper());
    register("lower", string::lower());
    register("trimspace", string::trimspace());
    register("replace", string::replace());
    register("split", string::split());
    register("join", string::join());

    register("length", collection::length());
    register("concat", collection::concat());
    register("contains", collection::contains());
    register("keys", collection::keys());
    register("values", collection::values());
    register("lookup", collection::lookup());
    register("merge", collection::merge());
    register("coalesce", collection::coalesce());
    register("range", collection::range(max_iterations));

    register("max", number::max());
    register("min", number::min());
    register("abs", number::abs());
    register("floor", number::floor());
    register("ceil", number::ceil());

    register("tostring", conversion::tostring());
    register("tonumber", conversion::tonumber());
    register("tobool", conversion::tobool());
    register("tolist", conversion::tolist());
    register("toset", conversion::toset());
    register("tomap", conversion::tomap());

    register("jsonencode", encoding::jsonencode());
    register("jsondecode", encoding::jsondecode());

    tracing::debug!(functions = table.len(), "standard library built");
    table
}

fn str_arg(args: &[Value], index: usize) -> &str {
    args.get(index).and_then(Value::as_str).unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::Arc;

    use crate::analyzer::parse_expression;
    use crate::diagnostics::Diagnostics;
    use crate::eval::{EvalContext, Evaluator};
    use crate::value::Value;

    use super::standard_library;

    /// Evaluates `src` with only the standard library in scope.
    pub fn call(src: &str) -> (Value, Diagnostics) {
        let (expr, parse_diags) = parse_expression(src, "<src>");
        assert!(parse_diags.is_empty(), "{}", parse_diags);
        let ctx = EvalContext::new().with_functions(Arc::new(standard_library()));
        Evaluator::new(Arc::new(ctx)).evaluate(&expr)
    }

    pub fn call_ok(src: &str) -> Value {
        let (value, diags) = call(src);
        assert!(diags.is_empty(), "{}: {}", src, diags);
        value
    }

    pub fn call_err(src: &str) -> String {
        let (_, diags) = call(src);
        assert!(diags.has_errors(), "expected {} to fail", src);
        diags.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_descriptions() {
        let table = standard_library();
        assert_eq!(table.len(), 28);
        for (name, function) in &table {
            assert!(
                !function.spec().description.is_empty(),
                "{} has no description",
                name
            );
        }
    }
}
