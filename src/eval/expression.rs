use indexmap::IndexMap;

use crate::ast::{Expression, ExpressionKind, ObjectItem};
use crate::diagnostics::{Diagnostics, SourceRange};
use crate::suggest::did_you_mean;
use crate::value::{convert::convert, unify::unify, Refinement, Type, Value};

use super::function::{Function, FunctionError};
use super::Evaluator;

impl Evaluator {
    pub(super) fn eval_expression(&mut self, expr: &Expression, diags: &mut Diagnostics) -> Value {
        match &expr.kind {
            ExpressionKind::Literal(value) => value.clone(),
            ExpressionKind::Variable(name) => self.eval_variable(name, &expr.range, diags),
            ExpressionKind::Parenthesized(inner) => self.eval(inner, diags),
            ExpressionKind::GetAttr {
                source,
                name,
                name_range,
            } => self.eval_get_attr(source, name, name_range, diags),
            ExpressionKind::Index { source, key } => self.eval_index(source, key, diags),
            ExpressionKind::Splat { source, each } => self.eval_splat(source, each, diags),
            ExpressionKind::SplatItem => self.eval_splat_item(&expr.range, diags),
            ExpressionKind::Unary { op, operand } => self.eval_unary(*op, operand, diags),
            ExpressionKind::Binary { .. } => self.eval_binary(expr, diags),
            ExpressionKind::Conditional {
                condition,
                true_result,
                false_result,
            } => self.eval_conditional(condition, true_result, false_result, diags),
            ExpressionKind::FunctionCall {
                name,
                name_range,
                args,
                expand_final,
            } => self.eval_function_call(name, name_range, args, *expand_final, &expr.range, diags),
            ExpressionKind::For(for_expr) => self.eval_for(for_expr, &expr.range, diags),
            ExpressionKind::Template(parts) => self.eval_template(expr, parts, diags),
            ExpressionKind::Tuple(items) => {
                Value::Tuple(items.iter().map(|item| self.eval(item, diags)).collect())
            }
            ExpressionKind::Object(items) => self.eval_object(items, diags),
        }
    }

    fn eval_variable(&mut self, name: &str, range: &SourceRange, diags: &mut Diagnostics) -> Value {
        if let Some(value) = self.ctx.variable(name) {
            return value.clone();
        }
        let suggestion = did_you_mean(name, self.ctx.variable_names());
        self.error(
            diags,
            "Unknown variable",
            format!("There is no variable named {:?}.{}", name, suggestion),
            range,
        )
    }

    fn eval_conditional(
        &mut self,
        condition: &Expression,
        true_result: &Expression,
        false_result: &Expression,
        diags: &mut Diagnostics,
    ) -> Value {
        let raw = self.eval(condition, diags);
        let cond = match convert(&raw, &Type::Bool) {
            Ok(cond) => cond,
            Err(err) => {
                return self.error(
                    diags,
                    "Incorrect condition type",
                    format!("The condition expression must be of type bool: {}.", err),
                    &condition.range,
                )
            }
        };

        match cond {
            Value::Bool(true) => self.eval(true_result, diags),
            Value::Bool(false) => self.eval(false_result, diags),
            Value::Null(_) => self.error(
                diags,
                "Null condition",
                "The condition value is null. Conditions must either be true or false.",
                &condition.range,
            ),
            _ => {
                // Either branch could be chosen later: the result is an
                // unknown that covers both.
                let t = self.eval(true_result, diags);
                let f = self.eval(false_result, diags);
                let Some(ty) = unify(&[t.ty(), f.ty()]) else {
                    return self.error(
                        diags,
                        "Inconsistent conditional result types",
                        format!(
                            "The true and false result expressions must have consistent types. The 'true' value is {}, but the 'false' value is {}.",
                            t.ty(),
                            f.ty()
                        ),
                        &SourceRange::between(&true_result.range, &false_result.range),
                    );
                };
                let common = Refinement::of_value(&t).common(&Refinement::of_value(&f));
                Value::unknown(ty).refine().with(&common).new_value()
            }
        }
    }

    fn eval_object(&mut self, items: &[ObjectItem], diags: &mut Diagnostics) -> Value {
        let mut attrs = IndexMap::new();
        let mut unknown_key = false;
        for item in items {
            let key = self.eval(&item.key, diags);
            let value = self.eval(&item.value, diags);
            match convert(&key, &Type::String) {
                Ok(Value::String(name)) => {
                    attrs.insert(name, value);
                }
                Ok(Value::Null(_)) => {
                    self.error(
                        diags,
                        "Null value as key",
                        "Can't use a null value as a key.",
                        &item.key.range,
                    );
                }
                Ok(_) => unknown_key = true,
                Err(err) => {
                    self.error(
                        diags,
                        "Incorrect key type",
                        format!("Can't use this value as a key: {}.", err),
                        &item.key.range,
                    );
                }
            }
        }
        if unknown_key {
            // the attribute names decide the type, so nothing is known
            return Value::dynamic();
        }
        Value::Object(attrs)
    }

    fn eval_function_call(
        &mut self,
        name: &str,
        name_range: &SourceRange,
        arg_exprs: &[Expression],
        expand_final: bool,
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Value {
        let Some(function) = self.ctx.function(name).cloned() else {
            if !self.ctx.has_functions() {
                return self.error(
                    diags,
                    "Function calls not allowed",
                    "Functions may not be called here.",
                    range,
                );
            }
            let suggestion = did_you_mean(name, self.ctx.function_names());
            return self.error(
                diags,
                "Call to unknown function",
                format!("There is no function named {:?}.{}", name, suggestion),
                name_range,
            );
        };

        let mut args: Vec<Value> = arg_exprs.iter().map(|a| self.eval(a, diags)).collect();
        // Positions of the argument values, for diagnostics.
        let mut arg_ranges: Vec<SourceRange> = arg_exprs.iter().map(|a| a.range.clone()).collect();

        if expand_final {
            let (Some(last), Some(last_expr)) = (args.pop(), arg_exprs.last()) else {
                return Value::dynamic();
            };
            arg_ranges.pop();
            match last {
                Value::List(_, items) | Value::Set(_, items) | Value::Tuple(items) => {
                    arg_ranges.extend(std::iter::repeat(last_expr.range.clone()).take(items.len()));
                    args.extend(items);
                }
                Value::Unknown(..) => return function.unknown_result(),
                Value::Null(_) => {
                    return self.error(
                        diags,
                        "Invalid expanding argument value",
                        "The expanding argument (indicated by ...) must not be null.",
                        &last_expr.range,
                    )
                }
                _ => {
                    return self.error(
                        diags,
                        "Invalid expanding argument value",
                        "The expanding argument (indicated by ...) must be of a tuple, list, or set type.",
                        &last_expr.range,
                    )
                }
            }
        }

        if let Some(value) = self.check_arity(name, &function, &args, &arg_ranges, range, diags) {
            return value;
        }

        match function.call(&args) {
            Ok(value) => value,
            Err(FunctionError::Argument { index, message }) => {
                let param = function
                    .parameter_for(index)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                let subject = arg_ranges.get(index).unwrap_or(range);
                self.error(
                    diags,
                    "Invalid function argument",
                    format!("Invalid value for {:?} parameter: {}.", param, message),
                    subject,
                )
            }
            Err(err) => self.error(
                diags,
                "Error in function call",
                format!("Call to function {:?} failed: {}.", name, err),
                range,
            ),
        }
    }

    fn check_arity(
        &self,
        name: &str,
        function: &Function,
        args: &[Value],
        arg_ranges: &[SourceRange],
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Option<Value> {
        let spec = function.spec();
        let expected = spec.params.len();
        if args.len() < expected {
            let missing = &spec.params[args.len()];
            return Some(self.error(
                diags,
                "Not enough function arguments",
                format!(
                    "Function {:?} expects {} argument(s). Missing value for {:?}.",
                    name, expected, missing.name
                ),
                range,
            ));
        }
        if spec.variadic.is_none() && args.len() > expected {
            let subject = arg_ranges.get(expected).unwrap_or(range);
            return Some(self.error(
                diags,
                "Too many function arguments",
                format!("Function {:?} expects only {} argument(s).", name, expected),
                subject,
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::analyzer::parse_expression;
    use crate::eval::EvalContext;
    use crate::functions::standard_library;
    use pretty_assertions::assert_eq;

    fn eval_with(src: &str, vars: Vec<(&str, Value)>) -> (Value, Diagnostics) {
        let (expr, parse_diags) = parse_expression(src, "<src>");
        assert!(parse_diags.is_empty(), "{}", parse_diags);
        let ctx = EvalContext::new()
            .with_variables(
                vars.into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect::<BTreeMap<_, _>>(),
            )
            .with_functions(Arc::new(standard_library()));
        Evaluator::new(Arc::new(ctx)).evaluate(&expr)
    }

    fn eval_ok(src: &str) -> Value {
        let (value, diags) = eval_with(src, vec![]);
        assert!(diags.is_empty(), "{}", diags);
        value
    }

    fn eval_err(src: &str, vars: Vec<(&str, Value)>) -> String {
        let (_, diags) = eval_with(src, vars);
        assert!(diags.has_errors(), "expected errors for {}", src);
        diags.to_string()
    }

    #[test]
    fn test_constructors() {
        assert_eq!(
            eval_ok("{a = 1, \"b\" = [true, null]}"),
            Value::object([
                ("a", Value::number(1)),
                (
                    "b",
                    Value::tuple(vec![Value::bool(true), Value::null(Type::Dynamic)])
                ),
            ])
        );
    }

    #[test]
    fn test_unknown_variable_suggestion() {
        let err = eval_err("nmae", vec![("name", Value::string("x"))]);
        assert_eq!(
            err,
            "<src>:1,1-5: Unknown variable; There is no variable named \"nmae\". Did you mean \"name\"?"
        );
    }

    #[test]
    fn test_conditional_known() {
        assert_eq!(eval_ok("true ? 1 : \"x\""), Value::number(1));
        assert_eq!(eval_ok("false ? 1 : 2"), Value::number(2));
    }

    #[test]
    fn test_conditional_unknown_unifies() {
        let (value, diags) = eval_with(
            "c ? \"foo-a\" : \"foo-b\"",
            vec![("c", Value::unknown(Type::Bool))],
        );
        assert!(diags.is_empty());
        assert_eq!(
            value,
            Value::unknown(Type::String)
                .refine()
                .not_null()
                .string_prefix_full("foo-")
                .new_value()
        );
    }

    #[test]
    fn test_conditional_errors() {
        let err = eval_err("null ? 1 : 2", vec![]);
        assert!(err.contains("Null condition"));
        let err = eval_err("\"maybe\" ? 1 : 2", vec![]);
        assert!(err.contains("Incorrect condition type"));
    }

    #[test]
    fn test_object_with_unknown_key() {
        let (value, diags) = eval_with("{(k) = 1}", vec![("k", Value::unknown(Type::String))]);
        assert!(diags.is_empty());
        assert_eq!(value, Value::dynamic());
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(eval_ok("upper(\"hello\")"), Value::string("HELLO"));
        assert_eq!(eval_ok("max(1, [5, 3]...)"), Value::number(5));
    }

    #[test]
    fn test_unknown_function_suggestion() {
        let err = eval_err("uper(\"x\")", vec![]);
        assert_eq!(
            err,
            "<src>:1,1-5: Call to unknown function; There is no function named \"uper\". Did you mean \"upper\"?"
        );
    }

    #[test]
    fn test_arity_errors() {
        let err = eval_err("upper()", vec![]);
        assert!(err.contains(
            "Not enough function arguments; Function \"upper\" expects 1 argument(s). Missing value for \"str\"."
        ));
        let err = eval_err("upper(\"a\", \"b\")", vec![]);
        assert_eq!(
            err,
            "<src>:1,12-15: Too many function arguments; Function \"upper\" expects only 1 argument(s)."
        );
    }

    #[test]
    fn test_invalid_argument() {
        let err = eval_err("upper([])", vec![]);
        assert_eq!(
            err,
            "<src>:1,7-9: Invalid function argument; Invalid value for \"str\" parameter: string required."
        );
    }

    #[test]
    fn test_unknown_argument_short_circuits() {
        let (value, diags) = eval_with("upper(x)", vec![("x", Value::unknown(Type::String))]);
        assert!(diags.is_empty());
        assert_eq!(value, Value::unknown(Type::String).refine_not_null());
    }
}
