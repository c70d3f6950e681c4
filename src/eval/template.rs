use std::collections::BTreeMap;

use crate::ast::{Expression, TemplatePart};
use crate::diagnostics::Diagnostics;
use crate::value::{convert::convert, Type, Value};

use super::Evaluator;

/// Text produced so far. Once an unknown value has been interpolated the
/// text stops growing: everything before it is the result's exact prefix.
#[derive(Default)]
struct Output {
    text: String,
    unknown: bool,
    failed: bool,
}

impl Output {
    fn push(&mut self, s: &str) {
        if !self.unknown {
            self.text.push_str(s);
        }
    }

    /// Marks the result unknown, keeping `prefix` as the known start of the
    /// unknown part.
    fn mark_unknown(&mut self, prefix: Option<&str>) {
        if let Some(prefix) = prefix {
            self.push(prefix);
        }
        self.unknown = true;
    }
}

impl Evaluator {
    pub(super) fn eval_template(
        &mut self,
        expr: &Expression,
        parts: &[TemplatePart],
        diags: &mut Diagnostics,
    ) -> Value {
        if let Some(inner) = expr.unwrapped_template() {
            return self.eval(inner, diags);
        }

        let mut out = Output::default();
        self.render(parts, &mut out, diags);

        if out.failed {
            return Value::unknown(Type::String);
        }
        if !out.unknown {
            return Value::String(out.text);
        }

        let mut prefix = out.text;
        if prefix.len() > self.limits.max_prefix_bytes {
            let mut cut = self.limits.max_prefix_bytes;
            while !prefix.is_char_boundary(cut) {
                cut -= 1;
            }
            prefix.truncate(cut);
        }
        Value::unknown(Type::String)
            .refine()
            .not_null()
            .string_prefix_full(&prefix)
            .new_value()
    }

    fn render(&mut self, parts: &[TemplatePart], out: &mut Output, diags: &mut Diagnostics) {
        for part in parts {
            match part {
                TemplatePart::Literal { value, .. } => out.push(value),
                TemplatePart::Interpolation(expr) => self.interpolate(expr, out, diags),
                TemplatePart::If {
                    condition,
                    then_parts,
                    else_parts,
                    ..
                } => {
                    let raw = self.eval(condition, diags);
                    match convert(&raw, &Type::Bool) {
                        Ok(Value::Bool(true)) => self.render(then_parts, out, diags),
                        Ok(Value::Bool(false)) => self.render(else_parts, out, diags),
                        Ok(Value::Null(_)) => {
                            self.error(
                                diags,
                                "Null condition",
                                "The condition value is null. Conditions must either be true or false.",
                                &condition.range,
                            );
                            out.failed = true;
                        }
                        Ok(_) => out.mark_unknown(None),
                        Err(err) => {
                            self.error(
                                diags,
                                "Incorrect condition type",
                                format!("The condition expression must be of type bool: {}.", err),
                                &condition.range,
                            );
                            out.failed = true;
                        }
                    }
                }
                TemplatePart::For {
                    key_var,
                    value_var,
                    collection,
                    body,
                    ..
                } => {
                    let value = self.eval(collection, diags);
                    if value.is_null() {
                        self.error(
                            diags,
                            "Iteration over null value",
                            "A null value cannot be used as the collection in a 'for' directive.",
                            &collection.range,
                        );
                        out.failed = true;
                        continue;
                    }
                    if !value.is_known() {
                        out.mark_unknown(None);
                        continue;
                    }
                    let Some(elements) = value.elements() else {
                        self.error(
                            diags,
                            "Iteration over non-iterable value",
                            format!(
                                "A value of type {} cannot be used as the collection in a 'for' directive.",
                                value.ty()
                            ),
                            &collection.range,
                        );
                        out.failed = true;
                        continue;
                    };
                    if !self.within_iteration_limit(elements.len(), &collection.range, diags) {
                        out.failed = true;
                        continue;
                    }
                    for (k, v) in elements {
                        let mut scope = BTreeMap::new();
                        if let Some(key_var) = key_var {
                            scope.insert(key_var.clone(), k);
                        }
                        scope.insert(value_var.clone(), v);
                        self.with_scope(scope, |this| this.render(body, out, diags));
                    }
                }
            }
        }
    }

    fn interpolate(&mut self, expr: &Expression, out: &mut Output, diags: &mut Diagnostics) {
        let raw = self.eval(expr, diags);
        match convert(&raw, &Type::String) {
            Ok(Value::String(s)) => out.push(&s),
            Ok(Value::Null(_)) => {
                self.error(
                    diags,
                    "Invalid template interpolation value",
                    "The expression result is null. Cannot include a null value in a string template.",
                    &expr.range,
                );
                out.failed = true;
            }
            Ok(unknown) => {
                let prefix = unknown.refinement().string_prefix;
                out.mark_unknown(prefix.as_deref());
            }
            Err(err) => {
                self.error(
                    diags,
                    "Invalid template interpolation value",
                    format!("Cannot include the given value in a string template: {}.", err),
                    &expr.range,
                );
                out.failed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analyzer::parse_template;
    use crate::eval::{EvalContext, Limits};
    use crate::value::Refinement;
    use pretty_assertions::assert_eq;

    fn render_with(src: &str, vars: Vec<(&str, Value)>, limits: Limits) -> (Value, Diagnostics) {
        let (expr, parse_diags) = parse_template(src, "<src>");
        assert!(parse_diags.is_empty(), "{}", parse_diags);
        let vars: BTreeMap<String, Value> =
            vars.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        Evaluator::new(Arc::new(EvalContext::new().with_variables(vars)))
            .with_limits(limits)
            .evaluate(&expr)
    }

    fn render(src: &str, vars: Vec<(&str, Value)>) -> (Value, Diagnostics) {
        render_with(src, vars, Limits::default())
    }

    fn prefix_of(value: &Value) -> Option<String> {
        Refinement::of_value(value).string_prefix
    }

    #[test]
    fn test_literal_and_interpolation() {
        let (value, diags) = render("a-${1 + 1}-${true}", vec![]);
        assert!(diags.is_empty());
        assert_eq!(value, Value::string("a-2-true"));
    }

    #[test]
    fn test_single_interpolation_is_unwrapped() {
        let (value, _) = render("${[1]}", vec![]);
        assert_eq!(value, Value::tuple(vec![Value::number(1)]));
    }

    #[test]
    fn test_unknown_keeps_exact_prefix() {
        let (value, diags) = render("foo-${unk}-bar", vec![("unk", Value::unknown(Type::String))]);
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
    fn test_prefix_through_nested_interpolation() {
        let inner = Value::unknown(Type::String)
            .refine()
            .string_prefix_full("mid-")
            .new_value();
        let (value, _) = render("a-${x}", vec![("x", inner)]);
        assert_eq!(prefix_of(&value).as_deref(), Some("a-mid-"));
    }

    #[test]
    fn test_prefix_is_capped() {
        let limits = Limits {
            max_prefix_bytes: 2,
            ..Limits::default()
        };
        let (value, _) = render_with("héllo${u}", vec![("u", Value::unknown(Type::String))], limits);
        // "é" occupies bytes 1..3, so the cut falls back to 1
        assert_eq!(prefix_of(&value).as_deref(), Some("h"));
    }

    #[test]
    fn test_null_interpolation() {
        let (_, diags) = render("x${n}", vec![("n", Value::null(Type::String))]);
        assert_eq!(
            diags.to_string(),
            "<src>:1,4-5: Invalid template interpolation value; The expression result is null. Cannot include a null value in a string template."
        );
    }

    #[test]
    fn test_directives() {
        let (value, diags) = render(
            "%{ for i, v in [\"a\", \"b\"] }${i}=${v};%{ endfor }%{ if true }yes%{ else }no%{ endif }",
            vec![],
        );
        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(value, Value::string("0=a;1=b;yes"));
    }

    #[test]
    fn test_unknown_if_condition() {
        let (value, _) = render(
            "pre %{ if c }a%{ endif }",
            vec![("c", Value::unknown(Type::Bool))],
        );
        assert_eq!(prefix_of(&value).as_deref(), Some("pre "));
    }
}
