//! Type expressions: `string`, `list(number)`, `object({ name = string })`.
//!
//! These are read straight from the syntax tree rather than evaluated, so
//! the type keywords never need to exist as variables.

use indexmap::IndexMap;

use crate::ast::{Expression, ExpressionKind, TemplatePart};
use crate::diagnostics::Diagnostic;
use crate::value::{Type, Value};

const CONSTRUCTOR_HINT: &str = "A type specification is either a primitive type keyword (bool, number, string), the keyword any, or a type constructor call like list(string).";

pub fn type_from_expression(expr: &Expression) -> Result<Type, Diagnostic> {
    match &expr.kind {
        ExpressionKind::Variable(keyword) => match keyword.as_str() {
            "string" => Ok(Type::String),
            "number" => Ok(Type::Number),
            "bool" => Ok(Type::Bool),
            "any" => Ok(Type::Dynamic),
            other => Err(invalid(
                format!("The keyword {:?} is not a valid type specification.", other),
                expr,
            )),
        },
        ExpressionKind::Parenthesized(inner) => type_from_expression(inner),
        ExpressionKind::FunctionCall {
            name,
            args,
            expand_final,
            ..
        } => {
            let [arg] = args.as_slice() else {
                return Err(invalid(
                    format!("The {} type constructor requires one argument.", name),
                    expr,
                ));
            };
            if *expand_final {
                return Err(invalid(CONSTRUCTOR_HINT, expr));
            }
            match name.as_str() {
                "list" => Ok(Type::list(type_from_expression(arg)?)),
                "set" => Ok(Type::set(type_from_expression(arg)?)),
                "map" => Ok(Type::map(type_from_expression(arg)?)),
                "tuple" => match &arg.kind {
                    ExpressionKind::Tuple(items) => Ok(Type::Tuple(
                        items
                            .iter()
                            .map(type_from_expression)
                            .collect::<Result<_, _>>()?,
                    )),
                    _ => Err(invalid(
                        "The tuple type constructor requires a list of element types.",
                        arg,
                    )),
                },
                "object" => match &arg.kind {
                    ExpressionKind::Object(items) => {
                        let mut attributes = IndexMap::new();
                        for item in items {
                            let Some(key) = literal_string(&item.key) else {
                                return Err(invalid(
                                    "Object type attribute names must be literal strings.",
                                    &item.key,
                                ));
                            };
                            attributes.insert(key, type_from_expression(&item.value)?);
                        }
                        Ok(Type::Object(attributes))
                    }
                    _ => Err(invalid(
                        "The object type constructor requires an object describing the attribute types.",
                        arg,
                    )),
                },
                other => Err(invalid(
                    format!("Keyword {:?} is not a valid type constructor.", other),
                    expr,
                )),
            }
        }
        _ => Err(invalid(CONSTRUCTOR_HINT, expr)),
    }
}

/// The text of a bare identifier, a string literal or a quoted string
/// without interpolations.
pub(super) fn literal_string(expr: &Expression) -> Option<String> {
    match &expr.kind {
        ExpressionKind::Variable(name) => Some(name.clone()),
        ExpressionKind::Literal(Value::String(s)) => Some(s.clone()),
        ExpressionKind::Template(parts) => {
            let mut out = String::new();
            for part in parts {
                match part {
                    TemplatePart::Literal { value, .. } => out.push_str(value),
                    _ => return None,
                }
            }
            Some(out)
        }
        _ => None,
    }
}

fn invalid(detail: impl Into<String>, expr: &Expression) -> Diagnostic {
    Diagnostic::error("Invalid type specification", detail).with_subject(expr.range.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parse_expression;
    use pretty_assertions::assert_eq;

    fn parse_type(src: &str) -> Result<Type, String> {
        let (expr, diags) = parse_expression(src, "<spec>");
        assert!(diags.is_empty(), "{}", diags);
        type_from_expression(&expr).map_err(|d| d.to_string())
    }

    #[test]
    fn test_primitives_and_collections() {
        assert_eq!(parse_type("string"), Ok(Type::String));
        assert_eq!(parse_type("any"), Ok(Type::Dynamic));
        assert_eq!(parse_type("list(map(bool))"), Ok(Type::list(Type::map(Type::Bool))));
        assert_eq!(parse_type("set(number)"), Ok(Type::set(Type::Number)));
    }

    #[test]
    fn test_structural_types() {
        assert_eq!(
            parse_type("tuple([string, number])"),
            Ok(Type::Tuple(vec![Type::String, Type::Number]))
        );
        assert_eq!(
            parse_type("object({ name = string, \"port\" = number })"),
            Ok(Type::object([("name", Type::String), ("port", Type::Number)]))
        );
    }

    #[test]
    fn test_invalid_types() {
        assert_eq!(
            parse_type("strng"),
            Err("<spec>:1,1-6: Invalid type specification; The keyword \"strng\" is not a valid type specification.".to_string())
        );
        assert!(parse_type("list(string, number)")
            .unwrap_err()
            .contains("requires one argument"));
        assert!(parse_type("\"string\"").unwrap_err().contains("primitive type keyword"));
    }
}
