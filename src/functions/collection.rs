use indexmap::IndexMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::eval::function::{FunctionError, FunctionSpec, Parameter};
use crate::value::convert::list_or_tuple;
use crate::value::{Number, Type, Value};

use super::str_arg;

pub(super) fn length() -> FunctionSpec {
    FunctionSpec::new(
        "Returns the number of elements in a collection or the number of characters in a string.",
        Type::Number,
        |args| {
            let value = args.first().cloned().unwrap_or_else(Value::dynamic);
            match value {
                Value::String(s) => Ok(Value::number(s.graphemes(true).count() as u64)),
                Value::Unknown(ty, refinement) => {
                    let mut builder = Value::unknown(Type::Number)
                        .refine()
                        .not_null()
                        .number_lower_bound(Number::zero());
                    if !ty.is_collection() {
                        return Ok(builder.new_value());
                    }
                    if let (Some(lo), Some(hi)) = (refinement.length_lower, refinement.length_upper) {
                        if lo == hi {
                            return Ok(Value::number(lo as u64));
                        }
                    }
                    if let Some(lo) = refinement.length_lower {
                        builder = builder.number_lower_bound(Number::from(lo));
                    }
                    if let Some(hi) = refinement.length_upper {
                        builder = builder.number_upper_bound(Number::from(hi));
                    }
                    Ok(builder.new_value())
                }
                other => match other.length() {
                    Some(n) => Ok(Value::number(n as u64)),
                    None => Err(FunctionError::argument(
                        0,
                        "argument must be a string, a collection type, or a structural type",
                    )),
                },
            }
        },
    )
    .param(Parameter::new("value", Type::Dynamic).allow_unknown())
    .refine_result(|b| b.not_null())
}

fn sequence_items(value: &Value) -> Option<&[Value]> {
    match value {
        Value::List(_, items) | Value::Set(_, items) | Value::Tuple(items) => Some(items),
        _ => None,
    }
}

pub(super) fn concat() -> FunctionSpec {
    FunctionSpec::new(
        "Combines two or more lists into a single list.",
        Type::Dynamic,
        |args| {
            let mut items = Vec::new();
            for (index, arg) in args.iter().enumerate() {
                let Some(elements) = sequence_items(arg) else {
                    return Err(FunctionError::argument(index, "all arguments must be lists or tuples"));
                };
                items.extend(elements.iter().cloned());
            }
            Ok(list_or_tuple(items))
        },
    )
    .variadic(Parameter::new("seqs", Type::Dynamic))
}

pub(super) fn contains() -> FunctionSpec {
    FunctionSpec::new(
        "Determines whether the given collection contains the given value.",
        Type::Bool,
        |args| {
            let Some(items) = args.first().and_then(sequence_items) else {
                return Err(FunctionError::argument(0, "argument must be a list, tuple, or set"));
            };
            let needle = args.get(1).cloned().unwrap_or_else(Value::dynamic);
            let found = items.iter().any(|item| item.raw_equal(&needle) == Some(true));
            Ok(Value::Bool(found))
        },
    )
    .param(Parameter::new("list", Type::Dynamic))
    .param(Parameter::new("value", Type::Dynamic))
    .refine_result(|b| b.not_null())
}

/// Entries of a map or object, sorted by key.
fn mapping_entries(value: &Value) -> Option<Vec<(String, Value)>> {
    let mut entries: Vec<(String, Value)> = match value {
        Value::Map(_, items) => items.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Object(attrs) => attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => return None,
    };
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Some(entries)
}

pub(super) fn keys() -> FunctionSpec {
    FunctionSpec::new(
        "Returns a list of the keys of the given map or object, in lexicographical order.",
        Type::list(Type::String),
        |args| {
            let entries = args
                .first()
                .and_then(mapping_entries)
                .ok_or_else(|| FunctionError::argument(0, "must have map or object type"))?;
            Ok(Value::list(
                Type::String,
                entries.into_iter().map(|(k, _)| Value::String(k)).collect(),
            ))
        },
    )
    .param(Parameter::new("inputMap", Type::Dynamic))
    .refine_result(|b| b.not_null())
}

pub(super) fn values() -> FunctionSpec {
    FunctionSpec::new(
        "Returns a list of the values of the given map or object, ordered by key.",
        Type::Dynamic,
        |args| {
            let entries = args
                .first()
                .and_then(mapping_entries)
                .ok_or_else(|| FunctionError::argument(0, "must have map or object type"))?;
            Ok(list_or_tuple(entries.into_iter().map(|(_, v)| v).collect()))
        },
    )
    .param(Parameter::new("mapping", Type::Dynamic))
}

pub(super) fn lookup() -> FunctionSpec {
    FunctionSpec::new(
        "Retrieves the value of a single element from a map, given its key. If the key does not exist, the given default value is returned instead.",
        Type::Dynamic,
        |args| {
            if args.len() > 3 {
                return Err(FunctionError::call("lookup() takes at most three arguments"));
            }
            let key = str_arg(args, 1);
            let found = match args.first() {
                Some(Value::Map(_, items)) => items.get(key).cloned(),
                Some(Value::Object(attrs)) => attrs.get(key).cloned(),
                _ => return Err(FunctionError::argument(0, "must have map or object type")),
            };
            match (found, args.get(2)) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(FunctionError::call(format!(
                    "lookup failed to find key {:?}",
                    key
                ))),
            }
        },
    )
    .param(Parameter::new("inputMap", Type::Dynamic))
    .param(Parameter::new("key", Type::String))
    .variadic(Parameter::new("default", Type::Dynamic).allow_null())
}

pub(super) fn merge() -> FunctionSpec {
    FunctionSpec::new(
        "Merges all of the elements from the given maps into a single map, or the attributes from given objects into a single object. Later arguments take precedence.",
        Type::Dynamic,
        |args| {
            let mut merged: IndexMap<String, Value> = IndexMap::new();
            for (index, arg) in args.iter().enumerate() {
                match arg {
                    Value::Null(_) => {}
                    Value::Map(_, items) => {
                        merged.extend(items.iter().map(|(k, v)| (k.clone(), v.clone())))
                    }
                    Value::Object(attrs) => {
                        merged.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())))
                    }
                    _ => {
                        return Err(FunctionError::argument(
                            index,
                            "arguments must be maps or objects",
                        ))
                    }
                }
            }
            Ok(Value::Object(merged))
        },
    )
    .variadic(Parameter::new("maps", Type::Dynamic).allow_null())
    .refine_result(|b| b.not_null())
}

pub(super) fn coalesce() -> FunctionSpec {
    FunctionSpec::new(
        "Takes any number of arguments and returns the first one that isn't null or an empty string.",
        Type::Dynamic,
        |args| {
            args.iter()
                .find(|v| !v.is_null() && v.as_str() != Some(""))
                .cloned()
                .ok_or_else(|| FunctionError::call("no non-null, non-empty-string arguments"))
        },
    )
    .variadic(Parameter::new("vals", Type::Dynamic).allow_null())
}

pub(super) fn range(max_iterations: usize) -> FunctionSpec {
    FunctionSpec::new(
        "Generates a list of numbers using a start value, a limit value, and a step value.",
        Type::list(Type::Number),
        move |args| {
            let numbers: Vec<&Number> = args.iter().filter_map(Value::as_number).collect();
            let (start, limit, step) = match numbers.as_slice() {
                [limit] => (Number::zero(), (*limit).clone(), Number::one()),
                [start, limit] => {
                    let step = if start <= limit { Number::one() } else { -Number::one() };
                    ((*start).clone(), (*limit).clone(), step)
                }
                [start, limit, step] => ((*start).clone(), (*limit).clone(), (*step).clone()),
                _ => {
                    return Err(FunctionError::call(
                        "must have one, two, or three arguments",
                    ))
                }
            };
            if step.is_zero() {
                return Err(FunctionError::argument(2, "step must not be zero"));
            }
            if (step.is_positive() && limit < start) || (step.is_negative() && limit > start) {
                return Err(FunctionError::call(
                    "step must point from start towards limit",
                ));
            }

            let count = (&limit - &start)
                .checked_div(&step)
                .and_then(|n| n.ceil().to_usize())
                .unwrap_or(usize::MAX);
            if count > max_iterations {
                return Err(FunctionError::call(format!(
                    "Too many iterations: more than {} elements would be produced",
                    max_iterations
                )));
            }
            let mut items = Vec::with_capacity(count);
            let mut current = start;
            while !((step.is_positive() && current >= limit)
                || (step.is_negative() && current <= limit))
            {
                let next = &current + &step;
                items.push(Value::Number(current));
                current = next;
            }
            Ok(Value::list(Type::Number, items))
        },
    )
    .variadic(Parameter::new("params", Type::Number))
    .refine_result(|b| b.not_null())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::analyzer::parse_expression;
    use crate::eval::{EvalContext, Evaluator};
    use crate::functions::standard_library;
    use crate::functions::test_util::{call_err, call_ok};
    use crate::value::{Number, Type, Value};
    use pretty_assertions::assert_eq;

    fn numbers(ns: &[i64]) -> Vec<Value> {
        ns.iter().map(|n| Value::number(*n)).collect()
    }

    #[test]
    fn test_length() {
        assert_eq!(call_ok("length(\"cafe\u{301}\")"), Value::number(4));
        assert_eq!(call_ok("length([1, 2, 3])"), Value::number(3));
        assert_eq!(call_ok("length({a = 1})"), Value::number(1));
        assert!(call_err("length(1)").contains("a collection type"));
    }

    #[test]
    fn test_length_of_unknown_uses_refinement() {
        let fixed = Value::unknown(Type::list(Type::String))
            .refine()
            .collection_length(2)
            .new_value();
        let (expr, _) = parse_expression("length(x)", "<src>");
        let ctx = EvalContext::new()
            .with_variables(BTreeMap::from([("x".to_string(), fixed)]))
            .with_functions(Arc::new(standard_library()));
        let (value, diags) = Evaluator::new(Arc::new(ctx)).evaluate(&expr);
        assert!(diags.is_empty());
        assert_eq!(value, Value::number(2));
    }

    #[test]
    fn test_concat_and_contains() {
        assert_eq!(
            call_ok("concat([1], [2, 3])"),
            Value::list(Type::Number, numbers(&[1, 2, 3]))
        );
        assert_eq!(call_ok("contains([\"a\", \"b\"], \"b\")"), Value::Bool(true));
        assert_eq!(call_ok("contains([1], 2)"), Value::Bool(false));
    }

    #[test]
    fn test_keys_values_lookup_merge() {
        assert_eq!(
            call_ok("keys({b = 1, a = 2})"),
            Value::list(Type::String, vec![Value::string("a"), Value::string("b")])
        );
        assert_eq!(
            call_ok("values({b = 1, a = 2})"),
            Value::list(Type::Number, numbers(&[2, 1]))
        );
        assert_eq!(call_ok("lookup({a = 1}, \"b\", 0)"), Value::number(0));
        assert!(call_err("lookup({a = 1}, \"b\")").contains("lookup failed to find key \"b\""));
        assert_eq!(
            call_ok("merge({a = 1, b = 1}, null, {b = 2})"),
            Value::object([("a", Value::number(1)), ("b", Value::number(2))])
        );
    }

    #[test]
    fn test_coalesce() {
        assert_eq!(call_ok("coalesce(null, \"\", \"x\")"), Value::string("x"));
        assert!(call_err("coalesce(null)").contains("no non-null"));
    }

    #[test]
    fn test_range() {
        assert_eq!(call_ok("range(3)"), Value::list(Type::Number, numbers(&[0, 1, 2])));
        assert_eq!(call_ok("range(3, 0)"), Value::list(Type::Number, numbers(&[3, 2, 1])));
        assert_eq!(call_ok("range(0, 10, 4)"), Value::list(Type::Number, numbers(&[0, 4, 8])));
        assert!(call_err("range(0, 1, 0)").contains("step must not be zero"));
        assert!(call_err("range(10000000)").contains("Too many iterations"));
        let quarters = ["0", "0.25", "0.5", "0.75"]
            .iter()
            .map(|s| Value::Number(Number::parse(s).unwrap()))
            .collect();
        assert_eq!(call_ok("range(0, 1, 0.25)"), Value::list(Type::Number, quarters));
    }
}
