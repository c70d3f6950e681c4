use regex::Regex;

use crate::eval::function::{FunctionError, FunctionSpec, Parameter};
use crate::value::{Type, Value};

use super::str_arg;

fn string_transform(description: &str, f: fn(&str) -> String) -> FunctionSpec {
    FunctionSpec::new(description, Type::String, move |args| {
        Ok(Value::String(f(str_arg(args, 0))))
    })
    .param(Parameter::new("str", Type::String))
    .refine_result(|b| b.not_null())
}

pub(super) fn upper() -> FunctionSpec {
    string_transform("Converts all cased letters in the given string to uppercase.", |s| {
        s.to_uppercase()
    })
}

pub(super) fn lower() -> FunctionSpec {
    string_transform("Converts all cased letters in the given string to lowercase.", |s| {
        s.to_lowercase()
    })
}

pub(super) fn trimspace() -> FunctionSpec {
    string_transform(
        "Removes any consecutive space characters from the start and end of the given string.",
        |s| s.trim().to_string(),
    )
}

pub(super) fn replace() -> FunctionSpec {
    FunctionSpec::new(
        "Replaces all instances of the given substring in the given string with the given replacement. A substring wrapped in forward slashes is treated as a regular expression.",
        Type::String,
        |args| {
            let (s, substr, replacement) = (str_arg(args, 0), str_arg(args, 1), str_arg(args, 2));
            match substr.strip_prefix('/').and_then(|p| p.strip_suffix('/')) {
                Some(pattern) if substr.len() > 1 => {
                    let re = Regex::new(pattern).map_err(|e| {
                        FunctionError::argument(1, format!("invalid regular expression: {}", e))
                    })?;
                    Ok(Value::String(re.replace_all(s, replacement).into_owned()))
                }
                _ => Ok(Value::String(s.replace(substr, replacement))),
            }
        },
    )
    .param(Parameter::new("str", Type::String))
    .param(Parameter::new("substr", Type::String))
    .param(Parameter::new("replace", Type::String))
    .refine_result(|b| b.not_null())
}

pub(super) fn split() -> FunctionSpec {
    FunctionSpec::new(
        "Produces a list of one or more strings by splitting the given string at all instances of a given separator substring.",
        Type::list(Type::String),
        |args| {
            let (separator, s) = (str_arg(args, 0), str_arg(args, 1));
            let parts: Vec<Value> = if separator.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(separator).map(Value::string).collect()
            };
            Ok(Value::list(Type::String, parts))
        },
    )
    .param(Parameter::new("separator", Type::String))
    .param(Parameter::new("str", Type::String))
    .refine_result(|b| b.not_null().collection_length_lower_bound(1))
}

pub(super) fn join() -> FunctionSpec {
    FunctionSpec::new(
        "Concatenates together the string elements of one or more lists with a given separator.",
        Type::String,
        |args| {
            if args.len() < 2 {
                return Err(FunctionError::call("at least one list is required"));
            }
            let separator = str_arg(args, 0);
            let mut items = Vec::new();
            for (index, list) in args.iter().enumerate().skip(1) {
                let Value::List(_, elements) = list else {
                    continue;
                };
                for element in elements {
                    match element {
                        Value::String(s) => items.push(s.as_str()),
                        _ => {
                            return Err(FunctionError::argument(
                                index,
                                "element must not be null",
                            ))
                        }
                    }
                }
            }
            Ok(Value::String(items.join(separator)))
        },
    )
    .param(Parameter::new("separator", Type::String))
    .variadic(Parameter::new("lists", Type::list(Type::String)))
    .refine_result(|b| b.not_null())
}

#[cfg(test)]
mod tests {
    use crate::functions::test_util::{call_err, call_ok};
    use crate::value::{Type, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_case_and_trim() {
        assert_eq!(call_ok("upper(\"héllo\")"), Value::string("HÉLLO"));
        assert_eq!(call_ok("lower(\"ABC\")"), Value::string("abc"));
        assert_eq!(call_ok("trimspace(\"  x \")"), Value::string("x"));
    }

    #[test]
    fn test_replace_plain_and_regex() {
        assert_eq!(call_ok("replace(\"a-b-c\", \"-\", \"+\")"), Value::string("a+b+c"));
        assert_eq!(
            call_ok("replace(\"hello world\", \"/w.*d/\", \"there\")"),
            Value::string("hello there")
        );
        assert!(call_err("replace(\"x\", \"/(/\", \"\")").contains("invalid regular expression"));
    }

    #[test]
    fn test_split_and_join() {
        assert_eq!(
            call_ok("split(\",\", \"a,b\")"),
            Value::list(Type::String, vec![Value::string("a"), Value::string("b")])
        );
        assert_eq!(call_ok("join(\"-\", [\"a\", \"b\"], [\"c\"])"), Value::string("a-b-c"));
    }
}
