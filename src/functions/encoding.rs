use crate::eval::function::{FunctionError, FunctionSpec, Parameter};
use crate::value::json::{from_json, to_json};
use crate::value::{Type, Value};

use super::str_arg;

pub(super) fn jsonencode() -> FunctionSpec {
    FunctionSpec::new(
        "Returns a string containing a JSON representation of the given value.",
        Type::String,
        |args| {
            let value = args.first().cloned().unwrap_or_else(Value::dynamic);
            let json = to_json(&value).map_err(|e| FunctionError::argument(0, e.to_string()))?;
            serde_json::to_string(&json)
                .map(Value::String)
                .map_err(|e| FunctionError::call(e.to_string()))
        },
    )
    .param(Parameter::new("val", Type::Dynamic).allow_null())
    .refine_result(|b| b.not_null())
}

pub(super) fn jsondecode() -> FunctionSpec {
    FunctionSpec::new(
        "Parses the given string as JSON and returns a value corresponding to what the JSON document describes.",
        Type::Dynamic,
        |args| {
            let json: serde_json::Value = serde_json::from_str(str_arg(args, 0))
                .map_err(|e| FunctionError::argument(0, format!("invalid JSON: {}", e)))?;
            from_json(&json).map_err(|e| FunctionError::argument(0, e.to_string()))
        },
    )
    .param(Parameter::new("str", Type::String))
}

#[cfg(test)]
mod tests {
    use crate::functions::test_util::{call_err, call_ok};
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_jsonencode() {
        assert_eq!(
            call_ok("jsonencode({a = [1, \"x\", null]})"),
            Value::string(r#"{"a":[1,"x",null]}"#)
        );
    }

    #[test]
    fn test_jsondecode() {
        assert_eq!(
            call_ok("jsondecode(\"{\\\"a\\\": true}\")"),
            Value::object([("a", Value::Bool(true))])
        );
        assert!(call_err("jsondecode(\"{\")").contains("invalid JSON"));
    }
}
