use crate::eval::function::{FunctionError, FunctionSpec, Parameter};
use crate::value::{convert::convert, Type, Value};

/// A function converting its single argument to `target`. Nulls pass
/// through as a null of the target type.
fn converter(target: Type) -> FunctionSpec {
    let description = format!("Converts its argument to a {} value.", target);
    let result_type = target.clone();
    FunctionSpec::new(description, result_type, move |args| {
        let value = args.first().cloned().unwrap_or_else(Value::dynamic);
        convert(&value, &target).map_err(|e| FunctionError::argument(0, e.to_string()))
    })
    .param(
        Parameter::new("v", Type::Dynamic)
            .allow_null()
            .describe("The value to convert."),
    )
}

pub(super) fn tostring() -> FunctionSpec {
    converter(Type::String)
}

pub(super) fn tonumber() -> FunctionSpec {
    converter(Type::Number)
}

pub(super) fn tobool() -> FunctionSpec {
    converter(Type::Bool)
}

pub(super) fn tolist() -> FunctionSpec {
    converter(Type::list(Type::Dynamic))
}

pub(super) fn toset() -> FunctionSpec {
    converter(Type::set(Type::Dynamic))
}

pub(super) fn tomap() -> FunctionSpec {
    converter(Type::map(Type::Dynamic))
}

#[cfg(test)]
mod tests {
    use crate::functions::test_util::{call_err, call_ok};
    use crate::value::{Number, Type, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_primitive_conversions() {
        assert_eq!(call_ok("tostring(12)"), Value::string("12"));
        assert_eq!(call_ok("tonumber(\"1.50\")"), Value::number(Number::new(15, 1)));
        assert_eq!(call_ok("tobool(\"true\")"), Value::Bool(true));
        assert_eq!(call_ok("tostring(null)"), Value::null(Type::String));
        assert!(call_err("tonumber(\"abc\")").contains("a number is required"));
    }

    #[test]
    fn test_collection_conversions() {
        assert_eq!(
            call_ok("tolist([\"a\", 1])"),
            Value::list(Type::String, vec![Value::string("a"), Value::string("1")])
        );
        assert_eq!(
            call_ok("toset([2, 1, 2])"),
            Value::set(Type::Number, vec![Value::number(1), Value::number(2)])
        );
        assert_eq!(
            call_ok("tomap({a = 1})"),
            Value::map(Type::Number, [("a", Value::number(1))])
        );
    }
}
