use crate::eval::function::{FunctionError, FunctionSpec, Parameter};
use crate::value::{Number, Type, Value};

fn numbers(args: &[Value]) -> impl Iterator<Item = &Number> + '_ {
    args.iter().filter_map(Value::as_number)
}

fn pick(description: &str, choose: fn(Number, Number) -> Number) -> FunctionSpec {
    FunctionSpec::new(description, Type::Number, move |args| {
        numbers(args)
            .cloned()
            .reduce(choose)
            .map(Value::Number)
            .ok_or_else(|| FunctionError::call("must pass at least one number"))
    })
    .variadic(Parameter::new("numbers", Type::Number))
    .refine_result(|b| b.not_null())
}

fn unary(description: &str, f: fn(&Number) -> Number) -> FunctionSpec {
    FunctionSpec::new(description, Type::Number, move |args| {
        let n = numbers(args)
            .next()
            .ok_or_else(|| FunctionError::call("a number is required"))?;
        Ok(Value::Number(f(n)))
    })
    .param(Parameter::new("num", Type::Number))
    .refine_result(|b| b.not_null())
}

pub(super) fn max() -> FunctionSpec {
    pick("Returns the greatest of the given numbers.", Ord::max)
}

pub(super) fn min() -> FunctionSpec {
    pick("Returns the smallest of the given numbers.", Ord::min)
}

pub(super) fn abs() -> FunctionSpec {
    unary("Returns the absolute value of the given number.", |n| n.abs())
}

pub(super) fn floor() -> FunctionSpec {
    unary(
        "Returns the closest whole number that is less than or equal to the given value.",
        |n| n.floor(),
    )
}

pub(super) fn ceil() -> FunctionSpec {
    unary(
        "Returns the closest whole number that is greater than or equal to the given value.",
        |n| n.ceil(),
    )
}
