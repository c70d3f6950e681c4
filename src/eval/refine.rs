//! What an operator result is known to be when an operand is unknown.
//!
//! Each binary operator has one rule in [`RULES`]. A rule receives the
//! operands after conversion to the operator's parameter type, at least one
//! of them unknown, and returns the most precise result it can: sometimes a
//! known value (`false && x`), otherwise a refined unknown.

use crate::ast::BinaryOperator;
use crate::value::{Number, Type, Value};

type Rule = fn(&Value, &Value) -> Value;

const RULES: &[(BinaryOperator, Rule)] = &[
    (BinaryOperator::Add, add),
    (BinaryOperator::Subtract, subtract),
    (BinaryOperator::Multiply, number_not_null),
    (BinaryOperator::Divide, number_not_null),
    (BinaryOperator::Modulo, number_not_null),
    (BinaryOperator::Less, less),
    (BinaryOperator::LessEqual, less_equal),
    (BinaryOperator::Greater, greater),
    (BinaryOperator::GreaterEqual, greater_equal),
    (BinaryOperator::Equal, equal),
    (BinaryOperator::NotEqual, not_equal),
    (BinaryOperator::And, and),
    (BinaryOperator::Or, or),
];

/// Applies the rule for `op`.
pub fn binary(op: BinaryOperator, left: &Value, right: &Value) -> Value {
    RULES
        .iter()
        .find(|(candidate, _)| *candidate == op)
        .map(|(_, rule)| rule(left, right))
        .unwrap_or_else(Value::dynamic)
}

/// `-x` for an unknown number: bounds flip.
pub fn negate(operand: &Value) -> Value {
    let (lower, upper) = bounds(operand);
    let mut builder = Value::unknown(Type::Number).refine().not_null();
    if let Some(upper) = upper {
        builder = builder.number_lower_bound(-upper);
    }
    if let Some(lower) = lower {
        builder = builder.number_upper_bound(-lower);
    }
    builder.new_value()
}

/// `!x` for an unknown bool.
pub fn not(_operand: &Value) -> Value {
    unknown_bool()
}

fn bounds(value: &Value) -> (Option<Number>, Option<Number>) {
    match value {
        Value::Number(n) => (Some(n.clone()), Some(n.clone())),
        Value::Unknown(_, r) => (r.number_lower.clone(), r.number_upper.clone()),
        _ => (None, None),
    }
}

fn unknown_bool() -> Value {
    Value::unknown(Type::Bool).refine_not_null()
}

fn number_not_null(_: &Value, _: &Value) -> Value {
    Value::unknown(Type::Number).refine_not_null()
}

fn bounded_number(lower: Option<Number>, upper: Option<Number>) -> Value {
    let mut builder = Value::unknown(Type::Number).refine().not_null();
    if let Some(lower) = lower {
        builder = builder.number_lower_bound(lower);
    }
    if let Some(upper) = upper {
        builder = builder.number_upper_bound(upper);
    }
    builder.new_value()
}

fn add(left: &Value, right: &Value) -> Value {
    let (l_lo, l_hi) = bounds(left);
    let (r_lo, r_hi) = bounds(right);
    let lower = l_lo.zip(r_lo).map(|(a, b)| &a + &b);
    let upper = l_hi.zip(r_hi).map(|(a, b)| &a + &b);
    bounded_number(lower, upper)
}

fn subtract(left: &Value, right: &Value) -> Value {
    let (l_lo, l_hi) = bounds(left);
    let (r_lo, r_hi) = bounds(right);
    let lower = l_lo.zip(r_hi).map(|(a, b)| &a - &b);
    let upper = l_hi.zip(r_lo).map(|(a, b)| &a - &b);
    bounded_number(lower, upper)
}

/// `left < right` decided from bounds where possible.
fn less(left: &Value, right: &Value) -> Value {
    let (l_lo, l_hi) = bounds(left);
    let (r_lo, r_hi) = bounds(right);
    if matches!((&l_hi, &r_lo), (Some(a), Some(b)) if a < b) {
        return Value::Bool(true);
    }
    if matches!((&l_lo, &r_hi), (Some(a), Some(b)) if a >= b) {
        return Value::Bool(false);
    }
    unknown_bool()
}

fn less_equal(left: &Value, right: &Value) -> Value {
    let (l_lo, l_hi) = bounds(left);
    let (r_lo, r_hi) = bounds(right);
    if matches!((&l_hi, &r_lo), (Some(a), Some(b)) if a <= b) {
        return Value::Bool(true);
    }
    if matches!((&l_lo, &r_hi), (Some(a), Some(b)) if a > b) {
        return Value::Bool(false);
    }
    unknown_bool()
}

fn greater(left: &Value, right: &Value) -> Value {
    less(right, left)
}

fn greater_equal(left: &Value, right: &Value) -> Value {
    less_equal(right, left)
}

fn equal(left: &Value, right: &Value) -> Value {
    match left.raw_equal(right) {
        Some(b) => Value::Bool(b),
        // a value refined as not null never equals null
        None if (left.is_null() && right.is_definitely_not_null())
            || (right.is_null() && left.is_definitely_not_null()) =>
        {
            Value::Bool(false)
        }
        None => unknown_bool(),
    }
}

fn not_equal(left: &Value, right: &Value) -> Value {
    match equal(left, right) {
        Value::Bool(b) => Value::Bool(!b),
        other => other,
    }
}

fn and(left: &Value, right: &Value) -> Value {
    if left.as_bool() == Some(false) || right.as_bool() == Some(false) {
        return Value::Bool(false);
    }
    unknown_bool()
}

fn or(left: &Value, right: &Value) -> Value {
    if left.as_bool() == Some(true) || right.as_bool() == Some(true) {
        return Value::Bool(true);
    }
    unknown_bool()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Refinement;
    use pretty_assertions::assert_eq;

    fn bounded(lower: i64, upper: i64) -> Value {
        Value::unknown(Type::Number)
            .refine()
            .not_null()
            .number_range_inclusive(Number::from(lower), Number::from(upper))
            .new_value()
    }

    #[test]
    fn test_every_binary_operator_has_a_rule() {
        use BinaryOperator::*;
        for op in [
            Or, And, Equal, NotEqual, Less, LessEqual, Greater, GreaterEqual, Add, Subtract,
            Multiply, Divide, Modulo,
        ] {
            assert!(RULES.iter().any(|(o, _)| *o == op), "no rule for {}", op);
        }
    }

    #[test]
    fn test_arithmetic_is_not_null() {
        let result = binary(
            BinaryOperator::Multiply,
            &Value::unknown(Type::Number),
            &Value::number(2),
        );
        assert_eq!(result, Value::unknown(Type::Number).refine_not_null());
    }

    #[test]
    fn test_add_propagates_bounds() {
        let result = binary(BinaryOperator::Add, &bounded(1, 5), &Value::number(10));
        let r = Refinement::of_value(&result);
        assert_eq!(r.number_lower, Some(Number::from(11)));
        assert_eq!(r.number_upper, Some(Number::from(15)));
    }

    #[test]
    fn test_subtract_crosses_bounds() {
        let result = binary(BinaryOperator::Subtract, &bounded(1, 5), &bounded(0, 2));
        let r = Refinement::of_value(&result);
        assert_eq!(r.number_lower, Some(Number::from(-1)));
        assert_eq!(r.number_upper, Some(Number::from(5)));
    }

    #[test]
    fn test_comparison_decided_by_bounds() {
        assert_eq!(
            binary(BinaryOperator::Less, &bounded(1, 5), &Value::number(6)),
            Value::Bool(true)
        );
        assert_eq!(
            binary(BinaryOperator::GreaterEqual, &bounded(1, 5), &Value::number(6)),
            Value::Bool(false)
        );
        assert_eq!(
            binary(BinaryOperator::Less, &bounded(1, 5), &Value::number(3)),
            unknown_bool()
        );
    }

    #[test]
    fn test_null_comparison_with_not_null_unknown() {
        let unk = Value::unknown(Type::String).refine_not_null();
        let null = Value::null(Type::Dynamic);
        assert_eq!(binary(BinaryOperator::Equal, &unk, &null), Value::Bool(false));
        assert_eq!(binary(BinaryOperator::NotEqual, &null, &unk), Value::Bool(true));
        assert_eq!(
            binary(BinaryOperator::Equal, &Value::unknown(Type::String), &null),
            unknown_bool()
        );
    }

    #[test]
    fn test_logic_short_circuits_on_known_operand() {
        let unk = Value::unknown(Type::Bool);
        assert_eq!(binary(BinaryOperator::And, &unk, &Value::Bool(false)), Value::Bool(false));
        assert_eq!(binary(BinaryOperator::Or, &Value::Bool(true), &unk), Value::Bool(true));
        assert_eq!(binary(BinaryOperator::Or, &Value::Bool(false), &unk), unknown_bool());
    }

    #[test]
    fn test_negate_flips_bounds() {
        let r = Refinement::of_value(&negate(&bounded(1, 5)));
        assert_eq!(r.number_lower, Some(Number::from(-5)));
        assert_eq!(r.number_upper, Some(Number::from(-1)));
    }
}
