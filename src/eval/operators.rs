use crate::ast::{BinaryOperator, Expression, ExpressionKind, UnaryOperator};
use crate::diagnostics::{Diagnostics, SourceRange};
use crate::value::{convert::convert, Type, Value};

use super::{refine, Evaluator};

fn operand_type(op: BinaryOperator) -> Type {
    if op.is_logical() {
        Type::Bool
    } else if op.is_equality() {
        Type::Dynamic
    } else {
        Type::Number
    }
}

fn result_type(op: BinaryOperator) -> Type {
    if op.is_arithmetic() {
        Type::Number
    } else {
        Type::Bool
    }
}

impl Evaluator {
    /// Left-associative chains nest down their left operand. The spine is
    /// walked with a loop so that `a + b + c + ...` costs one nesting level
    /// however long it is.
    pub(super) fn eval_binary(&mut self, expr: &Expression, diags: &mut Diagnostics) -> Value {
        let mut spine = Vec::new();
        let mut leftmost = expr;
        while let ExpressionKind::Binary { op, left, right } = &leftmost.kind {
            spine.push((*op, right.as_ref(), &leftmost.range));
            leftmost = left;
        }

        let mut lhs = self.eval(leftmost, diags);
        let mut lhs_range = &leftmost.range;
        for (op, right, range) in spine.into_iter().rev() {
            let rhs = self.eval(right, diags);
            lhs = self.combine(op, (&lhs, lhs_range), (&rhs, &right.range), range, diags);
            lhs_range = range;
        }
        lhs
    }

    fn combine(
        &mut self,
        op: BinaryOperator,
        (lhs, lhs_range): (&Value, &SourceRange),
        (rhs, rhs_range): (&Value, &SourceRange),
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Value {
        let param = operand_type(op);
        let lhs = self.operand(lhs, &param, "left", lhs_range, diags);
        let rhs = self.operand(rhs, &param, "right", rhs_range, diags);
        let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
            return Value::unknown(result_type(op));
        };

        if op.is_equality() {
            return refine::binary(op, &lhs, &rhs);
        }
        if lhs.is_null() || rhs.is_null() {
            return self.operation_failed("argument must not be null", op, range, diags);
        }
        if !lhs.is_known() || !rhs.is_known() {
            return refine::binary(op, &lhs, &rhs);
        }

        match apply(op, &lhs, &rhs) {
            Ok(value) => value,
            Err(message) => self.operation_failed(message, op, range, diags),
        }
    }

    pub(super) fn eval_unary(
        &mut self,
        op: UnaryOperator,
        operand: &Expression,
        diags: &mut Diagnostics,
    ) -> Value {
        let ty = match op {
            UnaryOperator::Not => Type::Bool,
            UnaryOperator::Negate => Type::Number,
        };
        let raw = self.eval(operand, diags);
        let Some(value) = self.operand(&raw, &ty, "unary", &operand.range, diags) else {
            return Value::unknown(ty);
        };
        match (op, value) {
            (_, Value::Null(_)) => {
                self.error(
                    diags,
                    "Operation failed",
                    "Error during operation: argument must not be null.",
                    &operand.range,
                );
                Value::unknown(ty)
            }
            (UnaryOperator::Not, Value::Bool(b)) => Value::Bool(!b),
            (UnaryOperator::Negate, Value::Number(n)) => Value::Number(-n),
            (UnaryOperator::Not, unknown) => refine::not(&unknown),
            (UnaryOperator::Negate, unknown) => refine::negate(&unknown),
        }
    }

    /// Converts an operand to the operator's parameter type, reporting a
    /// failure against the operand itself.
    fn operand(
        &self,
        value: &Value,
        ty: &Type,
        side: &str,
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Option<Value> {
        match convert(value, ty) {
            Ok(value) => Some(value),
            Err(err) => {
                self.error(
                    diags,
                    "Invalid operand",
                    format!("Unsuitable value for {} operand: {}.", side, err),
                    range,
                );
                None
            }
        }
    }

    fn operation_failed(
        &self,
        message: &str,
        op: BinaryOperator,
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Value {
        self.error(
            diags,
            "Operation failed",
            format!("Error during operation: {}.", message),
            range,
        );
        Value::unknown(result_type(op))
    }
}

/// Applies `op` to two known, non-null operands already converted to its
/// parameter type.
fn apply(op: BinaryOperator, lhs: &Value, rhs: &Value) -> Result<Value, &'static str> {
    use BinaryOperator::*;

    if op.is_logical() {
        let (Some(a), Some(b)) = (lhs.as_bool(), rhs.as_bool()) else {
            return Err("bool required");
        };
        return Ok(Value::Bool(if op == And { a && b } else { a || b }));
    }

    let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
        return Err("number required");
    };
    match op {
        Add => Ok(Value::Number(a + b)),
        Subtract => Ok(Value::Number(a - b)),
        Multiply => Ok(Value::Number(a * b)),
        Divide => a.checked_div(b).map(Value::Number).ok_or("divide by zero"),
        Modulo => a.checked_rem(b).map(Value::Number).ok_or("divide by zero"),
        Less => Ok(Value::Bool(a < b)),
        LessEqual => Ok(Value::Bool(a <= b)),
        Greater => Ok(Value::Bool(a > b)),
        GreaterEqual => Ok(Value::Bool(a >= b)),
        Or | And | Equal | NotEqual => Err("unsupported operator"),
    }
}
