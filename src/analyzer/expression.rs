//! Expression grammar.
//!
//! Binary operators, loosest first:
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 0 | `\|\|` |
//! | 1 | `&&` |
//! | 2 | `==` `!=` |
//! | 3 | `<` `>` `<=` `>=` |
//! | 4 | `+` `-` |
//! | 5 | `*` `/` `%` |
//!
//! The conditional operator sits below all of them; unary `!` and `-` and
//! the postfix traversals (`.attr`, `[index]`, splats) bind tighter.

use crate::ast::{
    BinaryOperator, Expression, ExpressionKind, ForExpression, ObjectItem, UnaryOperator,
};
use crate::diagnostics::SourceRange;
use crate::tokenizer::{Delimiter, Keyword, Operator, Token, TokenSpan};
use crate::value::{convert::parse_number, Type, Value};

use super::grammar::{for_header, full_splat, ForHeaderErrors};
use super::parser::SourceParser;

const LEVELS: &[&[BinaryOperator]] = &[
    &[BinaryOperator::Or],
    &[BinaryOperator::And],
    &[BinaryOperator::Equal, BinaryOperator::NotEqual],
    &[
        BinaryOperator::Less,
        BinaryOperator::LessEqual,
        BinaryOperator::Greater,
        BinaryOperator::GreaterEqual,
    ],
    &[BinaryOperator::Add, BinaryOperator::Subtract],
    &[
        BinaryOperator::Multiply,
        BinaryOperator::Divide,
        BinaryOperator::Modulo,
    ],
];

fn binary_operator(token: &Token) -> Option<BinaryOperator> {
    let Token::Operator(op) = token else {
        return None;
    };
    Some(match op {
        Operator::Or => BinaryOperator::Or,
        Operator::And => BinaryOperator::And,
        Operator::EqualEqual => BinaryOperator::Equal,
        Operator::NotEqual => BinaryOperator::NotEqual,
        Operator::Less => BinaryOperator::Less,
        Operator::LessEqual => BinaryOperator::LessEqual,
        Operator::Greater => BinaryOperator::Greater,
        Operator::GreaterEqual => BinaryOperator::GreaterEqual,
        Operator::Plus => BinaryOperator::Add,
        Operator::Minus => BinaryOperator::Subtract,
        Operator::Star => BinaryOperator::Multiply,
        Operator::Slash => BinaryOperator::Divide,
        Operator::Percent => BinaryOperator::Modulo,
        _ => return None,
    })
}

fn unary_operator(token: &Token) -> Option<UnaryOperator> {
    match token {
        Token::Operator(Operator::Not) => Some(UnaryOperator::Not),
        Token::Operator(Operator::Minus) => Some(UnaryOperator::Negate),
        _ => None,
    }
}

fn precedence(op: BinaryOperator) -> usize {
    LEVELS
        .iter()
        .position(|level| level.contains(&op))
        .unwrap_or(0)
}

fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
    let range = SourceRange::between(&left.range, &right.range);
    Expression::new(
        ExpressionKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        range,
    )
}

/// Outcome of one traversal step.
enum Step {
    Continue(Expression),
    /// A splat consumed the rest of the traversal chain.
    Splat(Expression),
    Stop(Expression),
}

impl SourceParser {
    /// Parses a whole source as a single expression.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn parse_expression_source(&mut self) -> Expression {
        self.push_newlines(false);
        let expr = self.parse_expression();
        let next = self.peek().clone();
        if !matches!(next.token, Token::Eof) {
            let subject = self.range_of(&next);
            self.fail(
                "Extra characters after expression",
                "An expression was successfully parsed, but extra characters were found after it.",
                subject,
            );
        }
        self.pop_newlines();
        expr
    }

    /// Parses one expression. Every call is one level of nesting; past the
    /// ceiling nothing is consumed and the caller's recovery skips the rest.
    pub fn parse_expression(&mut self) -> Expression {
        let range = self.peek_range();
        if !self.enter(&range) {
            self.leave();
            return self.placeholder(range);
        }
        let condition = self.parse_binary();
        let expr = if self.peek().token.is_operator(Operator::Question) {
            self.parse_conditional(condition)
        } else {
            condition
        };
        self.leave();
        expr
    }

    fn parse_conditional(&mut self, condition: Expression) -> Expression {
        self.advance(); // ?
        let true_result = self.parse_expression();
        if self.accept(Delimiter::Colon).is_none() {
            let subject = self.peek_range();
            self.fail(
                "Missing false expression in conditional",
                "The conditional operator (...?...:...) requires a false expression, delimited by a colon.",
                subject,
            );
            let range = SourceRange::between(&condition.range, &true_result.range);
            return self.placeholder(range);
        }
        let false_result = self.parse_expression();
        let range = SourceRange::between(&condition.range, &false_result.range);
        Expression::new(
            ExpressionKind::Conditional {
                condition: Box::new(condition),
                true_result: Box::new(true_result),
                false_result: Box::new(false_result),
            },
            range,
        )
    }

    /// Precedence climbing with an explicit stack of pending left operands,
    /// so a long operator chain does not deepen the call stack.
    fn parse_binary(&mut self) -> Expression {
        let mut pending: Vec<(Expression, BinaryOperator, usize)> = Vec::new();
        let mut current = self.parse_operand();
        while let Some(op) = binary_operator(&self.peek().token) {
            let level = precedence(op);
            self.advance();
            while pending.last().is_some_and(|(_, _, top)| *top >= level) {
                if let Some((left, top_op, _)) = pending.pop() {
                    current = binary(top_op, left, current);
                }
            }
            pending.push((current, op, level));
            current = self.parse_operand();
        }
        while let Some((left, op, _)) = pending.pop() {
            current = binary(op, left, current);
        }
        current
    }

    /// Prefix operators, then a primary expression and its traversals. Each
    /// prefix operator is a nesting level.
    fn parse_operand(&mut self) -> Expression {
        let mut prefixes = Vec::new();
        let mut too_deep = false;
        while let Some(op) = unary_operator(&self.peek().token) {
            let span = self.advance();
            let range = self.range_of(&span);
            too_deep |= !self.enter(&range);
            prefixes.push((op, range));
        }

        let primary = self.parse_primary();
        let operand = self.parse_postfix(primary);
        for _ in &prefixes {
            self.leave();
        }
        if too_deep {
            let start = prefixes.first().map_or(&operand.range, |(_, range)| range);
            return self.placeholder(SourceRange::between(start, &operand.range));
        }
        prefixes.into_iter().rev().fold(operand, |operand, (op, range)| {
            let range = SourceRange::between(&range, &operand.range);
            Expression::new(
                ExpressionKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                range,
            )
        })
    }

    fn parse_primary(&mut self) -> Expression {
        let span = self.peek().clone();
        let range = self.range_of(&span);
        match span.token {
            Token::Number(raw) => {
                self.advance();
                self.number_literal(&raw, range)
            }
            Token::Identifier(name) => {
                self.advance();
                self.parse_named(name, range)
            }
            Token::OpenQuote => self.parse_quoted_template(),
            Token::Delimiter(Delimiter::OpenParen) => self.parse_parenthesized(),
            Token::Delimiter(Delimiter::OpenBracket) => self.parse_bracketed(),
            Token::Delimiter(Delimiter::OpenBrace) => self.parse_braced(),
            Token::Invalid(_) => {
                // the tokenizer has already described the character
                self.advance();
                self.recovery = true;
                self.placeholder(range)
            }
            Token::Eof => {
                self.fail(
                    "Missing expression",
                    "Expected the start of an expression, but found the end of the file.",
                    range.clone(),
                );
                self.placeholder(range)
            }
            _ => {
                self.fail(
                    "Invalid expression",
                    "Expected the start of an expression, but found an invalid expression token.",
                    range.clone(),
                );
                self.placeholder(range)
            }
        }
    }

    fn number_literal(&mut self, raw: &str, range: SourceRange) -> Expression {
        match parse_number(raw) {
            Some(n) => Expression::new(ExpressionKind::Literal(Value::Number(n)), range),
            None => {
                self.fail(
                    "Invalid number literal",
                    "Failed to recognize the value of this number literal.",
                    range.clone(),
                );
                self.placeholder(range)
            }
        }
    }

    /// A keyword literal, a function call or a variable.
    fn parse_named(&mut self, name: String, range: SourceRange) -> Expression {
        let literal = match name.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            "null" => Some(Value::null(Type::Dynamic)),
            _ => None,
        };
        if let Some(value) = literal {
            return Expression::new(ExpressionKind::Literal(value), range);
        }
        if self.peek_is(Delimiter::OpenParen) {
            return self.parse_function_call(name, range);
        }
        Expression::new(ExpressionKind::Variable(name), range)
    }

    /// A tuple constructor or a tuple `for` expression.
    fn parse_bracketed(&mut self) -> Expression {
        let open = self.advance();
        self.push_newlines(false);
        let expr = if self.peek().token.is_keyword(Keyword::For) {
            self.parse_for(&open, Delimiter::CloseBracket)
        } else {
            self.parse_tuple(&open)
        };
        self.pop_newlines();
        expr
    }

    /// An object constructor or an object `for` expression.
    fn parse_braced(&mut self) -> Expression {
        let open = self.advance();
        let is_for = self.peek_nth(0).token.is_keyword(Keyword::For);
        self.push_newlines(!is_for);
        let expr = if is_for {
            self.parse_for(&open, Delimiter::CloseBrace)
        } else {
            self.parse_object(&open)
        };
        self.pop_newlines();
        expr
    }

    fn parse_parenthesized(&mut self) -> Expression {
        let open = self.advance();
        let open_range = self.range_of(&open);
        self.push_newlines(false);
        let inner = self.parse_expression();
        let close = self.accept(Delimiter::CloseParen);
        self.pop_newlines();
        match close {
            Some(close) => Expression::new(
                ExpressionKind::Parenthesized(Box::new(inner)),
                SourceRange::between(&open_range, &close),
            ),
            None => {
                let subject = self.peek_range();
                self.fail(
                    "Unbalanced parentheses",
                    "Expected a closing parenthesis to terminate the expression.",
                    subject,
                );
                self.recover_to(Delimiter::CloseParen);
                self.accept(Delimiter::CloseParen);
                inner
            }
        }
    }

    fn parse_function_call(&mut self, name: String, name_range: SourceRange) -> Expression {
        self.advance(); // (
        self.push_newlines(false);
        let mut args = Vec::new();
        let mut expand_final = false;
        loop {
            if self.peek_is(Delimiter::CloseParen) {
                break;
            }
            if matches!(self.peek().token, Token::Eof) {
                self.fail(
                    "Unterminated function call",
                    "There is no closing parenthesis for this function call.",
                    name_range.clone(),
                );
                break;
            }
            args.push(self.parse_expression());
            if self.peek().token.is_operator(Operator::Ellipsis) {
                self.advance();
                expand_final = true;
                if !self.peek_is(Delimiter::CloseParen) {
                    let subject = self.peek_range();
                    self.fail(
                        "Missing closing parenthesis",
                        "An expanded function argument (with ...) must be immediately followed by closing parentheses.",
                        subject,
                    );
                    self.recover_to(Delimiter::CloseParen);
                }
                break;
            }
            if self.accept(Delimiter::Comma).is_some() {
                continue;
            }
            if !self.peek_is(Delimiter::CloseParen) {
                let subject = self.peek_range();
                self.fail(
                    "Missing argument separator",
                    "A comma is required to separate each function argument from the next.",
                    subject,
                );
                self.recover_to(Delimiter::CloseParen);
                break;
            }
        }
        let close = self.accept(Delimiter::CloseParen);
        self.pop_newlines();
        let end = close.unwrap_or_else(|| self.peek_range());
        Expression::new(
            ExpressionKind::FunctionCall {
                name,
                name_range: name_range.clone(),
                args,
                expand_final,
            },
            SourceRange::between(&name_range, &end),
        )
    }

    fn parse_tuple(&mut self, open: &TokenSpan) -> Expression {
        let open_range = self.range_of(open);
        let mut items = Vec::new();
        loop {
            if self.peek_is(Delimiter::CloseBracket) {
                break;
            }
            if matches!(self.peek().token, Token::Eof) {
                self.fail(
                    "Missing close bracket",
                    "There is no closing bracket for this tuple constructor.",
                    open_range.clone(),
                );
                break;
            }
            items.push(self.parse_expression());
            if self.accept(Delimiter::Comma).is_some() {
                continue;
            }
            if !self.peek_is(Delimiter::CloseBracket) {
                let subject = self.peek_range();
                self.fail(
                    "Missing item separator",
                    "Expected a comma to mark the beginning of the next item.",
                    subject,
                );
                self.recover_to(Delimiter::CloseBracket);
                break;
            }
        }
        let close = self
            .accept(Delimiter::CloseBracket)
            .unwrap_or_else(|| self.peek_range());
        Expression::new(
            ExpressionKind::Tuple(items),
            SourceRange::between(&open_range, &close),
        )
    }

    fn parse_object(&mut self, open: &TokenSpan) -> Expression {
        let open_range = self.range_of(open);
        let mut items = Vec::new();
        loop {
            while self.peek().token.is_newline() {
                self.advance();
            }
            if self.peek_is(Delimiter::CloseBrace) {
                break;
            }
            if matches!(self.peek().token, Token::Eof) {
                self.fail(
                    "Missing close brace",
                    "There is no closing brace for this object constructor.",
                    open_range.clone(),
                );
                break;
            }

            let key = self.parse_expression();
            // a bare identifier key names the attribute literally
            let key = match key.kind {
                ExpressionKind::Variable(name) => {
                    Expression::new(ExpressionKind::Literal(Value::String(name)), key.range)
                }
                _ => key,
            };

            if self.accept(Delimiter::Equal).is_none() && self.accept(Delimiter::Colon).is_none()
            {
                let subject = self.peek_range();
                self.fail(
                    "Missing key/value separator",
                    "Expected an equals sign (\"=\") to mark the beginning of the attribute value.",
                    subject,
                );
                self.recover_to(Delimiter::CloseBrace);
                break;
            }
            let value = self.parse_expression();
            items.push(ObjectItem { key, value });

            if self.accept(Delimiter::Comma).is_some() || self.peek().token.is_newline() {
                continue;
            }
            if !self.peek_is(Delimiter::CloseBrace) {
                let subject = self.peek_range();
                self.fail(
                    "Missing attribute separator",
                    "Expected a newline or comma to mark the beginning of the next attribute.",
                    subject,
                );
                self.recover_to(Delimiter::CloseBrace);
                break;
            }
        }
        let close = self
            .accept(Delimiter::CloseBrace)
            .unwrap_or_else(|| self.peek_range());
        Expression::new(
            ExpressionKind::Object(items),
            SourceRange::between(&open_range, &close),
        )
    }

    fn parse_for(&mut self, open: &TokenSpan, close: Delimiter) -> Expression {
        let open_range = self.range_of(open);
        let object_form = close == Delimiter::CloseBrace;
        let header = for_header(ForHeaderErrors {
            name: "For expression requires variable name after 'for'.",
            second_name: "For expression requires value variable name after comma.",
            in_keyword: "For expression requires the 'in' keyword after its name declarations.",
        });
        let (key_var, value_var) = match self.parse_with(&header) {
            Ok(names) => names,
            Err((err, subject)) => {
                let detail = err.context().unwrap_or("Invalid 'for' header.");
                self.fail("Invalid 'for' expression", detail, subject);
                return self.abandon_for(open_range, close);
            }
        };
        let collection = self.parse_expression();

        if self.accept(Delimiter::Colon).is_none() {
            let subject = self.peek_range();
            self.fail(
                "Invalid 'for' expression",
                "For expression requires a colon after the collection expression.",
                subject,
            );
            return self.abandon_for(open_range, close);
        }

        let key_expr = if object_form {
            let key = self.parse_expression();
            if !self.peek().token.is_operator(Operator::FatArrow) {
                let subject = self.peek_range();
                self.fail(
                    "Invalid 'for' expression",
                    "Key expression in 'for' expression must be followed by an arrow (=>).",
                    subject,
                );
                return self.abandon_for(open_range, close);
            }
            self.advance();
            Some(key)
        } else {
            None
        };

        let value_expr = self.parse_expression();

        let mut grouped = false;
        if self.peek().token.is_operator(Operator::Ellipsis) {
            let span = self.advance();
            if object_form {
                grouped = true;
            } else {
                let subject = self.range_of(&span);
                self.fail(
                    "Invalid 'for' expression",
                    "Grouping ellipsis (...) cannot be used in a tuple 'for' expression.",
                    subject,
                );
                return self.abandon_for(open_range, close);
            }
        }

        let condition = if self.peek().token.is_keyword(Keyword::If) {
            self.advance();
            Some(self.parse_expression())
        } else {
            None
        };

        let Some(close_range) = self.accept(close) else {
            let subject = self.peek_range();
            self.fail(
                "Invalid 'for' expression",
                "Extra characters after the end of the 'for' expression.",
                subject,
            );
            return self.abandon_for(open_range, close);
        };

        Expression::new(
            ExpressionKind::For(Box::new(ForExpression {
                key_var,
                value_var,
                collection,
                key_expr,
                value_expr,
                condition,
                grouped,
            })),
            SourceRange::between(&open_range, &close_range),
        )
    }

    fn abandon_for(&mut self, open_range: SourceRange, close: Delimiter) -> Expression {
        self.recover_to(close);
        let end = self.accept(close).unwrap_or_else(|| self.peek_range());
        self.placeholder(SourceRange::between(&open_range, &end))
    }

    pub(crate) fn parse_postfix(&mut self, mut expr: Expression) -> Expression {
        loop {
            match self.parse_traversal_step(expr, false) {
                Step::Continue(next) | Step::Splat(next) => expr = next,
                Step::Stop(done) => return done,
            }
        }
    }

    /// Parses the traversal chain applied to each element of a splat.
    fn parse_splat_each(&mut self, marker: SourceRange, attr_only: bool) -> Expression {
        let mut each = Expression::new(ExpressionKind::SplatItem, marker);
        loop {
            match self.parse_traversal_step(each, attr_only) {
                Step::Continue(next) => each = next,
                Step::Splat(done) | Step::Stop(done) => return done,
            }
        }
    }

    fn parse_traversal_step(&mut self, source: Expression, attr_only: bool) -> Step {
        let next = self.peek().token.clone();
        match next {
            Token::Operator(Operator::Dot) => {
                let dot = self.advance();
                let dot_range = self.range_of(&dot);
                let span = self.peek().clone();
                let span_range = self.range_of(&span);
                match span.token {
                    Token::Identifier(name) => {
                        self.advance();
                        let range = SourceRange::between(&source.range, &span_range);
                        Step::Continue(Expression::new(
                            ExpressionKind::GetAttr {
                                source: Box::new(source),
                                name,
                                name_range: SourceRange::between(&dot_range, &span_range),
                            },
                            range,
                        ))
                    }
                    Token::Number(raw) if !attr_only && raw.chars().all(|c| c.is_ascii_digit()) => {
                        // legacy index syntax: a.0
                        self.advance();
                        let key = match parse_number(&raw) {
                            Some(n) => Expression::new(
                                ExpressionKind::Literal(Value::Number(n)),
                                span_range.clone(),
                            ),
                            None => self.placeholder(span_range.clone()),
                        };
                        let range = SourceRange::between(&source.range, &span_range);
                        Step::Continue(Expression::new(
                            ExpressionKind::Index {
                                source: Box::new(source),
                                key: Box::new(key),
                            },
                            range,
                        ))
                    }
                    Token::Operator(Operator::Star) => {
                        self.advance();
                        let marker = SourceRange::between(&dot_range, &span_range);
                        let each = self.parse_splat_each(marker, true);
                        Step::Splat(self.splat(source, each))
                    }
                    _ => {
                        self.fail(
                            "Invalid attribute name",
                            "An attribute name is required after a dot.",
                            span_range,
                        );
                        Step::Stop(source)
                    }
                }
            }
            Token::Delimiter(Delimiter::OpenBracket) if !attr_only => {
                let open_range = self.peek_range();
                let close_range = self.range_of(self.peek_nth(2));
                if self.parse_with(&full_splat()).is_ok() {
                    let marker = SourceRange::between(&open_range, &close_range);
                    let each = self.parse_splat_each(marker, false);
                    return Step::Splat(self.splat(source, each));
                }

                self.advance();
                self.push_newlines(false);
                let key = self.parse_expression();
                let close = self.accept(Delimiter::CloseBracket);
                self.pop_newlines();
                let Some(close) = close else {
                    let subject = self.peek_range();
                    self.fail(
                        "Missing close bracket on index",
                        "The index operator must end with a closing bracket (\"]\").",
                        subject,
                    );
                    self.recover_to(Delimiter::CloseBracket);
                    self.accept(Delimiter::CloseBracket);
                    return Step::Stop(source);
                };
                let range = SourceRange::between(&source.range, &close);
                Step::Continue(Expression::new(
                    ExpressionKind::Index {
                        source: Box::new(source),
                        key: Box::new(key),
                    },
                    range,
                ))
            }
            _ => Step::Stop(source),
        }
    }

    fn splat(&self, source: Expression, each: Expression) -> Expression {
        let range = SourceRange::between(&source.range, &each.range);
        Expression::new(
            ExpressionKind::Splat {
                source: Box::new(source),
                each: Box::new(each),
            },
            range,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parse_expression;
    use pretty_assertions::assert_eq;

    fn parse_ok(src: &str) -> Expression {
        let (expr, diags) = parse_expression(src, "<src>");
        assert!(!diags.has_errors(), "unexpected diagnostics: {}", diags);
        expr
    }

    fn shape(expr: &Expression) -> String {
        match &expr.kind {
            ExpressionKind::Literal(v) => v.to_string(),
            ExpressionKind::Variable(name) => name.clone(),
            ExpressionKind::GetAttr { source, name, .. } => format!("{}.{}", shape(source), name),
            ExpressionKind::Index { source, key } => format!("{}[{}]", shape(source), shape(key)),
            ExpressionKind::Unary { op, operand } => format!("({}{})", op, shape(operand)),
            ExpressionKind::Binary { op, left, right } => {
                format!("({} {} {})", shape(left), op, shape(right))
            }
            ExpressionKind::Conditional {
                condition,
                true_result,
                false_result,
            } => format!(
                "({} ? {} : {})",
                shape(condition),
                shape(true_result),
                shape(false_result)
            ),
            ExpressionKind::FunctionCall {
                name,
                args,
                expand_final,
                ..
            } => format!(
                "{}({}{})",
                name,
                args.iter().map(shape).collect::<Vec<_>>().join(", "),
                if *expand_final { "..." } else { "" }
            ),
            ExpressionKind::Splat { source, each } => format!("{}[*]{{{}}}", shape(source), shape(each)),
            ExpressionKind::SplatItem => "@".to_string(),
            ExpressionKind::Parenthesized(inner) => shape(inner),
            ExpressionKind::Tuple(items) => {
                format!("[{}]", items.iter().map(shape).collect::<Vec<_>>().join(", "))
            }
            ExpressionKind::Object(items) => format!(
                "{{{}}}",
                items
                    .iter()
                    .map(|i| format!("{} = {}", shape(&i.key), shape(&i.value)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ExpressionKind::For(_) => "for".to_string(),
            ExpressionKind::Template(_) => "template".to_string(),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(shape(&parse_ok("1 + 2 * 3")), "(1 + (2 * 3))");
        assert_eq!(shape(&parse_ok("a || b && c")), "(a || (b && c))");
        assert_eq!(shape(&parse_ok("1 + 2 < 4 == true")), "(((1 + 2) < 4) == true)");
        assert_eq!(shape(&parse_ok("-a.b")), "(-a.b)");
        assert_eq!(shape(&parse_ok("!a ? 1 : 2")), "((!a) ? 1 : 2)");
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(shape(&parse_ok("10 - 4 - 3")), "((10 - 4) - 3)");
    }

    #[test]
    fn test_traversals_and_splats() {
        assert_eq!(shape(&parse_ok("a.b[0].c")), "a.b[0].c");
        assert_eq!(shape(&parse_ok("a.0")), "a[0]");
        assert_eq!(shape(&parse_ok("a[*].b.c")), "a[*]{@.b.c}");
        assert_eq!(shape(&parse_ok("a.*.b[0]")), "a[*]{@.b}[0]");
    }

    #[test]
    fn test_function_call_with_expansion() {
        assert_eq!(shape(&parse_ok("max(1, xs...)")), "max(1, xs...)");
        assert_eq!(shape(&parse_ok("f(\n  1,\n  2,\n)")), "f(1, 2)");
    }

    #[test]
    fn test_constructors() {
        assert_eq!(shape(&parse_ok("[1, \"a\",]")), r#"[1, template]"#);
        assert_eq!(shape(&parse_ok("{a = 1, (b) = 2\n c: 3}")), r#"{"a" = 1, b = 2, "c" = 3}"#);
    }

    #[test]
    fn test_for_expression() {
        let expr = parse_ok("{for k, v in m : v => k... if v != null}");
        let ExpressionKind::For(f) = expr.kind else {
            panic!("expected for expression");
        };
        assert_eq!(f.key_var.as_deref(), Some("k"));
        assert_eq!(f.value_var, "v");
        assert!(f.grouped);
        assert!(f.key_expr.is_some());
        assert!(f.condition.is_some());
    }

    #[test]
    fn test_ranges() {
        let expr = parse_ok("foo + bar");
        assert_eq!(expr.range.to_string(), "<src>:1,1-10");
        let ExpressionKind::Binary { right, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(right.range.to_string(), "<src>:1,7-10");
    }

    #[test]
    fn test_extra_characters() {
        let (_, diags) = parse_expression("invalid syntax", "<src>");
        assert_eq!(
            diags.to_string(),
            "<src>:1,9-15: Extra characters after expression; An expression was successfully parsed, but extra characters were found after it."
        );
    }

    #[test]
    fn test_missing_false_branch() {
        let (_, diags) = parse_expression("a ? b", "<src>");
        assert_eq!(diags.len(), 1);
        assert!(diags.to_string().contains("Missing false expression in conditional"));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let (_, diags) = parse_expression("(1 + 2", "<src>");
        assert_eq!(diags.len(), 1);
        assert!(diags.to_string().contains("Unbalanced parentheses"));
    }

    #[test]
    fn test_nesting_ceiling() {
        let src = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        let mut parser = SourceParser::new(&src, "<src>").with_max_depth(10);
        parser.parse_expression_source();
        let diags = parser.finish();
        assert_eq!(diags.len(), 1);
        assert!(diags.to_string().contains("Expression too deeply nested"));
    }
}
