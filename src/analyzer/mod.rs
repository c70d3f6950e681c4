//! # Analyzer
//!
//! Turns source text into syntax trees. The three entry points share one
//! recursive descent [`SourceParser`] and differ only in where they start:
//!
//! * [`parse_expression`]: the whole input is a single expression.
//! * [`parse_template`]: the whole input is template text.
//! * [`parse_config`]: the whole input is a configuration body.
//!
//! Small fixed token shapes, such as a `for` header, are written as
//! [`core::Parser`] grammars from [`prelude`] and run by the cursor.
//!
//! Parsing never aborts. Syntax errors are reported as [`Diagnostics`] and
//! the returned tree contains placeholders where input could not be
//! understood.

pub mod combinators;
pub mod core;
pub mod prelude;

mod body;
mod expression;
mod grammar;
mod parser;
mod template;

pub use parser::{SourceParser, DEFAULT_MAX_DEPTH};

pub use crate::ast;

use crate::ast::{Body, Expression};
use crate::diagnostics::Diagnostics;

pub fn parse_expression(source: &str, filename: &str) -> (Expression, Diagnostics) {
    parse_expression_limited(source, filename, DEFAULT_MAX_DEPTH)
}

pub fn parse_template(source: &str, filename: &str) -> (Expression, Diagnostics) {
    parse_template_limited(source, filename, DEFAULT_MAX_DEPTH)
}

pub fn parse_config(source: &str, filename: &str) -> (Body, Diagnostics) {
    parse_config_limited(source, filename, DEFAULT_MAX_DEPTH)
}

/// [`parse_expression`] with an explicit nesting ceiling.
pub fn parse_expression_limited(
    source: &str,
    filename: &str,
    max_depth: usize,
) -> (Expression, Diagnostics) {
    let mut parser = SourceParser::new(source, filename).with_max_depth(max_depth);
    let expr = parser.parse_expression_source();
    (expr, parser.finish())
}

pub fn parse_template_limited(
    source: &str,
    filename: &str,
    max_depth: usize,
) -> (Expression, Diagnostics) {
    let mut parser = SourceParser::for_template(source, filename).with_max_depth(max_depth);
    let expr = parser.parse_template_source();
    (expr, parser.finish())
}

pub fn parse_config_limited(
    source: &str,
    filename: &str,
    max_depth: usize,
) -> (Body, Diagnostics) {
    let mut parser = SourceParser::new(source, filename).with_max_depth(max_depth);
    let body = parser.parse_config_source();
    (body, parser.finish())
}
