//! # Whitespace Token Handling
//!
//! Spaces and tabs become [`Token::Whitespace`]; line breaks (`\n` or
//! `\r\n`) become [`Token::Newline`]. Newlines are kept all the way into the
//! parser because they terminate attribute definitions.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    combinator::map,
    error::context,
};

use super::token::{ParserResult, Span, Token};

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_whitespace(input: Span) -> ParserResult<Token> {
    context(
        "whitespace",
        map(take_while1(|c| c == ' ' || c == '\t'), |s: Span| {
            Token::Whitespace(s.fragment().to_string())
        }),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_newline(input: Span) -> ParserResult<Token> {
    context(
        "newline",
        map(alt((tag("\r\n"), tag("\n"))), |_| Token::Newline),
    )(input)
}
