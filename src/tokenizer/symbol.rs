//! # Symbol Token Handling
//!
//! Operators and delimiters of the expression language.
//!
//! Symbols are matched longest-first so that `==`, `=>` and `...` are never
//! split into shorter tokens. Precedence is the parser's concern, not ours.

use strum_macros::{AsRefStr, Display, EnumString};

use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::{map, value},
    error::context,
};

use super::token::{ParserResult, Span, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
pub enum Operator {
    #[strum(serialize = "=>")]
    FatArrow,
    #[strum(serialize = "...")]
    Ellipsis,
    #[strum(serialize = ".")]
    Dot,
    #[strum(serialize = "?")]
    Question,

    #[strum(serialize = "==")]
    EqualEqual,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,

    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "%")]
    Percent,

    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "!")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
pub enum Delimiter {
    #[strum(serialize = "{")]
    OpenBrace,
    #[strum(serialize = "}")]
    CloseBrace,
    #[strum(serialize = "(")]
    OpenParen,
    #[strum(serialize = ")")]
    CloseParen,
    #[strum(serialize = "[")]
    OpenBracket,
    #[strum(serialize = "]")]
    CloseBracket,
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = "=")]
    Equal,
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_operator(input: Span) -> ParserResult<Token> {
    context(
        "operator",
        map(
            alt((
                // multi-character operators first
                value(Operator::Ellipsis, tag("...")),
                value(Operator::FatArrow, tag("=>")),
                value(Operator::EqualEqual, tag("==")),
                value(Operator::NotEqual, tag("!=")),
                value(Operator::GreaterEqual, tag(">=")),
                value(Operator::LessEqual, tag("<=")),
                value(Operator::And, tag("&&")),
                value(Operator::Or, tag("||")),
                value(Operator::Dot, tag(".")),
                value(Operator::Question, tag("?")),
                value(Operator::Greater, tag(">")),
                value(Operator::Less, tag("<")),
                value(Operator::Plus, tag("+")),
                value(Operator::Minus, tag("-")),
                value(Operator::Star, tag("*")),
                value(Operator::Slash, tag("/")),
                value(Operator::Percent, tag("%")),
                value(Operator::Not, tag("!")),
            )),
            Token::Operator,
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_delimiter(input: Span) -> ParserResult<Token> {
    context(
        "delimiter",
        map(
            alt((
                value(Delimiter::OpenBrace, tag("{")),
                value(Delimiter::CloseBrace, tag("}")),
                value(Delimiter::OpenParen, tag("(")),
                value(Delimiter::CloseParen, tag(")")),
                value(Delimiter::OpenBracket, tag("[")),
                value(Delimiter::CloseBracket, tag("]")),
                value(Delimiter::Comma, tag(",")),
                value(Delimiter::Colon, tag(":")),
                value(Delimiter::Equal, tag("=")),
            )),
            Token::Delimiter,
        ),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_match() {
        let (rest, token) = parse_operator(Span::new("=>x")).unwrap();
        assert_eq!(token, Token::Operator(Operator::FatArrow));
        assert_eq!(*rest.fragment(), "x");

        let (_, token) = parse_operator(Span::new("...)")).unwrap();
        assert_eq!(token, Token::Operator(Operator::Ellipsis));

        let (_, token) = parse_operator(Span::new("<= 2")).unwrap();
        assert_eq!(token, Token::Operator(Operator::LessEqual));
    }

    #[test]
    fn test_equal_is_a_delimiter() {
        assert!(parse_operator(Span::new("= 1")).is_err());
        let (_, token) = parse_delimiter(Span::new("= 1")).unwrap();
        assert_eq!(token, Token::Delimiter(Delimiter::Equal));
    }

    #[test]
    fn test_display_round_trips_symbol() {
        assert_eq!(Operator::Percent.to_string(), "%");
        assert_eq!(Delimiter::CloseBrace.to_string(), "}");
        assert_eq!("!=".parse::<Operator>().unwrap(), Operator::NotEqual);
    }
}
