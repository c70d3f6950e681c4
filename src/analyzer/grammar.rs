//! Token-level grammar fragments built from the combinator core. The
//! recursive descent parser runs them over the significant tokens at its
//! cursor with [`SourceParser::parse_with`](super::SourceParser::parse_with).

use super::{core::*, prelude::*};
use crate::tokenizer::{Delimiter, Keyword, Operator, Token};

pub fn identifier() -> impl Parser<Token, String> {
    with_context(
        satisfy(|token: &Token| match token {
            Token::Identifier(name) => Some(name.clone()),
            _ => None,
        }),
        "identifier",
    )
}

pub fn keyword(keyword: Keyword) -> impl Parser<Token, ()> {
    satisfy(move |token: &Token| token.is_keyword(keyword).then_some(()))
}

pub fn delimiter(delimiter: Delimiter) -> impl Parser<Token, ()> {
    as_unit(equal(Token::Delimiter(delimiter)))
}

pub fn operator(operator: Operator) -> impl Parser<Token, ()> {
    as_unit(equal(Token::Operator(operator)))
}

/// What to say for each way a `for` header can be malformed.
pub struct ForHeaderErrors {
    pub name: &'static str,
    pub second_name: &'static str,
    pub in_keyword: &'static str,
}

/// `for name in` or `for key, value in`, giving the optional key variable
/// and the value variable.
pub fn for_header(errors: ForHeaderErrors) -> impl Parser<Token, (Option<String>, String)> {
    map(
        tuple3(
            preceded(keyword(Keyword::For), with_context(identifier(), errors.name)),
            committed(
                delimiter(Delimiter::Comma),
                with_context(identifier(), errors.second_name),
            ),
            with_context(keyword(Keyword::In), errors.in_keyword),
        ),
        |(first, second, ()): (String, Option<String>, ())| match second {
            Some(value) => (Some(first), value),
            None => (None, first),
        },
    )
}

/// The `[*]` full splat marker.
pub fn full_splat() -> impl Parser<Token, ()> {
    as_unit(tuple3(
        delimiter(Delimiter::OpenBracket),
        operator(Operator::Star),
        delimiter(Delimiter::CloseBracket),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Token {
        Token::Identifier(name.to_string())
    }

    const ERRORS: ForHeaderErrors = ForHeaderErrors {
        name: "name",
        second_name: "second",
        in_keyword: "in",
    };

    #[test]
    fn test_for_header_forms() {
        let input = vec![ident("for"), ident("v"), ident("in"), ident("xs")];
        assert_eq!(
            for_header(ERRORS).parse(&input, 0),
            Ok((3, (None, "v".to_string())))
        );

        let input = vec![
            ident("for"),
            ident("k"),
            Token::Delimiter(Delimiter::Comma),
            ident("v"),
            ident("in"),
        ];
        assert_eq!(
            for_header(ERRORS).parse(&input, 0),
            Ok((5, (Some("k".to_string()), "v".to_string())))
        );
    }

    #[test]
    fn test_for_header_failures_name_their_token() {
        let input = vec![ident("for"), Token::Number("1".to_string())];
        let err = for_header(ERRORS).parse(&input, 0).unwrap_err();
        assert_eq!((err.context(), err.position()), (Some("name"), Some(1)));

        let input = vec![
            ident("for"),
            ident("k"),
            Token::Delimiter(Delimiter::Comma),
            Token::Eof,
        ];
        let err = for_header(ERRORS).parse(&input, 0).unwrap_err();
        assert_eq!((err.context(), err.position()), (Some("second"), Some(3)));

        let input = vec![ident("for"), ident("v"), Token::Delimiter(Delimiter::Colon)];
        let err = for_header(ERRORS).parse(&input, 0).unwrap_err();
        assert_eq!((err.context(), err.position()), (Some("in"), Some(2)));
    }

    #[test]
    fn test_full_splat() {
        let input = vec![
            Token::Delimiter(Delimiter::OpenBracket),
            Token::Operator(Operator::Star),
            Token::Delimiter(Delimiter::CloseBracket),
        ];
        assert_eq!(full_splat().parse(&input, 0), Ok((3, ())));
        assert!(full_splat().parse(&input[..2], 0).is_err());
    }
}
