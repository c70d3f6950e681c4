use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::not_line_ending,
    combinator::{map, rest},
    error::context,
    sequence::{delimited, preceded},
};

use super::token::{CommentType, ParserResult, Span, Token};

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_line_comment(input: Span) -> ParserResult<Token> {
    context(
        "line comment",
        map(
            preceded(alt((tag("//"), tag("#"))), not_line_ending),
            |content: Span| Token::Comment {
                content: content.fragment().trim().to_string(),
                comment_type: CommentType::Line,
            },
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_block_comment(input: Span) -> ParserResult<Token> {
    context(
        "block comment",
        map(
            delimited(tag("/*"), take_until("*/"), tag("*/")),
            |content: Span| Token::Comment {
                content: content.fragment().to_string(),
                comment_type: CommentType::Block,
            },
        ),
    )(input)
}

// A `/*` with no matching `*/` swallows the rest of the input.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_unterminated_comment(input: Span) -> ParserResult<Token> {
    context(
        "unterminated comment",
        map(preceded(tag("/*"), rest), |content: Span| Token::Comment {
            content: content.fragment().to_string(),
            comment_type: CommentType::Unterminated,
        }),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_comment(input: Span) -> ParserResult<Token> {
    context(
        "comment",
        alt((
            parse_block_comment,
            parse_unterminated_comment,
            parse_line_comment,
        )),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_comment_stops_before_newline() {
        let (rest, token) = parse_comment(Span::new("# note\nx")).unwrap();
        assert_eq!(
            token,
            Token::Comment {
                content: "note".to_string(),
                comment_type: CommentType::Line,
            }
        );
        assert_eq!(*rest.fragment(), "\nx");
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let (rest, token) = parse_comment(Span::new("/* a\nb */x")).unwrap();
        assert_eq!(
            token,
            Token::Comment {
                content: " a\nb ".to_string(),
                comment_type: CommentType::Block,
            }
        );
        assert_eq!(rest.location_line(), 2);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (rest, token) = parse_comment(Span::new("/* open")).unwrap();
        assert!(matches!(
            token,
            Token::Comment {
                comment_type: CommentType::Unterminated,
                ..
            }
        ));
        assert!(rest.fragment().is_empty());
    }
}
