//! # Literal Token Handling
//!
//! Number literals and the literal runs of template text.
//!
//! ## Template Text
//!
//! Inside a quoted string the tokenizer alternates between literal text and
//! template sequences (`${ ... }` interpolations and `%{ ... }` directives).
//! A literal run ends at the closing quote, at a line break, or at the start
//! of a template sequence. The escapes `$${` and `%%{` produce a literal `${`
//! and `%{` respectively.
//!
//! Quoted strings additionally understand backslash escapes:
//!
//! | Escape | Meaning |
//! |--------|---------|
//! | `\n` `\r` `\t` | line feed, carriage return, tab |
//! | `\"` `\\` | quote, backslash |
//! | `\uNNNN` | Unicode scalar from 4 hex digits |
//! | `\UNNNNNNNN` | Unicode scalar from 8 hex digits |
//!
//! Bare templates (the whole input is a template) take backslashes literally.

use nom::{
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, recognize},
    error::{context, ErrorKind, ParseError, VerboseError},
    sequence::{pair, tuple},
    InputTake,
};

use super::token::{ParserResult, Span, Token};

/// A run of template text with escapes already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralChunk {
    pub value: String,
    /// Escape selectors that were not recognized, in order of appearance.
    pub invalid_escapes: Vec<String>,
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_number(input: Span) -> ParserResult<Token> {
    context(
        "number",
        map(
            recognize(tuple((
                digit1,
                opt(pair(char('.'), digit1)),
                opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
            ))),
            |raw: Span| Token::Number(raw.fragment().to_string()),
        ),
    )(input)
}

/// Scans literal template text. `quoted` selects string-literal rules.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_template_text(input: Span, quoted: bool) -> ParserResult<LiteralChunk> {
    let text: &str = input.fragment();
    let mut value = String::new();
    let mut invalid_escapes = Vec::new();
    let mut end = text.len();
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '\n' if quoted => {
                end = i;
                break;
            }
            '\r' if quoted && text[i..].starts_with("\r\n") => {
                end = i;
                break;
            }
            '$' | '%' => {
                let after = &text[i + 1..];
                if after.starts_with(c) && after[1..].starts_with('{') {
                    // `$${` or `%%{`
                    value.push(c);
                    value.push('{');
                    chars.next();
                    chars.next();
                } else if after.starts_with('{') {
                    end = i;
                    break;
                } else {
                    value.push(c);
                }
            }
            '\\' if quoted => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, 't')) => value.push('\t'),
                Some((_, '"')) => value.push('"'),
                Some((_, '\\')) => value.push('\\'),
                Some((j, selector @ ('u' | 'U'))) => {
                    let width = if selector == 'u' { 4 } else { 8 };
                    let digits: String = text[j + 1..]
                        .chars()
                        .take(width)
                        .take_while(|d| d.is_ascii_hexdigit())
                        .collect();
                    let decoded = if digits.len() == width {
                        u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
                    } else {
                        None
                    };
                    match decoded {
                        Some(ch) => {
                            value.push(ch);
                            for _ in 0..width {
                                chars.next();
                            }
                        }
                        None => {
                            invalid_escapes.push(format!("{}{}", selector, digits));
                            value.push('\\');
                            value.push(selector);
                        }
                    }
                }
                Some((j, '\n')) | Some((j, '\r')) => {
                    // a line break cannot be escaped; let the string end here
                    invalid_escapes.push(String::from("\\"));
                    end = j;
                    break;
                }
                Some((_, other)) => {
                    invalid_escapes.push(other.to_string());
                    value.push('\\');
                    value.push(other);
                }
                None => {
                    invalid_escapes.push(String::from("\\"));
                    value.push('\\');
                }
            },
            _ => value.push(c),
        }
    }

    if end == 0 {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::TakeWhile1,
        )));
    }
    // `end` is a byte offset; `take` would count chars
    let (rest, _) = input.take_split(end);
    Ok((
        rest,
        LiteralChunk {
            value,
            invalid_escapes,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(input: &str) -> (String, LiteralChunk) {
        let (rest, chunk) = parse_template_text(Span::new(input), true).unwrap();
        (rest.fragment().to_string(), chunk)
    }

    #[test]
    fn test_number_forms() {
        for (input, expected) in [("42", "42"), ("3.25)", "3.25"), ("1e3 ", "1e3"), ("2.5E-2", "2.5E-2")] {
            let (_, token) = parse_number(Span::new(input)).unwrap();
            assert_eq!(token, Token::Number(expected.to_string()));
        }
    }

    #[test]
    fn test_number_does_not_swallow_attribute_dot() {
        let (rest, token) = parse_number(Span::new("0.name")).unwrap();
        assert_eq!(token, Token::Number("0".to_string()));
        assert_eq!(*rest.fragment(), ".name");
    }

    #[test]
    fn test_text_stops_at_interpolation() {
        let (rest, chunk) = quoted("foo-${bar}\"");
        assert_eq!(chunk.value, "foo-");
        assert_eq!(rest, "${bar}\"");
    }

    #[test]
    fn test_escaped_template_sequences() {
        let (rest, chunk) = quoted("$${a} %%{b}\"");
        assert_eq!(chunk.value, "${a} %{b}");
        assert_eq!(rest, "\"");
    }

    #[test]
    fn test_backslash_escapes() {
        let (_, chunk) = quoted(r#"a\tb\"cé\U0001F600""#);
        assert_eq!(chunk.value, "a\tb\"c\u{e9}\u{1F600}");
        assert!(chunk.invalid_escapes.is_empty());
    }

    #[test]
    fn test_invalid_escape_is_recorded() {
        let (_, chunk) = quoted(r#"a\qb""#);
        assert_eq!(chunk.invalid_escapes, vec!["q".to_string()]);
        assert_eq!(chunk.value, "a\\qb");
    }

    #[test]
    fn test_bare_text_keeps_quotes_and_newlines() {
        let (rest, chunk) = parse_template_text(Span::new("say \"hi\"\n\\n${x}"), false).unwrap();
        assert_eq!(chunk.value, "say \"hi\"\n\\n");
        assert_eq!(*rest.fragment(), "${x}");
    }

    #[test]
    fn test_non_ascii_text_splits_at_byte_offset() {
        let (rest, chunk) = quoted("Zoë-${x}\"");
        assert_eq!(chunk.value, "Zoë-");
        assert_eq!(rest, "${x}\"");

        let (rest, chunk) = quoted("héllo\"\nnext");
        assert_eq!(chunk.value, "héllo");
        assert_eq!(rest, "\"\nnext");

        let (rest, chunk) = parse_template_text(Span::new("é-${x}!"), false).unwrap();
        assert_eq!(chunk.value, "é-");
        assert_eq!(*rest.fragment(), "${x}!");
    }

    #[test]
    fn test_empty_text_is_an_error() {
        assert!(parse_template_text(Span::new("${x}"), true).is_err());
    }
}
