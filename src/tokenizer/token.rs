use std::sync::Arc;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::satisfy,
    combinator::{map, recognize, value},
    error::{context, VerboseError},
    sequence::pair,
    IResult, InputTake,
};
use nom_locate::LocatedSpan;

use super::{
    comment::parse_comment,
    literal::{parse_number, parse_template_text},
    symbol::{parse_delimiter, parse_operator, Delimiter, Operator},
    whitespace::{parse_newline, parse_whitespace},
};
use crate::diagnostics::{Diagnostic, Diagnostics, Pos, SourceRange};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Identifiers (keywords included, see `Token::keyword`)
    Identifier(String),
    // Literals
    Number(String),
    // Symbols
    Operator(Operator),
    Delimiter(Delimiter),
    // Templates
    OpenQuote,
    CloseQuote,
    TemplateLiteral(String),
    TemplateInterp { strip: bool },
    TemplateControl { strip: bool },
    TemplateSeqEnd { strip: bool },
    // Formatting
    Whitespace(String),
    Newline,
    Comment {
        content: String,
        comment_type: CommentType,
    },
    // Anything the language does not use
    Invalid(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentType {
    Line,         // // or #
    Block,        // /* */
    Unterminated, // /* without */
}

impl Token {
    pub fn is_comment(&self) -> bool {
        matches!(self, Token::Comment { .. })
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self, Token::Whitespace(_))
    }

    pub fn is_newline(&self) -> bool {
        matches!(self, Token::Newline)
    }

    pub fn is_delimiter(&self, delimiter: Delimiter) -> bool {
        matches!(self, Token::Delimiter(d) if *d == delimiter)
    }

    pub fn is_operator(&self, operator: Operator) -> bool {
        matches!(self, Token::Operator(o) if *o == operator)
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Token::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

/// What the tokenizer is currently looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Inside `"..."`.
    Quoted,
    /// A whole input that is template text.
    Bare,
    /// Inside `${ ... }` or `%{ ... }`; `depth` counts open braces.
    Sequence { depth: usize },
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    filename: Arc<str>,
    modes: Vec<Mode>,
    diagnostics: Diagnostics,
}

impl Tokenizer {
    /// A tokenizer for expressions and configuration bodies.
    pub fn new(filename: impl Into<Arc<str>>) -> Self {
        Self {
            filename: filename.into(),
            modes: vec![Mode::Normal],
            diagnostics: Diagnostics::new(),
        }
    }

    /// A tokenizer whose input is template text from the first character.
    pub fn for_template(filename: impl Into<Arc<str>>) -> Self {
        Self {
            filename: filename.into(),
            modes: vec![Mode::Bare],
            diagnostics: Diagnostics::new(),
        }
    }

    /// Diagnostics for malformed characters, escapes and comments.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Splits `input` into positioned tokens. The final token is always a
    /// zero-width [`Token::Eof`]. Tokenization never fails; unusable input
    /// becomes [`Token::Invalid`] plus a diagnostic.
    #[tracing::instrument(level = "debug", skip(self, input))]
    pub fn tokenize(&mut self, input: &str) -> Vec<TokenSpan> {
        let mut tokens = Vec::new();
        let mut remaining = Span::new(input);

        while !remaining.fragment().is_empty() {
            let start = position(&remaining);
            let mode = self.modes.last().copied().unwrap_or(Mode::Normal);
            let (new_remaining, token) = match mode {
                Mode::Quoted => self.next_template(remaining, true),
                Mode::Bare => self.next_template(remaining, false),
                Mode::Normal => self.next_code(remaining, None),
                Mode::Sequence { depth } => self.next_code(remaining, Some(depth)),
            };
            let end = position(&new_remaining);
            self.check_token(&token, start, end);
            tokens.push(TokenSpan { token, start, end });
            remaining = new_remaining;
        }

        let end = position(&remaining);
        tokens.push(TokenSpan {
            token: Token::Eof,
            start: end,
            end,
        });
        tracing::debug!("tokenized {} tokens", tokens.len());
        tokens
    }

    fn next_code<'a>(&mut self, input: Span<'a>, depth: Option<usize>) -> (Span<'a>, Token) {
        if depth == Some(0) {
            if let Ok((rest, token)) = parse_sequence_end(input) {
                self.modes.pop();
                return (rest, token);
            }
        }

        let result = alt((
            // Formatting
            parse_whitespace,
            parse_newline,
            parse_comment,
            // Literals
            parse_number,
            parse_open_quote,
            // Code elements
            parse_operator,
            parse_delimiter,
            parse_identifier,
        ))(input);

        match result {
            Ok((rest, token)) => {
                match (&token, depth) {
                    (Token::OpenQuote, _) => self.modes.push(Mode::Quoted),
                    (Token::Delimiter(Delimiter::OpenBrace), Some(depth)) => {
                        self.set_depth(depth + 1)
                    }
                    (Token::Delimiter(Delimiter::CloseBrace), Some(depth)) => {
                        self.set_depth(depth.saturating_sub(1))
                    }
                    _ => {}
                }
                (rest, token)
            }
            Err(_) => invalid_char(input),
        }
    }

    fn next_template<'a>(&mut self, input: Span<'a>, quoted: bool) -> (Span<'a>, Token) {
        if quoted {
            if let Ok((rest, _)) = tag::<_, _, VerboseError<Span>>("\"")(input) {
                self.modes.pop();
                return (rest, Token::CloseQuote);
            }
            if let Ok((rest, token)) = parse_newline(input) {
                // quoted strings cannot span lines; the parser reports it
                self.modes.pop();
                return (rest, token);
            }
        }
        if let Ok((rest, token)) = parse_sequence_start(input) {
            self.modes.push(Mode::Sequence { depth: 0 });
            return (rest, token);
        }
        match parse_template_text(input, quoted) {
            Ok((rest, chunk)) => {
                for selector in chunk.invalid_escapes {
                    let range = SourceRange::new(
                        self.filename.clone(),
                        position(&input),
                        position(&rest),
                    );
                    self.diagnostics.push(
                        Diagnostic::error(
                            "Invalid escape sequence",
                            format!(
                                "The symbol {:?} is not a valid escape sequence selector.",
                                selector
                            ),
                        )
                        .with_subject(range),
                    );
                }
                (rest, Token::TemplateLiteral(chunk.value))
            }
            Err(_) => {
                let (rest, token) = invalid_char(input);
                match token {
                    Token::Invalid(c) => (rest, Token::TemplateLiteral(c.to_string())),
                    other => (rest, other),
                }
            }
        }
    }

    fn set_depth(&mut self, depth: usize) {
        if let Some(mode) = self.modes.last_mut() {
            *mode = Mode::Sequence { depth };
        }
    }

    fn check_token(&mut self, token: &Token, start: Pos, end: Pos) {
        let range = SourceRange::new(self.filename.clone(), start, end);
        match token {
            Token::Invalid(c) => self.diagnostics.push(
                Diagnostic::error(
                    "Invalid character",
                    format!("This character ({:?}) is not used within the language.", c),
                )
                .with_subject(range),
            ),
            Token::Comment {
                comment_type: CommentType::Unterminated,
                ..
            } => self.diagnostics.push(
                Diagnostic::error(
                    "Unterminated comment",
                    "There is no closing marker (\"*/\") for this multi-line comment.",
                )
                .with_subject(SourceRange::new(range.filename.clone(), start, start)),
            ),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpan {
    pub token: Token,
    pub start: Pos,
    pub end: Pos,
}

impl TokenSpan {
    pub fn range(&self, filename: &Arc<str>) -> SourceRange {
        SourceRange::new(filename.clone(), self.start, self.end)
    }
}

pub type Span<'a> = LocatedSpan<&'a str>;

pub type ParserResult<'a, T> = IResult<Span<'a>, T, VerboseError<Span<'a>>>;

fn position(span: &Span) -> Pos {
    Pos::new(
        span.location_line() as usize,
        span.get_utf8_column(),
        span.location_offset(),
    )
}

fn invalid_char(input: Span) -> (Span, Token) {
    match input.fragment().chars().next() {
        Some(c) => (input.take_split(c.len_utf8()).0, Token::Invalid(c)),
        None => (input, Token::Eof),
    }
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_identifier(input: Span) -> ParserResult<Token> {
    context(
        "identifier",
        map(
            recognize(pair(
                satisfy(|c: char| c.is_alphabetic() || c == '_'),
                take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
            )),
            |id: Span| Token::Identifier(id.fragment().to_string()),
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_open_quote(input: Span) -> ParserResult<Token> {
    context("open quote", value(Token::OpenQuote, tag("\"")))(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_sequence_start(input: Span) -> ParserResult<Token> {
    context(
        "template sequence start",
        alt((
            value(Token::TemplateInterp { strip: true }, tag("${~")),
            value(Token::TemplateInterp { strip: false }, tag("${")),
            value(Token::TemplateControl { strip: true }, tag("%{~")),
            value(Token::TemplateControl { strip: false }, tag("%{")),
        )),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_sequence_end(input: Span) -> ParserResult<Token> {
    context(
        "template sequence end",
        alt((
            value(Token::TemplateSeqEnd { strip: true }, tag("~}")),
            value(Token::TemplateSeqEnd { strip: false }, tag("}")),
        )),
    )(input)
}
