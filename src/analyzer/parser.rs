use std::sync::Arc;

use crate::ast::{Expression, ExpressionKind};
use crate::diagnostics::{Diagnostic, Diagnostics, SourceRange};
use crate::preprocessor::{Preprocessor, TokenPreprocessor};
use crate::tokenizer::{Delimiter, Token, TokenSpan, Tokenizer};
use crate::value::Value;

use super::core::{ParseError, Parser};

pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Significant tokens offered to a token grammar at once.
const GRAMMAR_WINDOW: usize = 8;

/// Recursive descent parser over a preprocessed token stream.
///
/// Newlines are significant at the top level of a configuration body and
/// inside object constructors, and ignored inside parentheses, brackets and
/// template sequences. The parser keeps a stack of that setting; every
/// bracketing construct pushes on entry and pops on exit.
///
/// After the first syntax error the parser enters recovery: it keeps going
/// to produce a best-effort tree but suppresses follow-on errors, which are
/// almost always consequences of the first.
#[derive(Debug)]
pub struct SourceParser {
    tokens: Vec<TokenSpan>,
    pos: usize,
    pub(crate) filename: Arc<str>,
    newline_stack: Vec<bool>,
    depth: usize,
    max_depth: usize,
    pub(crate) recovery: bool,
    diagnostics: Diagnostics,
}

impl SourceParser {
    /// A parser for expressions and configuration bodies.
    pub fn new(source: &str, filename: &str) -> Self {
        Self::from_tokenizer(Tokenizer::new(filename), source, filename)
    }

    /// A parser whose whole input is template text.
    pub fn for_template(source: &str, filename: &str) -> Self {
        Self::from_tokenizer(Tokenizer::for_template(filename), source, filename)
    }

    fn from_tokenizer(mut tokenizer: Tokenizer, source: &str, filename: &str) -> Self {
        let spans = tokenizer.tokenize(source);
        let tokens = TokenPreprocessor::new().process(spans);
        Self {
            tokens,
            pos: 0,
            filename: Arc::from(filename),
            newline_stack: vec![false],
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            recovery: false,
            diagnostics: tokenizer.take_diagnostics(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub(crate) fn finish(self) -> Diagnostics {
        self.diagnostics
    }

    // --- newline significance -------------------------------------------

    pub(crate) fn push_newlines(&mut self, include: bool) {
        self.newline_stack.push(include);
    }

    pub(crate) fn pop_newlines(&mut self) {
        if self.newline_stack.len() > 1 {
            self.newline_stack.pop();
        }
    }

    fn include_newlines(&self) -> bool {
        self.newline_stack.last().copied().unwrap_or(false)
    }

    // --- cursor -----------------------------------------------------------

    fn last_index(&self) -> usize {
        self.tokens.len().saturating_sub(1)
    }

    /// Index of the `n`th significant token from the cursor.
    fn significant_index(&self, n: usize) -> usize {
        let include = self.include_newlines();
        let mut idx = self.pos;
        let mut remaining = n;
        loop {
            while !include && idx < self.last_index() && self.tokens[idx].token.is_newline() {
                idx += 1;
            }
            if remaining == 0 || idx >= self.last_index() {
                return idx.min(self.last_index());
            }
            remaining -= 1;
            idx += 1;
        }
    }

    pub(crate) fn peek(&self) -> &TokenSpan {
        &self.tokens[self.significant_index(0)]
    }

    pub(crate) fn peek_nth(&self, n: usize) -> &TokenSpan {
        &self.tokens[self.significant_index(n)]
    }

    /// The next token, newlines included regardless of context.
    pub(crate) fn peek_raw(&self) -> &TokenSpan {
        &self.tokens[self.pos.min(self.last_index())]
    }

    pub(crate) fn advance(&mut self) -> TokenSpan {
        let idx = self.significant_index(0);
        self.pos = (idx + 1).min(self.last_index());
        self.tokens[idx].clone()
    }

    pub(crate) fn advance_raw(&mut self) -> TokenSpan {
        let idx = self.pos.min(self.last_index());
        if idx < self.last_index() {
            self.pos = idx + 1;
        }
        self.tokens[idx].clone()
    }

    /// Runs a token grammar over the significant tokens at the cursor. On
    /// success the cursor moves past what the grammar consumed. On failure
    /// it stays put and the error comes with the range of the token that
    /// did not match.
    pub(crate) fn parse_with<O>(
        &mut self,
        grammar: &impl Parser<Token, O>,
    ) -> Result<O, (ParseError, SourceRange)> {
        let window: Vec<Token> = (0..GRAMMAR_WINDOW)
            .map(|n| self.peek_nth(n).token.clone())
            .collect();
        match grammar.parse(&window, 0) {
            Ok((consumed, value)) => {
                for _ in 0..consumed {
                    self.advance();
                }
                Ok(value)
            }
            Err(err) => {
                let at = err.position().unwrap_or(0);
                let range = self.range_of(self.peek_nth(at));
                Err((err, range))
            }
        }
    }

    pub(crate) fn range_of(&self, span: &TokenSpan) -> SourceRange {
        span.range(&self.filename)
    }

    pub(crate) fn peek_range(&self) -> SourceRange {
        self.range_of(self.peek())
    }

    pub(crate) fn peek_is(&self, delimiter: Delimiter) -> bool {
        self.peek().token.is_delimiter(delimiter)
    }

    /// Consumes the delimiter if it is next.
    pub(crate) fn accept(&mut self, delimiter: Delimiter) -> Option<SourceRange> {
        if self.peek_is(delimiter) {
            let span = self.advance();
            Some(self.range_of(&span))
        } else {
            None
        }
    }

    // --- diagnostics --------------------------------------------------------

    /// Records a diagnostic unless the parser is already recovering.
    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        if !self.recovery {
            self.diagnostics.push(diagnostic);
        }
    }

    /// Records a syntax error and enters recovery.
    pub(crate) fn fail(&mut self, summary: &str, detail: &str, subject: SourceRange) {
        self.report(Diagnostic::error(summary, detail).with_subject(subject));
        self.recovery = true;
    }

    /// Stand-in for an expression that could not be parsed. It evaluates
    /// to an unknown so evaluation adds no further noise.
    pub(crate) fn placeholder(&self, range: SourceRange) -> Expression {
        Expression::new(ExpressionKind::Literal(Value::dynamic()), range)
    }

    // --- nesting ------------------------------------------------------------

    pub(crate) fn enter(&mut self, range: &SourceRange) -> bool {
        self.depth += 1;
        if self.depth > self.max_depth {
            self.fail(
                "Expression too deeply nested",
                &format!(
                    "This expression is nested more than {} levels deep.",
                    self.max_depth
                ),
                range.clone(),
            );
            return false;
        }
        true
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // --- recovery -----------------------------------------------------------

    /// Skips to the matching `close` delimiter without consuming it.
    pub(crate) fn recover_to(&mut self, close: Delimiter) {
        let mut nesting = 0usize;
        loop {
            let token = self.peek_raw().token.clone();
            match token {
                Token::Eof => return,
                Token::Delimiter(d) if d == close && nesting == 0 => return,
                _ => {}
            }
            if opens(&token) {
                nesting += 1;
            } else if closes(&token) {
                nesting = nesting.saturating_sub(1);
            }
            self.advance_raw();
        }
    }

    /// Skips the rest of a malformed body item, up to and including the next
    /// newline at the same nesting level.
    pub(crate) fn recover_after_body_item(&mut self) {
        self.recovery = true;
        let mut nesting = 0usize;
        loop {
            let token = self.peek_raw().token.clone();
            match token {
                Token::Eof => return,
                Token::Newline if nesting == 0 => {
                    self.advance_raw();
                    return;
                }
                Token::Delimiter(Delimiter::CloseBrace) if nesting == 0 => return,
                _ => {}
            }
            if opens(&token) {
                nesting += 1;
            } else if closes(&token) {
                nesting = nesting.saturating_sub(1);
            }
            self.advance_raw();
        }
    }
}

pub(super) fn opens(token: &Token) -> bool {
    matches!(
        token,
        Token::Delimiter(Delimiter::OpenBrace | Delimiter::OpenBracket | Delimiter::OpenParen)
            | Token::OpenQuote
            | Token::TemplateInterp { .. }
            | Token::TemplateControl { .. }
    )
}

pub(super) fn closes(token: &Token) -> bool {
    matches!(
        token,
        Token::Delimiter(Delimiter::CloseBrace | Delimiter::CloseBracket | Delimiter::CloseParen)
            | Token::CloseQuote
            | Token::TemplateSeqEnd { .. }
    )
}
