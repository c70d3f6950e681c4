//! # Preprocessor
//!
//! Sits between the tokenizer and the parser:
//!
//! ```text
//! Source → Tokenizer → TokenPreprocessor → Parser
//! ```
//!
//! Whitespace and comment tokens carry no meaning for the parser and are
//! dropped here. Newlines are kept because they terminate attributes and
//! block headers; the parser decides where they are significant.

use crate::tokenizer::token::TokenSpan;

/// A trait for preprocessing different types of input
pub trait Preprocessor<T, U = T> {
    /// Process the input of type T and return the processed result
    fn process(&self, input: T) -> U;
}

/// Token-specific preprocessor implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenPreprocessor;

impl TokenPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl Preprocessor<Vec<TokenSpan>> for TokenPreprocessor {
    fn process(&self, input: Vec<TokenSpan>) -> Vec<TokenSpan> {
        input
            .into_iter()
            .filter(|span| !span.token.is_comment() && !span.token.is_whitespace())
            .collect()
    }
}
