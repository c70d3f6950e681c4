//! # Tokenizer
//!
//! Converts source text into [`token::TokenSpan`]s carrying line, column and
//! byte positions. The tokenizer is modal: it switches into template mode at
//! a `"` and back into expression mode at `${` or `%{`, tracking brace depth
//! so that object constructors inside interpolations are not mistaken for
//! the end of the sequence.
//!
//! Tokenization never fails. Problems are recorded as diagnostics and the
//! parser sees an [`token::Token::Invalid`] token in their place.

pub mod comment;
pub mod keyword;
pub mod literal;
pub mod symbol;
pub mod token;
pub mod whitespace;

pub use keyword::Keyword;
pub use symbol::{Delimiter, Operator};
pub use token::{Token, TokenSpan, Tokenizer};
