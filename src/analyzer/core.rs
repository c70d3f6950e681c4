use thiserror::Error;

/// A grammar fragment over a slice of input items. On success it returns the
/// position after what it consumed.
pub trait Parser<I, O> {
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O>;
}

pub type ParseResult<O> = Result<(usize, O), ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error: {message}")]
    ParseError {
        message: String,
        found: String,
        position: usize,
    },
    #[error("EOF")]
    EOF,
    #[error("No alternative")]
    NoAlternative,
    #[error("Fail: {0}")]
    Fail(String),
    #[error("WithContext: {message}, {inner}")]
    WithContext {
        message: String,
        inner: Box<ParseError>,
    },
}

impl ParseError {
    /// Input position of the item that did not match, when known.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::ParseError { position, .. } => Some(*position),
            ParseError::WithContext { inner, .. } => inner.position(),
            _ => None,
        }
    }

    /// The outermost context message: what the caller was reading when
    /// the input stopped matching.
    pub fn context(&self) -> Option<&str> {
        match self {
            ParseError::WithContext { message, .. } => Some(message),
            _ => None,
        }
    }
}
