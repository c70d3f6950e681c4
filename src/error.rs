use thiserror::Error;

use crate::eval::function::FunctionError;
use crate::value::convert::ConvertError;

#[derive(Error, Debug)]
pub enum Error {
    // function calls, including the four provider operations
    #[error("{0}")]
    Function(#[from] FunctionError),
    #[error("Convert error: {0}")]
    Convert(#[from] ConvertError),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Unknown value: {0}")]
    UnknownValue(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
