use std::fmt;

use crate::engine;

/// One or more records of a single engine stream reported an error.
#[derive(Debug, PartialEq, Eq)]
pub struct StreamFailure {
    /// Distinct messages in the order they were first reported.
    pub errors: Vec<String>,
}

impl fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "problem executing Docker: {}", self.errors.join(". "))
    }
}

impl std::error::Error for StreamFailure {}

#[derive(Debug)]
pub enum Error {
    /// The engine call itself failed, before or while streaming.
    Engine(engine::Error),
    Stream(StreamFailure),
}

impl From<engine::Error> for Error {
    fn from(value: engine::Error) -> Self {
        Error::Engine(value)
    }
}

impl From<StreamFailure> for Error {
    fn from(value: StreamFailure) -> Self {
        Error::Stream(value)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Engine(error) => write!(f, "{error}"),
            Error::Stream(failure) => write!(f, "{failure}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Engine(error) => Some(error),
            Error::Stream(_) => None,
        }
    }
}
