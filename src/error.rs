use thiserror::Error;

use crate::codegen::EmitError;
use crate::diagnostic::ParseError;
use crate::driver::DriverError;
use crate::pp::PPError;
use crate::source::Position;

/// Any failure of a translation run
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Preprocessor(#[from] PPError),
    #[error("{0}")]
    Parser(#[from] ParseError),
    #[error("{0}")]
    Emit(#[from] EmitError),
    #[error("{0}")]
    Driver(#[from] DriverError),
}

impl Error {
    /// Where in the (preprocessed) text the error was raised, when known.
    pub fn location(&self) -> Option<Position> {
        match self {
            Error::Preprocessor(e) => Some(e.location()),
            Error::Parser(e) => Some(e.location()),
            Error::Emit(_) | Error::Driver(_) => None,
        }
    }
}
