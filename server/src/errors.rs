//! Crate-local error type. I/O and codec failures at socket boundaries are
//! folded into one enum so session threads can propagate with `?` and the
//! binary entry point can report a single line and a nonzero exit code.

use shared::CodecError;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum ServerError {
    Io(io::Error),
    Codec(CodecError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Io(e) => write!(f, "I/O error: {e}"),
            ServerError::Codec(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<io::Error> for ServerError {
    fn from(e: io::Error) -> Self {
        ServerError::Io(e)
    }
}

impl From<CodecError> for ServerError {
    fn from(e: CodecError) -> Self {
        ServerError::Codec(e)
    }
}
