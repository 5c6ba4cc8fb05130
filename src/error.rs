//! Kestrel error types.

use crate::il;
use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("Analysis error: {0}")]
    Analysis(String),
    #[error("Basic block {0} not found in the control flow graph")]
    BlockNotFound(il::Label),
    #[error("Cannot remove block {0}: it is the entry or exit block")]
    CannotRemoveBlock(il::Label),
    #[error("The exit block must be reachable from the entry block")]
    ExitUnreachable,
    #[error("The vertex id {0} does not exist in the graph")]
    GraphVertexNotFound(usize),
    #[error("Rename vectors must have equal lengths")]
    RenameLengthMismatch,
    #[error("Custom error: {0}")]
    Custom(String),
}

impl From<&str> for Error {
    fn from(error: &str) -> Error {
        Error::Custom(error.to_string())
    }
}

impl From<String> for Error {
    fn from(error: String) -> Error {
        Error::Custom(error)
    }
}
