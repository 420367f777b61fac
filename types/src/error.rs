//! Errors produced while parsing protocol types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid hex character {0:?}")]
    InvalidHex(char),

    #[error("invalid length: expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
