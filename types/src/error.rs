//! Errors raised while constructing or parsing shared types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unknown clock mode: {0}")]
    UnknownClockMode(String),
}
