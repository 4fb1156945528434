//! Error model shared by every fallible operation in this crate.

use thiserror::Error;

/// Result alias used throughout the crate's public API.
pub type Result<T> = core::result::Result<T, Error>;

/// Error kinds returned by this crate's operations.
///
/// Every variant maps to a fail-fast, synchronous condition; no operation
/// retries or produces partial output once one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("invalid format: {reason}")]
    InvalidFormat { reason: String },

    #[error("insufficient data: expected at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("insufficient buffer: expected at least {needed} bytes, got {available}")]
    InsufficientBuffer { needed: usize, available: usize },

    #[error("encode parameter not set")]
    ParameterNotSet,

    #[error("unclassified internal error: {reason}")]
    Unclassified { reason: String },
}

impl Error {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Error::InvalidFormat {
            reason: reason.into(),
        }
    }
}
