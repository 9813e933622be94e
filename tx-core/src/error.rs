//! Error types for transaction processing

use account_core::ErrorKind;
use thiserror::Error;

/// Result type for transaction operations
pub type Result<T> = std::result::Result<T, Error>;

/// Transaction errors
#[derive(Error, Debug)]
pub enum Error {
    /// Account subsystem error, surfaced unmodified
    #[error(transparent)]
    Account(#[from] account_core::Error),

    /// Malformed transaction
    #[error("Invalid transaction: {0}")]
    InvalidTx(String),

    /// Gas or fee parameters rejected
    #[error("Invalid gas: {0}")]
    InvalidGas(String),

    /// Signer set does not authorize the transaction
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    /// Payload or snapshot encoding error
    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl Error {
    /// Account error class, when the failure maps onto one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Account(err) => Some(err.kind()),
            Error::Unauthorized(_) | Error::SignatureError(_) => {
                Some(ErrorKind::AuthorizationFailure)
            }
            Error::InvalidTx(_) => Some(ErrorKind::InvalidInput),
            Error::Codec(_) => Some(ErrorKind::Codec),
            _ => None,
        }
    }
}
