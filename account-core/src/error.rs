//! Error types for account state

use crate::types::{Address, TokenSymbol};
use num_bigint::BigUint;
use thiserror::Error;

/// Result type for account operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of account errors.
///
/// The transaction layer surfaces errors unmodified; callers that need to
/// branch on the failure class (mempool eviction, retry after a lock time)
/// match on the kind instead of the concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed configuration or arguments
    InvalidInput,
    /// Spendable balance below the requested amount
    InsufficientBalance,
    /// Account role mismatch or invariant violation
    InvalidRoleState,
    /// Sequential nonce mismatch
    NonceMismatch,
    /// One-time nonce already registered
    NonceExists,
    /// One-time nonce not registered
    NonceNotFound,
    /// Nonce table group limit reached
    TooManyNonceGroups,
    /// Signer threshold or approver requirement unmet
    AuthorizationFailure,
    /// Lock time or due time not respected
    TimeLockViolation,
    /// Running total would exceed a configured maximum
    CapacityExceeded,
    /// Persisted bytes could not be encoded or decoded
    Codec,
}

/// Account errors
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid argument or configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Spendable balance too low
    #[error("Insufficient {token} balance of {account}, expected {expected}, got {actual}")]
    InsufficientBalance {
        /// Account being debited
        account: Address,
        /// Token being debited
        token: TokenSymbol,
        /// Requested amount
        expected: BigUint,
        /// Spendable amount
        actual: BigUint,
    },

    /// Role mismatch or broken invariant
    #[error("Invalid role state: {0}")]
    InvalidRoleState(String),

    /// Sequential nonce mismatch
    #[error("Nonce mismatch for {account}, expected {expected}, got {actual}")]
    NonceMismatch {
        /// Account whose nonce was checked
        account: Address,
        /// Current account nonce
        expected: u64,
        /// Supplied nonce
        actual: u64,
    },

    /// One-time nonce already registered in the expiry group
    #[error("Nonce {nonce} exists at {expire}")]
    NonceExists {
        /// Expiry group
        expire: u64,
        /// Duplicated nonce
        nonce: u64,
    },

    /// One-time nonce missing from the expiry group
    #[error("Nonce {nonce} not exists at {expire}")]
    NonceNotFound {
        /// Expiry group
        expire: u64,
        /// Missing nonce
        nonce: u64,
    },

    /// Too many live expiry groups
    #[error("Too many nonce table groups, expected <= {max}")]
    TooManyNonceGroups {
        /// Group limit
        max: usize,
    },

    /// The ledger entry approver must co-sign
    #[error("{0} need approver signing")]
    NeedApproverSigning(Address),

    /// Lock or due time violated
    #[error("Time lock violation: {0}")]
    TimeLocked(String),

    /// Running total above a configured maximum
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Lending pool still has borrowers
    #[error("Lending pool {0} has outstanding borrows, repay required")]
    RepayRequired(Address),

    /// Nothing borrowed by the account
    #[error("{from} has nothing to repay in lending pool {pool}")]
    NothingToRepay {
        /// Lending pool account
        pool: Address,
        /// Borrower
        from: Address,
    },

    /// Token supply is held outside the token account
    #[error("Token {token} supply still in use, expected {expected}, got {actual}")]
    SupplyStillInUse {
        /// Token symbol
        token: TokenSymbol,
        /// Declared max total supply
        expected: BigUint,
        /// Amount held by the token account
        actual: BigUint,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Error::InvalidRoleState(_)
            | Error::RepayRequired(_)
            | Error::SupplyStillInUse { .. } => ErrorKind::InvalidRoleState,
            Error::NonceMismatch { .. } => ErrorKind::NonceMismatch,
            Error::NonceExists { .. } => ErrorKind::NonceExists,
            Error::NonceNotFound { .. } => ErrorKind::NonceNotFound,
            Error::TooManyNonceGroups { .. } => ErrorKind::TooManyNonceGroups,
            Error::NeedApproverSigning(_) => ErrorKind::AuthorizationFailure,
            Error::TimeLocked(_) => ErrorKind::TimeLockViolation,
            Error::CapacityExceeded(_) => ErrorKind::CapacityExceeded,
            Error::NothingToRepay { .. } => ErrorKind::InvalidInput,
            Error::Serialization(_) => ErrorKind::Codec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        let err = Error::NonceExists { expire: 10, nonce: 1 };
        assert_eq!(err.kind(), ErrorKind::NonceExists);
        assert_eq!(err.to_string(), "Nonce 1 exists at 10");

        let err = Error::NeedApproverSigning(Address::EMPTY);
        assert_eq!(err.kind(), ErrorKind::AuthorizationFailure);

        let err = Error::RepayRequired(Address::EMPTY);
        assert_eq!(err.kind(), ErrorKind::InvalidRoleState);
    }
}
