//! LDVM Account Core
//!
//! Per-address account state for the ledger VM: balances, sequential and
//! one-time nonces, multisig governance, token issuance, stake pools and
//! lending pools.
//!
//! # Architecture
//!
//! - **Tagged roles**: an account is plain, a token issuer or a stake pool;
//!   role state lives inside the role variant, lending is orthogonal
//! - **Per-account locking**: every account owns a reader/writer lock, checks
//!   share it and mutations hold it exclusively
//! - **Check/mutate pairs**: every mutation has a side-effect free check that
//!   runs the same validation
//! - **Deterministic persistence**: bincode records, ledgers stored apart
//!
//! # Invariants
//!
//! - Token and stake accounts keep `balance >= pledge`
//! - A failed mutation leaves the account unchanged
//! - Stake bonus is shared pro rata across the ledger
//! - At most 64 live nonce groups per account

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod account;
pub mod amount;
pub mod codec;
pub mod error;
pub mod lending;
pub mod nonce;
pub mod signing;
pub mod stake;
pub mod token;
pub mod types;

// Re-exports
pub use account::{Account, AccountState, Accounter, Role, MAX_KEEPERS};
pub use error::{Error, ErrorKind, Result};
pub use lending::{calc_borrow_total, LendingConfig, LendingEntry};
pub use nonce::MAX_NONCE_GROUPS;
pub use stake::{StakeConfig, StakeEntry};
pub use types::{Address, StakeSymbol, TokenSymbol, TxType, ADDRESS_LEN};
