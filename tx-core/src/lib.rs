//! LDVM Transaction Core
//!
//! Signed transactions over the account layer: the generic verification and
//! settlement protocol shared by every kind, sixteen transaction kinds, and an
//! executor that applies them atomically against a block state.
//!
//! # Architecture
//!
//! - **Two phases**: `verify` only reads state, `accept` mutates it
//! - **Base settlement**: gas, nonce, fees and the base amount move in one place
//! - **Snapshot rollback**: touched accounts are restored when acceptance fails
//! - **Signed bodies**: ed25519 signatures carry their public keys
//!
//! # Invariants
//!
//! - Declared gas equals the gas computed from the encoded body
//! - Native supply is conserved; burned fees land on the zero address
//! - A rejected transaction leaves every account unchanged

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod state;
pub mod transaction;
pub mod txs;

// Re-exports
pub use config::{Config, FeeConfig};
pub use context::BlockContext;
pub use crypto::{KeyPair, Signature};
pub use error::{Error, Result};
pub use executor::TxExecutor;
pub use metrics::Metrics;
pub use state::{BlockState, MemoryState, Snapshot};
pub use transaction::{base_gas, Transaction, TxData};
