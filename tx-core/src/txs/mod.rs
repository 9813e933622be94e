//! Transaction kinds
//!
//! Every kind decodes its payload and runs its stateless checks in
//! [`decode`], verifies against state through the subsystem `check_*` entry
//! points only, and mutates state in `accept`.

mod base;
mod lending;
mod nonce;
mod stake;
mod token;
mod transfer;
mod update;

pub use base::TxBase;
pub use lending::{BorrowPayload, TxBorrow, TxCloseLending, TxOpenLending, TxRepay};
pub use nonce::{NonceTablePayload, TxAddNonceTable, MAX_NONCE_TABLE_EXPIRE, MAX_NONCES_PER_TX};
pub use stake::{
    CreateStakePayload, TakeStakePayload, TxCreateStake, TxDestroyStake, TxResetStake,
    TxTakeStake, TxUpdateStakeApprover, TxWithdrawStake, UpdateStakeApproverPayload,
    WithdrawStakePayload,
};
pub use token::{CreateTokenPayload, TxCreateToken, TxDestroyToken};
pub use transfer::{CashPayload, TxTransfer, TxTransferCash};
pub use update::TxUpdateAccountInfo;

use crate::{transaction::Transaction, Error, Result};
use account_core::TxType;
use num_traits::Zero;
use std::fmt;

/// Behaviour of one transaction kind
pub trait Tx: fmt::Debug + Send + Sync {
    /// Transaction kind
    fn ty(&self) -> TxType;

    /// Require one signature above the sender's threshold
    fn signing_plus(&self) -> bool {
        false
    }

    /// Kind-specific checks against state, without mutation
    fn verify(&self, base: &TxBase<'_>) -> Result<()>;

    /// Apply the kind's state transition together with base settlement
    fn accept(&self, base: &TxBase<'_>) -> Result<()>;
}

/// Run stateless checks and decode the kind of `tx`
pub fn decode(tx: &Transaction) -> Result<Box<dyn Tx>> {
    tx.syntactic_verify()?;
    let kind: Box<dyn Tx> = match tx.ty() {
        TxType::Transfer => Box::new(TxTransfer::decode(tx)?),
        TxType::TransferCash => Box::new(TxTransferCash::decode(tx)?),
        TxType::AddNonceTable => Box::new(TxAddNonceTable::decode(tx)?),
        TxType::UpdateAccountInfo => Box::new(TxUpdateAccountInfo::decode(tx)?),
        TxType::CreateToken => Box::new(TxCreateToken::decode(tx)?),
        TxType::DestroyToken => Box::new(TxDestroyToken::decode(tx)?),
        TxType::CreateStake => Box::new(TxCreateStake::decode(tx)?),
        TxType::ResetStake => Box::new(TxResetStake::decode(tx)?),
        TxType::DestroyStake => Box::new(TxDestroyStake::decode(tx)?),
        TxType::TakeStake => Box::new(TxTakeStake::decode(tx)?),
        TxType::WithdrawStake => Box::new(TxWithdrawStake::decode(tx)?),
        TxType::UpdateStakeApprover => Box::new(TxUpdateStakeApprover::decode(tx)?),
        TxType::OpenLending => Box::new(TxOpenLending::decode(tx)?),
        TxType::CloseLending => Box::new(TxCloseLending::decode(tx)?),
        TxType::Borrow => Box::new(TxBorrow::decode(tx)?),
        TxType::Repay => Box::new(TxRepay::decode(tx)?),
    };
    Ok(kind)
}

fn require_to(tx: &Transaction) -> Result<()> {
    if tx.tx.to.is_none() {
        return Err(Error::InvalidTx(format!("{} requires a recipient", tx.ty())));
    }
    Ok(())
}

fn forbid_to(tx: &Transaction) -> Result<()> {
    if tx.tx.to.is_some() {
        return Err(Error::InvalidTx(format!("{} takes no recipient", tx.ty())));
    }
    Ok(())
}

fn require_zero_amount(tx: &Transaction) -> Result<()> {
    if !tx.tx.amount.is_zero() {
        return Err(Error::InvalidTx(format!(
            "invalid amount, expected 0, got {}",
            tx.tx.amount
        )));
    }
    Ok(())
}

fn require_positive_amount(tx: &Transaction) -> Result<()> {
    if tx.tx.amount.is_zero() {
        return Err(Error::InvalidTx("invalid amount, expected > 0".to_string()));
    }
    Ok(())
}

fn require_native(tx: &Transaction) -> Result<()> {
    if !tx.tx.token.is_native() {
        return Err(Error::InvalidTx(format!(
            "invalid token, expected native, got {}",
            tx.tx.token
        )));
    }
    Ok(())
}

fn require_no_payload(tx: &Transaction) -> Result<()> {
    if !tx.tx.data.is_empty() {
        return Err(Error::InvalidTx(format!("{} takes no payload", tx.ty())));
    }
    Ok(())
}
