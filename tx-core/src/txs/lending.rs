use super::{
    forbid_to, require_no_payload, require_positive_amount, require_to, require_zero_amount, Tx,
    TxBase,
};
use crate::{transaction::Transaction, Error, Result};
use account_core::{LendingConfig, TokenSymbol, TxType};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Open a lending pool on the sender
#[derive(Debug)]
pub struct TxOpenLending {
    config: LendingConfig,
}

impl TxOpenLending {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        forbid_to(tx)?;
        require_zero_amount(tx)?;
        let config: LendingConfig = tx.tx.payload()?;
        config.validate()?;
        Ok(Self { config })
    }
}

impl Tx for TxOpenLending {
    fn ty(&self) -> TxType {
        TxType::OpenLending
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        base.from.check_open_lending(&self.config)?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.from.open_lending(&self.config)?;
        base.accept(&BigUint::default())
    }
}

/// Close the sender's lending pool
#[derive(Debug)]
pub struct TxCloseLending;

impl TxCloseLending {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        forbid_to(tx)?;
        require_zero_amount(tx)?;
        require_no_payload(tx)?;
        Ok(Self)
    }
}

impl Tx for TxCloseLending {
    fn ty(&self) -> TxType {
        TxType::CloseLending
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        base.from.check_close_lending()?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.from.close_lending()?;
        base.accept(&BigUint::default())
    }
}

/// Borrow payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowPayload {
    /// Borrowed token
    pub token: TokenSymbol,
    /// Borrowed amount
    pub amount: BigUint,
    /// Due time, zero for none
    pub due_time: u64,
}

/// Borrow from a lending pool
#[derive(Debug)]
pub struct TxBorrow {
    payload: BorrowPayload,
}

impl TxBorrow {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        require_to(tx)?;
        require_zero_amount(tx)?;
        let payload: BorrowPayload = tx.tx.payload()?;
        if payload.amount.is_zero() {
            return Err(Error::InvalidTx("invalid borrow amount, expected > 0".to_string()));
        }
        if !payload.token.is_valid() {
            return Err(Error::InvalidTx(format!("invalid token {}", payload.token)));
        }
        Ok(Self { payload })
    }
}

impl Tx for TxBorrow {
    fn ty(&self) -> TxType {
        TxType::Borrow
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        let p = &self.payload;
        base.to()?
            .check_borrow(&p.token, &base.from.id(), &p.amount, p.due_time)?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        let p = &self.payload;
        base.to()?
            .borrow(&p.token, &base.from.id(), &p.amount, p.due_time)?;
        base.from.add(&p.token, &p.amount);
        base.accept(&BigUint::zero())
    }
}

/// Repay a lending pool with up to the transaction amount
#[derive(Debug)]
pub struct TxRepay {
    token: TokenSymbol,
    amount: BigUint,
}

impl TxRepay {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        require_to(tx)?;
        require_positive_amount(tx)?;
        require_no_payload(tx)?;
        Ok(Self {
            token: tx.tx.token,
            amount: tx.tx.amount.clone(),
        })
    }
}

impl Tx for TxRepay {
    fn ty(&self) -> TxType {
        TxType::Repay
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        base.to()?.check_repay(&self.token, &base.from.id())?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        let actual = base.to()?.repay(&self.token, &base.from.id(), &self.amount)?;
        base.accept(&actual)
    }
}
