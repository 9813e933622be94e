use super::{require_no_payload, require_positive_amount, require_to, require_zero_amount, Tx, TxBase};
use crate::{transaction::Transaction, Error, Result};
use account_core::{Address, TokenSymbol, TxType};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Plain transfer of native currency or a token
#[derive(Debug)]
pub struct TxTransfer {
    amount: BigUint,
}

impl TxTransfer {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        require_to(tx)?;
        require_positive_amount(tx)?;
        require_no_payload(tx)?;
        Ok(Self {
            amount: tx.tx.amount.clone(),
        })
    }
}

impl Tx for TxTransfer {
    fn ty(&self) -> TxType {
        TxType::Transfer
    }

    fn verify(&self, _base: &TxBase<'_>) -> Result<()> {
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.accept(&self.amount)
    }
}

/// Cash voucher signed by the issuer, redeemable once by the payee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashPayload {
    /// One-time nonce registered in the issuer's nonce table
    pub nonce: u64,
    /// Expiry group of the nonce
    pub expire: u64,
    /// Paid token
    pub token: TokenSymbol,
    /// Paid amount
    pub amount: BigUint,
    /// Payee, must be the submitter
    pub to: Address,
}

/// Redeem a cash voucher against the issuer's nonce table
#[derive(Debug)]
pub struct TxTransferCash {
    cash: CashPayload,
}

impl TxTransferCash {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        require_to(tx)?;
        require_zero_amount(tx)?;
        let cash: CashPayload = tx.tx.payload()?;
        if cash.to != tx.tx.from {
            return Err(Error::InvalidTx(format!(
                "invalid payee, expected {}, got {}",
                tx.tx.from, cash.to
            )));
        }
        if cash.amount.is_zero() {
            return Err(Error::InvalidTx("invalid cash amount, expected > 0".to_string()));
        }
        if !cash.token.is_valid() {
            return Err(Error::InvalidTx(format!("invalid token {}", cash.token)));
        }
        if tx.ex_signatures.is_empty() {
            return Err(Error::InvalidTx("no issuer signatures".to_string()));
        }
        Ok(Self { cash })
    }
}

impl Tx for TxTransferCash {
    fn ty(&self) -> TxType {
        TxType::TransferCash
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        let issuer = base.to()?;
        let ex_signers = base.transaction.ex_signers()?;
        if !issuer.satisfy_signing(&ex_signers) {
            return Err(Error::Unauthorized(format!(
                "{} need more issuer signatures",
                issuer.id()
            )));
        }
        let cash = &self.cash;
        issuer.check_sub_by_nonce_table(&cash.token, cash.expire, cash.nonce, &cash.amount)?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        let cash = &self.cash;
        base.to()?
            .sub_by_nonce_table(&cash.token, cash.expire, cash.nonce, &cash.amount)?;
        base.from.add(&cash.token, &cash.amount);
        base.accept(&BigUint::zero())
    }
}
