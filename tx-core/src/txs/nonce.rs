use super::{forbid_to, require_zero_amount, Tx, TxBase};
use crate::{transaction::Transaction, Error, Result};
use account_core::TxType;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Most nonces registered by one transaction
pub const MAX_NONCES_PER_TX: usize = 1024;

/// Furthest expiry accepted, in seconds from the block timestamp
pub const MAX_NONCE_TABLE_EXPIRE: u64 = 30 * 24 * 3600;

/// Nonce table payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceTablePayload {
    /// Expiry group
    pub expire: u64,
    /// One-time nonces
    pub nonces: Vec<u64>,
}

/// Register one-time nonces for cash vouchers
#[derive(Debug)]
pub struct TxAddNonceTable {
    table: NonceTablePayload,
}

impl TxAddNonceTable {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        forbid_to(tx)?;
        require_zero_amount(tx)?;
        let table: NonceTablePayload = tx.tx.payload()?;
        if table.nonces.is_empty() || table.nonces.len() > MAX_NONCES_PER_TX {
            return Err(Error::InvalidTx(format!(
                "invalid nonce count, expected 1..={}, got {}",
                MAX_NONCES_PER_TX,
                table.nonces.len()
            )));
        }
        for (i, nonce) in table.nonces.iter().enumerate() {
            if table.nonces[..i].contains(nonce) {
                return Err(Error::InvalidTx(format!("duplicate nonce {}", nonce)));
            }
        }
        Ok(Self { table })
    }
}

impl Tx for TxAddNonceTable {
    fn ty(&self) -> TxType {
        TxType::AddNonceTable
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        let now = base.ctx.timestamp;
        if self.table.expire <= now || self.table.expire > now + MAX_NONCE_TABLE_EXPIRE {
            return Err(Error::InvalidTx(format!(
                "invalid expire, expected ({}, {}], got {}",
                now,
                now + MAX_NONCE_TABLE_EXPIRE,
                self.table.expire
            )));
        }
        base.from
            .check_nonce_table(self.table.expire, &self.table.nonces)?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.accept(&BigUint::default())?;
        base.from
            .add_nonce_table(self.table.expire, &self.table.nonces)?;
        Ok(())
    }
}
