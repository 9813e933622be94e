use super::{require_native, require_no_payload, require_to, require_zero_amount, Tx, TxBase};
use crate::{transaction::Transaction, Error, Result};
use account_core::{Accounter, TokenSymbol, TxType};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Token creation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTokenPayload {
    /// Governance of the new token account
    pub accounter: Accounter,
    /// Fixed maximum supply, minted to the token account
    pub max_total_supply: BigUint,
}

/// Create a token account; the transaction amount is the pledge
#[derive(Debug)]
pub struct TxCreateToken {
    payload: CreateTokenPayload,
    pledge: BigUint,
}

impl TxCreateToken {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        require_to(tx)?;
        require_native(tx)?;
        let payload: CreateTokenPayload = tx.tx.payload()?;
        let token = tx
            .tx
            .to
            .map(|to| TokenSymbol::from_address(&to))
            .unwrap_or(TokenSymbol::NATIVE);
        if token.is_native() || !token.is_valid() {
            return Err(Error::InvalidTx(format!("invalid token account {}", token)));
        }
        payload.accounter.validate(true)?;
        Ok(Self {
            payload,
            pledge: tx.tx.amount.clone(),
        })
    }
}

impl Tx for TxCreateToken {
    fn ty(&self) -> TxType {
        TxType::CreateToken
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        let min = base.fees.token_pledge();
        if self.pledge < min {
            return Err(Error::InvalidTx(format!(
                "invalid pledge, expected >= {}, got {}",
                min, self.pledge
            )));
        }
        base.to()?
            .check_create_token(&self.payload.accounter, &self.payload.max_total_supply)?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.to()?.create_token(
            self.pledge.clone(),
            &self.payload.accounter,
            &self.payload.max_total_supply,
        )?;
        base.accept(&self.pledge)
    }
}

/// Destroy a token account once its whole supply is back home
#[derive(Debug)]
pub struct TxDestroyToken;

impl TxDestroyToken {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        require_to(tx)?;
        require_zero_amount(tx)?;
        require_no_payload(tx)?;
        Ok(Self)
    }
}

impl Tx for TxDestroyToken {
    fn ty(&self) -> TxType {
        TxType::DestroyToken
    }

    fn signing_plus(&self) -> bool {
        true
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        base.from.check_destroy_token(&base.to()?.id())?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.accept(&BigUint::default())?;
        base.from.destroy_token(base.to()?)?;
        Ok(())
    }
}
