//! Generic transaction verification and settlement
//!
//! [`TxBase::verify`] loads the accounts a transaction touches and checks
//! everything common to all kinds: chain id, gas, role gating, sender nonce,
//! signer threshold, approver co-signature and affordability. It never
//! mutates state. [`TxBase::accept`] charges the sender, moves the base
//! amount and pays the miner tip and the burned fee.

use crate::{
    config::FeeConfig, context::BlockContext, state::BlockState, transaction::Transaction,
    transaction::TxData, Error, Result,
};
use account_core::{Account, Address, TokenSymbol};
use num_bigint::BigUint;
use num_traits::Zero;
use std::sync::Arc;

/// Loaded and verified transaction context
#[derive(Debug)]
pub struct TxBase<'a> {
    /// Signed transaction
    pub transaction: &'a Transaction,
    /// Block context
    pub ctx: &'a BlockContext,
    /// Fee schedule
    pub fees: &'a FeeConfig,
    /// Verified signer addresses
    pub signers: Vec<Address>,
    /// Sender
    pub from: Arc<Account>,
    /// Recipient, when the kind has one
    pub to: Option<Arc<Account>>,
    /// Block miner
    pub miner: Arc<Account>,
    /// Fee sink, the zero address
    pub sink: Arc<Account>,
    /// Miner tip
    pub tip: BigUint,
    /// Burned fee
    pub fee: BigUint,
}

impl<'a> TxBase<'a> {
    /// Load accounts and run the checks shared by every kind
    pub fn verify(
        transaction: &'a Transaction,
        signing_plus: bool,
        ctx: &'a BlockContext,
        fees: &'a FeeConfig,
        state: &dyn BlockState,
    ) -> Result<Self> {
        let tx = &transaction.tx;
        if tx.chain_id != ctx.chain_id {
            return Err(Error::InvalidTx(format!(
                "invalid chain id, expected {}, got {}",
                ctx.chain_id, tx.chain_id
            )));
        }
        if ctx.gas_price < fees.min_gas_price || ctx.gas_price > fees.max_gas_price {
            return Err(Error::InvalidGas(format!(
                "block gas price {} out of range [{}, {}]",
                ctx.gas_price, fees.min_gas_price, fees.max_gas_price
            )));
        }
        if tx.gas_fee_cap < ctx.gas_price {
            return Err(Error::InvalidGas(format!(
                "gas fee cap {} below gas price {}",
                tx.gas_fee_cap, ctx.gas_price
            )));
        }
        let required = tx.required_gas(fees)?;
        if tx.gas != required {
            return Err(Error::InvalidGas(format!(
                "invalid gas, expected {}, got {}",
                required, tx.gas
            )));
        }
        if tx.gas > fees.max_tx_gas {
            return Err(Error::InvalidGas(format!(
                "gas {} exceeds max tx gas {}",
                tx.gas, fees.max_tx_gas
            )));
        }

        let signers = transaction.signers()?;
        let sink = state.load_account(&Address::EMPTY)?;
        let miner = state.load_account(&ctx.miner)?;
        let from = state.load_account(&tx.from)?;
        let to = tx.to.as_ref().map(|id| state.load_account(id)).transpose()?;

        from.check_as_from(tx.ty)?;
        if let Some(to) = &to {
            to.check_as_to(tx.ty)?;
        }
        if tx.nonce != from.nonce() {
            return Err(account_core::Error::NonceMismatch {
                account: tx.from,
                expected: from.nonce(),
                actual: tx.nonce,
            }
            .into());
        }
        let signed = if signing_plus {
            from.satisfy_signing_plus(&signers)
        } else {
            from.satisfy_signing(&signers)
        };
        if !signed {
            return Err(Error::Unauthorized(format!("{} need more signatures", tx.from)));
        }
        if !from.satisfy_approving(tx.ty, &signers) {
            return Err(Error::Unauthorized(format!("{} need approver signing", tx.from)));
        }

        let gas = BigUint::from(tx.gas);
        let tip_per_gas = tx.gas_tip.min(tx.gas_fee_cap - ctx.gas_price);
        let tip = &gas * BigUint::from(tip_per_gas);
        let fee = &gas * BigUint::from(ctx.gas_price);
        let cost = &tip + &fee;

        if tx.token.is_native() {
            from.check_balance(&TokenSymbol::NATIVE, &(&tx.amount + &cost))?;
        } else {
            from.check_balance(&TokenSymbol::NATIVE, &cost)?;
            from.check_balance(&tx.token, &tx.amount)?;
        }

        tracing::debug!(
            tx_type = %tx.ty,
            from = %tx.from,
            nonce = tx.nonce,
            gas = tx.gas,
            cost = %cost,
            "Transaction verified"
        );
        Ok(Self {
            transaction,
            ctx,
            fees,
            signers,
            from,
            to,
            miner,
            sink,
            tip,
            fee,
        })
    }

    /// Unsigned body
    pub fn tx(&self) -> &TxData {
        &self.transaction.tx
    }

    /// Total charged to the sender in native units
    pub fn cost(&self) -> BigUint {
        &self.tip + &self.fee
    }

    /// Recipient, required by the kind
    pub fn to(&self) -> Result<&Arc<Account>> {
        self.to
            .as_ref()
            .ok_or_else(|| Error::InvalidTx(format!("{} requires a recipient", self.tx().ty)))
    }

    /// Addresses whose state settlement may change
    pub fn touched(&self) -> Vec<Address> {
        let mut ids = vec![self.from.id(), self.miner.id(), self.sink.id()];
        if let Some(to) = &self.to {
            ids.push(to.id());
        }
        ids
    }

    /// Charge gas, advance the sender nonce and move `amount` of the
    /// transaction token to the recipient
    pub fn accept(&self, amount: &BigUint) -> Result<()> {
        let tx = self.tx();
        self.from
            .sub_by_nonce(&TokenSymbol::NATIVE, tx.nonce, &self.cost())?;
        if !amount.is_zero() {
            let to = self.to()?;
            self.from.sub(&tx.token, amount)?;
            to.add(&tx.token, amount);
        }
        self.miner.add(&TokenSymbol::NATIVE, &self.tip);
        self.sink.add(&TokenSymbol::NATIVE, &self.fee);
        Ok(())
    }
}
