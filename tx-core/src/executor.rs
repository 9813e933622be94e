//! Transaction executor
//!
//! Drives one transaction through decode, base verification, kind
//! verification and acceptance. `check` is a dry run used for admission;
//! `apply` snapshots the touched accounts first and restores them if any
//! step of the settlement fails, so a rejected transaction leaves no trace.

use crate::{
    config::Config,
    context::BlockContext,
    metrics::Metrics,
    state::BlockState,
    transaction::Transaction,
    txs::{self, Tx, TxBase},
    Error, Result,
};

/// Transaction executor
#[derive(Debug)]
pub struct TxExecutor {
    /// Configuration
    config: Config,

    /// Metrics collector
    metrics: Metrics,
}

impl TxExecutor {
    /// Create an executor with its own metrics registry
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let metrics = Metrics::new()?;
        tracing::info!(chain_id = config.chain_id, "Transaction executor initialized");
        Ok(Self { config, metrics })
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Verify `tx` against current state without mutating anything
    pub fn check(
        &self,
        tx: &Transaction,
        ctx: &BlockContext,
        state: &dyn BlockState,
    ) -> Result<()> {
        let ty = tx.ty().as_str();
        match self.prepare(tx, ctx, state) {
            Ok(_) => {
                self.metrics.record_checked(ty);
                Ok(())
            }
            Err(err) => {
                self.metrics.record_rejected(ty);
                tracing::warn!(tx_type = ty, from = %tx.tx.from, error = %err, "Transaction rejected");
                Err(err)
            }
        }
    }

    /// Verify and apply `tx`; on failure every touched account is restored
    pub fn apply(
        &self,
        tx: &Transaction,
        ctx: &BlockContext,
        state: &dyn BlockState,
    ) -> Result<()> {
        let ty = tx.ty().as_str();
        match self.execute(tx, ctx, state) {
            Ok(()) => {
                self.metrics.record_accepted(ty);
                tracing::info!(
                    tx_type = ty,
                    from = %tx.tx.from,
                    nonce = tx.tx.nonce,
                    height = ctx.height,
                    "Transaction applied"
                );
                Ok(())
            }
            Err(err) => {
                self.metrics.record_rejected(ty);
                tracing::warn!(tx_type = ty, from = %tx.tx.from, error = %err, "Transaction rejected");
                Err(err)
            }
        }
    }

    fn prepare<'a>(
        &'a self,
        tx: &'a Transaction,
        ctx: &'a BlockContext,
        state: &dyn BlockState,
    ) -> Result<(Box<dyn Tx>, TxBase<'a>)> {
        if ctx.chain_id != self.config.chain_id {
            return Err(Error::Config(format!(
                "block chain id {} differs from configured {}",
                ctx.chain_id, self.config.chain_id
            )));
        }
        let kind = txs::decode(tx)?;
        let base = TxBase::verify(tx, kind.signing_plus(), ctx, &self.config.fees, state)?;
        kind.verify(&base)?;
        Ok((kind, base))
    }

    fn execute(&self, tx: &Transaction, ctx: &BlockContext, state: &dyn BlockState) -> Result<()> {
        let (kind, base) = self.prepare(tx, ctx, state)?;
        settle(kind.as_ref(), &base, state)
    }
}

fn settle(kind: &dyn Tx, base: &TxBase<'_>, state: &dyn BlockState) -> Result<()> {
    let snapshot = state.snapshot(&base.touched())?;
    if let Err(err) = kind.accept(base) {
        tracing::debug!(accounts = snapshot.len(), "Rolling back failed settlement");
        state.restore(snapshot)?;
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crypto::KeyPair, state::MemoryState, transaction::TxData};
    use account_core::{Address, TokenSymbol, TxType};
    use num_bigint::BigUint;
    use num_traits::Zero;
    use std::sync::Arc;

    fn context() -> BlockContext {
        BlockContext {
            height: 1,
            timestamp: 1_000,
            miner: Address::new([9u8; 20]),
            gas_price: 10_000,
            chain_id: 2357,
        }
    }

    fn signed_transfer(key: &KeyPair, to: Address, amount: u64) -> Transaction {
        let fees = Config::default().fees;
        let mut data = TxData::new(TxType::Transfer, 2357, key.address(), Some(to));
        data.gas_fee_cap = 10_000;
        data.amount = BigUint::from(amount);
        data.fill_gas(&fees).unwrap();
        let mut tx = Transaction::new(data);
        tx.sign(key).unwrap();
        tx
    }

    /// Settles the base amount, then fails
    #[derive(Debug)]
    struct FailingAccept;

    impl Tx for FailingAccept {
        fn ty(&self) -> TxType {
            TxType::Transfer
        }

        fn verify(&self, _base: &TxBase<'_>) -> Result<()> {
            Ok(())
        }

        fn accept(&self, base: &TxBase<'_>) -> Result<()> {
            base.accept(&base.tx().amount)?;
            Err(Error::InvalidTx("late failure".to_string()))
        }
    }

    #[test]
    fn test_failed_settlement_rolls_back() {
        let fees = Config::default().fees;
        let state = MemoryState::new(context(), fees.clone());
        let key = KeyPair::from_seed(&[1u8; 32]);
        let bob = Address::new([2u8; 20]);
        let funds = BigUint::from(1_000_000_000_000u64);
        state
            .load_account(&key.address())
            .unwrap()
            .add(&TokenSymbol::NATIVE, &funds);

        let tx = signed_transfer(&key, bob, 1_000);
        let ctx = context();
        let alice = state.load_account(&key.address()).unwrap();
        let miner = state.load_account(&ctx.miner).unwrap();
        let base = TxBase::verify(&tx, false, &ctx, &fees, &state).unwrap();
        assert!(settle(&FailingAccept, &base, &state).is_err());

        // handles held across the failure see the restored state
        assert_eq!(alice.balance(), funds);
        assert_eq!(alice.nonce(), 0);
        assert!(miner.balance().is_zero());
        assert_eq!(base.from.balance(), funds);
        assert!(base.to().unwrap().balance().is_zero());
        drop(base);

        let fresh = state.load_account(&key.address()).unwrap();
        assert!(Arc::ptr_eq(&alice, &fresh));
        assert!(state.load_account(&bob).unwrap().balance().is_zero());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = Config::default();
        config.fees.max_gas_price = 1;
        assert!(TxExecutor::new(config).is_err());
    }

    #[test]
    fn test_check_does_not_mutate() {
        let executor = TxExecutor::new(Config::default()).unwrap();
        let state = MemoryState::new(context(), Config::default().fees);
        let key = KeyPair::from_seed(&[1u8; 32]);
        let alice = state.load_account(&key.address()).unwrap();
        alice.add(&TokenSymbol::NATIVE, &BigUint::from(1_000_000_000_000u64));

        let tx = signed_transfer(&key, Address::new([2u8; 20]), 1_000);
        executor.check(&tx, &context(), &state).unwrap();

        assert_eq!(alice.nonce(), 0);
        assert_eq!(alice.balance(), BigUint::from(1_000_000_000_000u64));
        assert_eq!(
            executor
                .metrics()
                .checked_total
                .with_label_values(&["Transfer"])
                .get(),
            1
        );
    }

    #[test]
    fn test_chain_mismatch_rejected() {
        let executor = TxExecutor::new(Config::default()).unwrap();
        let mut ctx = context();
        ctx.chain_id = 1;
        let state = MemoryState::new(ctx.clone(), Config::default().fees);
        let key = KeyPair::from_seed(&[1u8; 32]);
        let tx = signed_transfer(&key, Address::new([2u8; 20]), 1_000);

        let err = executor.apply(&tx, &ctx, &state).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(
            executor
                .metrics()
                .rejected_total
                .with_label_values(&["Transfer"])
                .get(),
            1
        );
    }
}
