//! Property-based tests for transaction settlement
//!
//! These tests use proptest to verify:
//! - Gas: the declared gas survives filling and follows the size schedule
//! - Native conservation: sender, recipient, miner and fee sink sum up
//! - Tip cap: the miner never earns more than the fee cap allows

use account_core::{Address, TokenSymbol, TxType};
use num_bigint::BigUint;
use proptest::prelude::*;
use tx_core::{
    base_gas, BlockContext, BlockState, Config, KeyPair, MemoryState, Transaction, TxData,
    TxExecutor,
};

const GAS_PRICE: u64 = 10_000;
const FUNDS: u64 = 1_000_000_000_000_000;

fn context() -> BlockContext {
    BlockContext {
        height: 1,
        timestamp: 1_000_000,
        miner: Address::new([9u8; 20]),
        gas_price: GAS_PRICE,
        chain_id: 2357,
    }
}

/// Strategy for transaction kinds that carry no state requirements on gas
fn tx_type_strategy() -> impl Strategy<Value = TxType> {
    prop_oneof![
        Just(TxType::Transfer),
        Just(TxType::AddNonceTable),
        Just(TxType::UpdateAccountInfo),
        Just(TxType::CreateToken),
        Just(TxType::Borrow),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: fill_gas is stable and charges oversized bodies double
    #[test]
    fn prop_gas_schedule(
        ty in tx_type_strategy(),
        amount in any::<u64>(),
        payload_len in 0usize..3_000,
    ) {
        let fees = Config::default().fees;
        let mut data = TxData::new(ty, 2357, Address::new([1u8; 20]), Some(Address::new([2u8; 20])));
        data.amount = BigUint::from(amount);
        data.data = vec![7u8; payload_len];
        data.fill_gas(&fees).unwrap();

        prop_assert_eq!(data.required_gas(&fees).unwrap(), data.gas);

        let size = data.unsigned_bytes().unwrap().len() as u64;
        let expected = if size <= fees.threshold_gas {
            size
        } else {
            fees.threshold_gas + (size - fees.threshold_gas) * 2
        };
        prop_assert_eq!(data.gas, base_gas(ty) + expected);
    }

    /// Property: a transfer moves value without creating or destroying any
    #[test]
    fn prop_transfer_conserves_native(
        amount in 1u64..1_000_000_000_000,
        gas_tip in 0u64..5_000,
        cap_extra in 0u64..5_000,
    ) {
        let config = Config::default();
        let ctx = context();
        let state = MemoryState::new(ctx.clone(), config.fees.clone());
        let executor = TxExecutor::new(config.clone()).unwrap();
        let alice = KeyPair::from_seed(&[1u8; 32]);
        let bob = Address::new([2u8; 20]);
        state
            .load_account(&alice.address())
            .unwrap()
            .add(&TokenSymbol::NATIVE, &BigUint::from(FUNDS));

        let mut data = TxData::new(TxType::Transfer, 2357, alice.address(), Some(bob));
        data.amount = BigUint::from(amount);
        data.gas_tip = gas_tip;
        data.gas_fee_cap = GAS_PRICE + cap_extra;
        data.fill_gas(&config.fees).unwrap();
        let mut tx = Transaction::new(data);
        tx.sign(&alice).unwrap();
        executor.apply(&tx, &ctx, &state).unwrap();

        let balance = |id: &Address| state.load_account(id).unwrap().balance();
        let total = balance(&alice.address())
            + balance(&bob)
            + balance(&ctx.miner)
            + balance(&Address::EMPTY);
        prop_assert_eq!(total, BigUint::from(FUNDS));
        prop_assert_eq!(balance(&bob), BigUint::from(amount));

        let gas = BigUint::from(tx.tx.gas);
        prop_assert_eq!(balance(&ctx.miner), &gas * BigUint::from(gas_tip.min(cap_extra)));
        prop_assert_eq!(balance(&Address::EMPTY), &gas * BigUint::from(GAS_PRICE));
    }
}
