//! Property-based tests for account invariants
//!
//! These tests use proptest to verify:
//! - Conservation: transfers between accounts never create or destroy value
//! - Check/mutate agreement: a check succeeds iff the mutation succeeds
//! - Atomicity: a failed mutation leaves the account unchanged
//! - Bonus sharing: the stake pot is allocated exactly pro rata
//! - One-time nonces are consumed at most once

use account_core::{
    Account, Accounter, Address, ErrorKind, LendingConfig, StakeConfig, StakeSymbol,
    TokenSymbol,
};
use num_bigint::BigUint;
use num_traits::Zero;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for generating amounts
fn amount_strategy() -> impl Strategy<Value = u64> {
    0u64..1_000_000_000_000u64
}

/// Strategy for generating distinct depositor addresses
fn depositor_strategy() -> impl Strategy<Value = Address> {
    (1u8..200).prop_map(|b| Address::new([b; 20]))
}

fn native() -> TokenSymbol {
    TokenSymbol::NATIVE
}

fn funded(id: u8, amount: u64) -> Account {
    let acc = Account::new(Address::new([id; 20]));
    acc.init(BigUint::zero(), 1, 1_000);
    acc.add(&native(), &BigUint::from(amount));
    acc
}

fn stake_pool(max: u64) -> Account {
    let acc = Account::new(StakeSymbol::new("#POOL").unwrap().to_address());
    acc.init(BigUint::zero(), 1, 1_000);
    let accounter = Accounter {
        threshold: 1,
        keepers: vec![Address::new([250u8; 20])],
        ..Default::default()
    };
    let config = StakeConfig {
        ty: 0,
        token: native(),
        lock_time: 0,
        withdraw_fee: 10_000,
        min_amount: BigUint::from(1u8),
        max_amount: BigUint::from(max),
    };
    acc.create_stake(&Address::new([250u8; 20]), BigUint::zero(), &accounter, &config)
        .unwrap();
    acc
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: value moved by sub/add is conserved
    #[test]
    fn prop_transfer_conserves_value(
        a in amount_strategy(),
        b in amount_strategy(),
        moves in prop::collection::vec((any::<bool>(), amount_strategy()), 1..20),
    ) {
        let x = funded(1, a);
        let y = funded(2, b);
        let total = BigUint::from(a) + BigUint::from(b);

        for (forward, amount) in moves {
            let amount = BigUint::from(amount);
            let (from, to) = if forward { (&x, &y) } else { (&y, &x) };
            if from.sub(&native(), &amount).is_ok() {
                to.add(&native(), &amount);
            }
            prop_assert_eq!(x.balance() + y.balance(), total.clone());
        }
    }

    /// Property: check_sub_by_nonce agrees with sub_by_nonce
    #[test]
    fn prop_check_agrees_with_mutation(
        balance in amount_strategy(),
        ops in prop::collection::vec((0u64..4, amount_strategy()), 1..20),
    ) {
        let acc = funded(1, balance);
        for (nonce, amount) in ops {
            let amount = BigUint::from(amount);
            let checked = acc.check_sub_by_nonce(&native(), nonce, &amount);
            let before = acc.snapshot();
            let applied = acc.sub_by_nonce(&native(), nonce, &amount);
            prop_assert_eq!(checked.is_ok(), applied.is_ok());
            if applied.is_err() {
                prop_assert_eq!(acc.snapshot(), before);
            }
        }
    }

    /// Property: a failed withdrawal leaves the pool untouched and a
    /// successful check predicts success
    #[test]
    fn prop_withdraw_atomic(
        deposit in 1u64..1_000_000_000u64,
        pot in 0u64..1_000_000_000u64,
        amount in 0u64..3_000_000_000u64,
    ) {
        let pool = stake_pool(u64::MAX);
        let from = Address::new([1u8; 20]);
        pool.take_stake(&native(), &from, &BigUint::from(deposit), 0).unwrap();
        pool.add(&native(), &BigUint::from(deposit));
        pool.add(&native(), &BigUint::from(pot));

        let amount = BigUint::from(amount);
        let checked = pool.check_withdraw_stake(&native(), &from, &[from], &amount);
        let before = pool.snapshot();
        let balance_before = pool.balance();
        match pool.withdraw_stake(&native(), &from, &[from], &amount) {
            Ok(net) => {
                prop_assert!(checked.is_ok());
                prop_assert!(net <= amount);
                prop_assert_eq!(pool.balance() + net, balance_before);
            }
            Err(err) => {
                prop_assert!(checked.is_err());
                prop_assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
                prop_assert_eq!(pool.snapshot(), before);
            }
        }
    }

    /// Property: a deposit crystallizes every earlier entry at exactly
    /// `entry + entry * pot / total`, and nothing is over-allocated
    #[test]
    fn prop_bonus_allocation_exact(
        deposits in prop::collection::vec((depositor_strategy(), 1u64..1_000_000_000u64), 1..10),
        pot in 0u64..1_000_000_000u64,
        last in 1u64..1_000_000_000u64,
    ) {
        let pool = stake_pool(u64::MAX);
        let mut expected: BTreeMap<Address, BigUint> = BTreeMap::new();
        for (from, amount) in &deposits {
            pool.take_stake(&native(), from, &BigUint::from(*amount), 0).unwrap();
            pool.add(&native(), &BigUint::from(*amount));
            *expected.entry(*from).or_default() += BigUint::from(*amount);
        }
        pool.add(&native(), &BigUint::from(pot));

        let total: BigUint = expected.values().sum();
        let pot = BigUint::from(pot);
        for amount in expected.values_mut() {
            let bonus = &*amount * &pot / &total;
            *amount += bonus;
        }

        let newcomer = Address::new([201u8; 20]);
        pool.take_stake(&native(), &newcomer, &BigUint::from(last), 0).unwrap();
        pool.add(&native(), &BigUint::from(last));
        expected.insert(newcomer, BigUint::from(last));

        // truncation leftovers stay in the pot and show up as pending bonus
        let held = pool.balance();
        let total: BigUint = expected.values().sum();
        let leftover = &held - &total;
        for amount in expected.values_mut() {
            let bonus = &*amount * &leftover / &total;
            *amount += bonus;
        }

        let ledger = pool.stake_info(None).unwrap();
        let allocated: BigUint = ledger.values().map(|e| &e.amount).sum();
        prop_assert!(allocated <= held);
        prop_assert_eq!(ledger.len(), expected.len());
        for (from, amount) in &expected {
            prop_assert_eq!(&ledger[from].amount, amount);
        }
    }

    /// Property: a registered one-time nonce is redeemable exactly once
    #[test]
    fn prop_nonce_consumed_once(
        nonces in prop::collection::btree_set(any::<u64>(), 1..20),
        expire in 1_000u64..10_000u64,
    ) {
        let acc = funded(1, 1_000_000);
        let nonces: Vec<u64> = nonces.into_iter().collect();
        acc.add_nonce_table(expire, &nonces).unwrap();

        let one = BigUint::from(1u8);
        for nonce in &nonces {
            prop_assert!(acc.sub_by_nonce_table(&native(), expire, *nonce, &one).is_ok());
            let err = acc.sub_by_nonce_table(&native(), expire, *nonce, &one).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::NonceNotFound);
        }
        prop_assert!(acc.nonce_table().is_empty());
        prop_assert_eq!(acc.nonce(), 0);
    }

    /// Property: persisted accounts decode to the same state
    #[test]
    fn prop_marshal_parse_identity(
        balance in amount_strategy(),
        nonce_ops in 0u64..5,
        deposits in prop::collection::vec((depositor_strategy(), 1u64..1_000_000u64), 0..5),
    ) {
        let acc = funded(1, balance);
        for nonce in 0..nonce_ops {
            let _ = acc.sub_by_nonce(&native(), nonce, &BigUint::from(1u8));
        }
        let (data, ledger) = acc.marshal().unwrap();
        let parsed = Account::parse(acc.id(), &data, ledger.as_deref()).unwrap();
        prop_assert_eq!(parsed.snapshot(), acc.snapshot());

        let pool = stake_pool(u64::MAX);
        for (from, amount) in &deposits {
            pool.take_stake(&native(), from, &BigUint::from(*amount), 0).unwrap();
            pool.add(&native(), &BigUint::from(*amount));
        }
        let (data, ledger) = pool.marshal().unwrap();
        let parsed = Account::parse(pool.id(), &data, ledger.as_deref()).unwrap();
        prop_assert_eq!(parsed.marshal().unwrap(), (data, ledger));
    }

    /// Property: token and non-native stake accounts, with or without a
    /// lending pool, approvers and borrowers, decode to the same bytes
    #[test]
    fn prop_marshal_parse_roles(
        stakers in prop::collection::vec((depositor_strategy(), 1u64..1_000_000u64, any::<bool>()), 0..5),
        borrowers in prop::collection::vec((depositor_strategy(), 1_000u64..100_000u64), 0..5),
        open_lending in any::<bool>(),
    ) {
        let usd = TokenSymbol::new("$USD").unwrap();
        let lending = LendingConfig {
            token: native(),
            daily_interest: 10_000,
            overdue_interest: 10_000,
            min_amount: BigUint::from(1_000u32),
            max_amount: BigUint::from(u64::MAX),
        };
        let keepers = Accounter {
            threshold: 1,
            keepers: vec![Address::new([250u8; 20])],
            ..Default::default()
        };

        let token = Account::new(usd.to_address());
        token.init(BigUint::zero(), 1, 1_000);
        token.create_token(BigUint::from(10u8), &keepers, &BigUint::from(u64::MAX)).unwrap();
        token.add(&native(), &BigUint::from(1_000_000_000_000u64));

        let pool = Account::new(StakeSymbol::new("#USD").unwrap().to_address());
        pool.init(BigUint::zero(), 1, 1_000);
        let config = StakeConfig {
            ty: 1,
            token: usd,
            lock_time: 0,
            withdraw_fee: 0,
            min_amount: BigUint::from(1u8),
            max_amount: BigUint::from(u64::MAX),
        };
        pool.create_stake(&Address::new([250u8; 20]), BigUint::zero(), &keepers, &config).unwrap();
        pool.add(&native(), &BigUint::from(1_000_000_000_000u64));
        for (from, amount, approver) in &stakers {
            pool.take_stake(&usd, from, &BigUint::from(*amount), 0).unwrap();
            pool.add(&usd, &BigUint::from(*amount));
            if *approver {
                let _ = pool.update_stake_approver(from, Some(Address::new([251u8; 20])), &[*from]);
            }
        }

        for acc in [&token, &pool] {
            if open_lending {
                acc.open_lending(&lending).unwrap();
                for (from, amount) in &borrowers {
                    acc.borrow(&native(), from, &BigUint::from(*amount), 0).unwrap();
                }
            }
            let (data, ledger) = acc.marshal().unwrap();
            prop_assert_eq!(ledger.is_some(), open_lending || acc.stake_config().is_some());
            let parsed = Account::parse(acc.id(), &data, ledger.as_deref()).unwrap();
            prop_assert_eq!(parsed.snapshot(), acc.snapshot());
            prop_assert_eq!(parsed.marshal().unwrap(), (data, ledger));
        }
    }
}
