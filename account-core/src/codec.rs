//! Account persistence
//!
//! An account persists as two bincode blobs: the account record and, only
//! for stake accounts or accounts with an open lending pool, a separate
//! ledger record. Ledgers can grow large and change independently of the
//! account header, so storage keeps them apart. Both encodings are
//! deterministic: maps are ordered and every field has a fixed position.

use crate::{
    account::{AccountState, RoleState},
    lending::{Lending, LendingConfig, LendingEntry},
    stake::{StakeConfig, StakeEntry},
    Account, Address, Error, Result, TokenSymbol, TxType,
};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ROLE_PLAIN: u8 = 0;
const ROLE_TOKEN: u8 = 1;
const ROLE_STAKE: u8 = 2;

#[derive(Serialize, Deserialize)]
struct AccountRecord {
    id: Address,
    role: u8,
    nonce: u64,
    balance: BigUint,
    pledge: BigUint,
    tokens: BTreeMap<TokenSymbol, BigUint>,
    nonce_table: BTreeMap<u64, Vec<u64>>,
    threshold: u16,
    keepers: Vec<Address>,
    approver: Option<Address>,
    approve_list: Vec<TxType>,
    max_total_supply: Option<BigUint>,
    stake: Option<StakeConfig>,
    lending: Option<LendingConfig>,
    height: u64,
    timestamp: u64,
}

#[derive(Serialize, Deserialize, Default)]
struct LedgerRecord {
    stake: BTreeMap<Address, StakeEntry>,
    lending: BTreeMap<Address, LendingEntry>,
}

impl Account {
    /// Encode the account record and, when present, its ledgers
    pub fn marshal(&self) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
        let state = self.read();
        let mut ledger = None;
        let (role, max_total_supply, stake) = match &state.role {
            RoleState::Plain => (ROLE_PLAIN, None, None),
            RoleState::Token { max_total_supply } => {
                (ROLE_TOKEN, Some(max_total_supply.clone()), None)
            }
            RoleState::Stake { config, ledger: entries } => {
                ledger
                    .get_or_insert_with(LedgerRecord::default)
                    .stake = entries.clone();
                (ROLE_STAKE, None, Some(config.clone()))
            }
        };
        if let Some(lending) = &state.lending {
            ledger
                .get_or_insert_with(LedgerRecord::default)
                .lending = lending.ledger.clone();
        }

        let record = AccountRecord {
            id: state.id,
            role,
            nonce: state.nonce,
            balance: state.balance.clone(),
            pledge: state.pledge.clone(),
            tokens: state.tokens.clone(),
            nonce_table: state.nonce_table.clone(),
            threshold: state.threshold,
            keepers: state.keepers.clone(),
            approver: state.approver,
            approve_list: state.approve_list.clone(),
            max_total_supply,
            stake,
            lending: state.lending.as_ref().map(|l| l.config.clone()),
            height: state.height,
            timestamp: state.timestamp,
        };
        let data = bincode::serialize(&record)?;
        let ledger = ledger.map(|l| bincode::serialize(&l)).transpose()?;
        Ok((data, ledger))
    }

    /// Decode and validate an account persisted under `id`
    pub fn parse(id: Address, data: &[u8], ledger: Option<&[u8]>) -> Result<Account> {
        parse_state(id, data, ledger).map(Account::from_state)
    }

    /// Overwrite this account with persisted bytes, keeping the handle. On
    /// error the account is left unchanged.
    pub fn restore(&self, data: &[u8], ledger: Option<&[u8]>) -> Result<()> {
        let state = parse_state(self.id(), data, ledger)?;
        *self.write() = state;
        Ok(())
    }
}

fn parse_state(id: Address, data: &[u8], ledger: Option<&[u8]>) -> Result<AccountState> {
    let record: AccountRecord = bincode::deserialize(data)?;
    if record.id != id {
        return Err(Error::InvalidInput(format!(
            "account id mismatch, expected {}, got {}",
            id, record.id
        )));
    }
    let needs_ledger = record.role == ROLE_STAKE || record.lending.is_some();
    let mut ledger = match (needs_ledger, ledger) {
        (true, Some(bytes)) => bincode::deserialize::<LedgerRecord>(bytes)?,
        (false, None) => LedgerRecord::default(),
        (true, None) => {
            return Err(Error::InvalidInput(format!("missing ledger of {}", id)))
        }
        (false, Some(_)) => {
            return Err(Error::InvalidInput(format!("unexpected ledger of {}", id)))
        }
    };

    let role = match (record.role, record.max_total_supply, record.stake) {
        (ROLE_PLAIN, None, None) => RoleState::Plain,
        (ROLE_TOKEN, Some(max_total_supply), None) => RoleState::Token { max_total_supply },
        (ROLE_STAKE, None, Some(config)) => RoleState::Stake {
            config,
            ledger: std::mem::take(&mut ledger.stake),
        },
        (role, _, _) => {
            return Err(Error::InvalidRoleState(format!(
                "malformed role {} of {}",
                role, id
            )))
        }
    };
    if !matches!(role, RoleState::Stake { .. }) && !ledger.stake.is_empty() {
        return Err(Error::InvalidRoleState(format!(
            "stake ledger on non-stake account {}",
            id
        )));
    }
    let lending = match record.lending {
        Some(config) => Some(Lending {
            config,
            ledger: ledger.lending,
        }),
        None => None,
    };

    let state = AccountState {
        id,
        role,
        nonce: record.nonce,
        balance: record.balance,
        pledge: record.pledge,
        tokens: record.tokens,
        nonce_table: record.nonce_table,
        threshold: record.threshold,
        keepers: record.keepers,
        approver: record.approver,
        approve_list: record.approve_list,
        lending,
        height: record.height,
        timestamp: record.timestamp,
    };
    state.validate()?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Accounter, StakeSymbol};
    use num_traits::Zero;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn accounter() -> Accounter {
        Accounter {
            threshold: 1,
            keepers: vec![addr(9)],
            ..Default::default()
        }
    }

    fn lending_config() -> LendingConfig {
        LendingConfig {
            token: TokenSymbol::NATIVE,
            daily_interest: 10_000,
            overdue_interest: 20_000,
            min_amount: BigUint::from(1_000u32),
            max_amount: BigUint::from(1_000_000u32),
        }
    }

    /// Marshal, parse and compare both the state and the re-encoded bytes
    fn assert_roundtrip(acc: &Account) {
        let (data, ledger) = acc.marshal().unwrap();
        let parsed = Account::parse(acc.id(), &data, ledger.as_deref()).unwrap();
        assert_eq!(parsed.snapshot(), acc.snapshot());
        assert_eq!(parsed.marshal().unwrap(), (data, ledger));
    }

    #[test]
    fn test_plain_roundtrip() {
        let acc = Account::new(addr(1));
        acc.init(BigUint::from(0u8), 3, 1000);
        acc.add(&TokenSymbol::NATIVE, &BigUint::from(12345u32));
        acc.add_nonce_table(2000, &[3, 1]).unwrap();

        let (data, ledger) = acc.marshal().unwrap();
        assert!(ledger.is_none());
        let parsed = Account::parse(addr(1), &data, None).unwrap();
        assert_eq!(parsed.snapshot(), acc.snapshot());
        assert_eq!(parsed.marshal().unwrap().0, data);
    }

    #[test]
    fn test_stake_roundtrip_with_ledger() {
        let id = StakeSymbol::new("#POOL").unwrap().to_address();
        let acc = Account::new(id);
        let config = StakeConfig {
            ty: 1,
            token: TokenSymbol::NATIVE,
            lock_time: 0,
            withdraw_fee: 0,
            min_amount: BigUint::from(1u8),
            max_amount: BigUint::from(1000u32),
        };
        let accounter = Accounter {
            threshold: 1,
            keepers: vec![addr(9)],
            ..Default::default()
        };
        acc.create_stake(&addr(9), BigUint::from(10u8), &accounter, &config)
            .unwrap();
        acc.add(&TokenSymbol::NATIVE, &BigUint::from(10u8));

        let (data, ledger) = acc.marshal().unwrap();
        let ledger = ledger.unwrap();
        let parsed = Account::parse(id, &data, Some(&ledger)).unwrap();
        assert_eq!(parsed.snapshot(), acc.snapshot());

        assert!(Account::parse(id, &data, None).is_err());
        assert!(Account::parse(addr(2), &data, Some(&ledger)).is_err());
    }

    #[test]
    fn test_token_roundtrip_with_lending() {
        let usd = TokenSymbol::new("$USD").unwrap();
        let acc = Account::new(usd.to_address());
        acc.init(BigUint::from(0u8), 1, 1000);
        acc.create_token(BigUint::from(10u8), &accounter(), &BigUint::from(1_000_000u32))
            .unwrap();
        acc.add(&TokenSymbol::NATIVE, &BigUint::from(1_000_010u32));
        let (_, ledger) = acc.marshal().unwrap();
        assert!(ledger.is_none());
        assert_roundtrip(&acc);

        // open pool, empty ledger
        acc.open_lending(&lending_config()).unwrap();
        let (_, ledger) = acc.marshal().unwrap();
        assert!(ledger.is_some());
        assert_roundtrip(&acc);

        acc.borrow(&TokenSymbol::NATIVE, &addr(2), &BigUint::from(5_000u32), 0)
            .unwrap();
        acc.borrow(&TokenSymbol::NATIVE, &addr(3), &BigUint::from(7_000u32), 5000)
            .unwrap();
        assert_roundtrip(&acc);
        let parsed = {
            let (data, ledger) = acc.marshal().unwrap();
            Account::parse(acc.id(), &data, ledger.as_deref()).unwrap()
        };
        assert_eq!(parsed.max_total_supply(), Some(BigUint::from(1_000_000u32)));
        assert_eq!(
            parsed.lending_info(&addr(3)).unwrap().amount,
            BigUint::from(7_000u32)
        );
    }

    #[test]
    fn test_non_native_stake_roundtrip_with_approver() {
        let usd = TokenSymbol::new("$USD").unwrap();
        let id = StakeSymbol::new("#USDPOOL").unwrap().to_address();
        let acc = Account::new(id);
        acc.init(BigUint::from(0u8), 1, 1000);
        let config = StakeConfig {
            ty: 2,
            token: usd,
            lock_time: 0,
            withdraw_fee: 1_000,
            min_amount: BigUint::from(1u8),
            max_amount: BigUint::from(1_000_000u32),
        };
        acc.create_stake(&addr(9), BigUint::from(10u8), &accounter(), &config)
            .unwrap();
        acc.add(&TokenSymbol::NATIVE, &BigUint::from(10u8));

        // non-native pools start with an empty ledger
        assert!(acc.stake_info(None).unwrap().is_empty());
        assert_roundtrip(&acc);

        acc.take_stake(&usd, &addr(1), &BigUint::from(500u32), 0).unwrap();
        acc.add(&usd, &BigUint::from(500u32));
        acc.take_stake(&usd, &addr(2), &BigUint::from(300u32), 0).unwrap();
        acc.add(&usd, &BigUint::from(300u32));
        acc.update_stake_approver(&addr(1), Some(addr(7)), &[addr(1)])
            .unwrap();
        acc.open_lending(&LendingConfig {
            token: usd,
            ..lending_config()
        })
        .unwrap();
        assert_roundtrip(&acc);

        let (data, ledger) = acc.marshal().unwrap();
        let parsed = Account::parse(id, &data, ledger.as_deref()).unwrap();
        let info = parsed.stake_info(Some(&addr(1))).unwrap();
        assert_eq!(info[&addr(1)].approver, Some(addr(7)));
        assert_eq!(parsed.stake_config().unwrap().token, usd);
    }

    #[test]
    fn test_restore_keeps_handle() {
        let acc = Account::new(addr(1));
        acc.add(&TokenSymbol::NATIVE, &BigUint::from(100u32));
        let (data, ledger) = acc.marshal().unwrap();

        acc.sub(&TokenSymbol::NATIVE, &BigUint::from(40u32)).unwrap();
        acc.restore(&data, ledger.as_deref()).unwrap();
        assert_eq!(acc.balance(), BigUint::from(100u32));

        // a bad blob leaves the account as it was
        assert!(acc.restore(&[1, 2, 3], None).is_err());
        assert_eq!(acc.balance(), BigUint::from(100u32));

        let other = Account::new(addr(2));
        assert!(other.restore(&data, None).is_err());
        assert!(other.balance().is_zero());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Account::parse(addr(1), &[1, 2, 3], None).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Codec);
    }
}
