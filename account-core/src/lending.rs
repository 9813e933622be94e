//! Lending pools
//!
//! Any account can open a lending pool for one token. Borrowers accrue daily
//! compound interest on their outstanding amount; after the due time the
//! overdue surcharge is added to the daily rate. Each borrow or partial
//! repayment capitalizes the accrued interest and restarts the accrual clock.

use crate::{
    account::{positive, AccountState},
    amount::{compound_rate, mul_trunc},
    Account, Address, Error, Result, TokenSymbol,
};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lending pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingConfig {
    /// Lent token
    pub token: TokenSymbol,
    /// Daily interest in parts per million
    pub daily_interest: u32,
    /// Extra daily interest after the due time, in parts per million
    pub overdue_interest: u32,
    /// Minimum single borrow
    pub min_amount: BigUint,
    /// Maximum outstanding amount per borrower, interest included
    pub max_amount: BigUint,
}

impl LendingConfig {
    /// Syntactic validation
    pub fn validate(&self) -> Result<()> {
        if !self.token.is_valid() {
            return Err(Error::InvalidInput(format!("invalid token {}", self.token)));
        }
        positive(&self.min_amount, "min amount")?;
        if self.max_amount < self.min_amount {
            return Err(Error::InvalidInput(format!(
                "invalid max amount, expected >= {}, got {}",
                self.min_amount, self.max_amount
            )));
        }
        Ok(())
    }
}

/// Borrower entry in a lending ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingEntry {
    /// Outstanding amount as of `update_at`
    pub amount: BigUint,
    /// Timestamp interest was last capitalized
    pub update_at: u64,
    /// Due time, zero for none
    pub due_time: u64,
}

/// Open lending pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lending {
    pub(crate) config: LendingConfig,
    pub(crate) ledger: BTreeMap<Address, LendingEntry>,
}

/// Outstanding amount of `entry` at `now`, interest included
pub fn calc_borrow_total(config: &LendingConfig, entry: &LendingEntry, now: u64) -> BigUint {
    if now <= entry.update_at {
        return entry.amount.clone();
    }
    let overdue = config.daily_interest.saturating_add(config.overdue_interest);
    if entry.due_time == 0 || now <= entry.due_time {
        let rate = compound_rate(config.daily_interest, now - entry.update_at);
        mul_trunc(&entry.amount, &[rate])
    } else if entry.update_at >= entry.due_time {
        let rate = compound_rate(overdue, now - entry.update_at);
        mul_trunc(&entry.amount, &[rate])
    } else {
        let normal = compound_rate(config.daily_interest, entry.due_time - entry.update_at);
        let late = compound_rate(overdue, now - entry.due_time);
        mul_trunc(&entry.amount, &[normal, late])
    }
}

impl AccountState {
    fn lending_pool(&self) -> Result<&Lending> {
        self.lending.as_ref().ok_or_else(|| {
            Error::InvalidRoleState(format!("{} has no lending pool", self.id))
        })
    }

    fn prepare_open_lending(&self, config: &LendingConfig) -> Result<()> {
        if self.lending.is_some() {
            return Err(Error::InvalidRoleState(format!(
                "lending pool of {} exists",
                self.id
            )));
        }
        config.validate()
    }

    fn prepare_close_lending(&self) -> Result<()> {
        if !self.lending_pool()?.ledger.is_empty() {
            return Err(Error::RepayRequired(self.id));
        }
        Ok(())
    }

    fn check_lending_token(&self, token: &TokenSymbol) -> Result<&Lending> {
        let lending = self.lending_pool()?;
        if *token != lending.config.token {
            return Err(Error::InvalidInput(format!(
                "invalid token, expected {}, got {}",
                lending.config.token, token
            )));
        }
        Ok(lending)
    }

    fn prepare_borrow(
        &self,
        token: &TokenSymbol,
        from: &Address,
        amount: &BigUint,
        due_time: u64,
    ) -> Result<BigUint> {
        let lending = self.check_lending_token(token)?;
        if due_time != 0 && due_time <= self.timestamp {
            return Err(Error::InvalidInput(format!(
                "invalid due time, expected > {}, got {}",
                self.timestamp, due_time
            )));
        }
        if *amount < lending.config.min_amount {
            return Err(Error::InvalidInput(format!(
                "invalid amount, expected >= {}, got {}",
                lending.config.min_amount, amount
            )));
        }
        let outstanding = lending
            .ledger
            .get(from)
            .map(|e| calc_borrow_total(&lending.config, e, self.timestamp))
            .unwrap_or_default();
        let total = outstanding + amount;
        if total > lending.config.max_amount {
            return Err(Error::CapacityExceeded(format!(
                "borrow of {} would be {}, expected <= {}",
                from, total, lending.config.max_amount
            )));
        }
        self.require_balance(token, amount)?;
        Ok(total)
    }

    fn prepare_repay(&self, token: &TokenSymbol, from: &Address) -> Result<BigUint> {
        let lending = self.check_lending_token(token)?;
        let entry = lending.ledger.get(from).ok_or(Error::NothingToRepay {
            pool: self.id,
            from: *from,
        })?;
        Ok(calc_borrow_total(&lending.config, entry, self.timestamp))
    }
}

impl Account {
    /// Check opening a lending pool
    pub fn check_open_lending(&self, config: &LendingConfig) -> Result<()> {
        self.read().prepare_open_lending(config)
    }

    /// Open a lending pool
    pub fn open_lending(&self, config: &LendingConfig) -> Result<()> {
        let mut state = self.write();
        state.prepare_open_lending(config)?;
        state.lending = Some(Lending {
            config: config.clone(),
            ledger: BTreeMap::new(),
        });
        tracing::info!(account = %self.id(), token = %config.token, "Lending opened");
        Ok(())
    }

    /// Check closing the lending pool
    pub fn check_close_lending(&self) -> Result<()> {
        self.read().prepare_close_lending()
    }

    /// Close the lending pool; all borrows must be repaid
    pub fn close_lending(&self) -> Result<()> {
        let mut state = self.write();
        state.prepare_close_lending()?;
        state.lending = None;
        tracing::info!(account = %self.id(), "Lending closed");
        Ok(())
    }

    /// Check a borrow
    pub fn check_borrow(
        &self,
        token: &TokenSymbol,
        from: &Address,
        amount: &BigUint,
        due_time: u64,
    ) -> Result<()> {
        self.read()
            .prepare_borrow(token, from, amount, due_time)
            .map(|_| ())
    }

    /// Lend `amount` to `from`. The pool is debited; the caller credits the
    /// borrower.
    pub fn borrow(
        &self,
        token: &TokenSymbol,
        from: &Address,
        amount: &BigUint,
        due_time: u64,
    ) -> Result<()> {
        let mut state = self.write();
        let total = state.prepare_borrow(token, from, amount, due_time)?;
        state.debit(token, amount)?;
        let now = state.timestamp;
        if let Some(lending) = state.lending.as_mut() {
            lending.ledger.insert(
                *from,
                LendingEntry {
                    amount: total,
                    update_at: now,
                    due_time,
                },
            );
        }
        tracing::debug!(account = %self.id(), from = %from, amount = %amount, "Borrowed");
        Ok(())
    }

    /// Check a repayment
    pub fn check_repay(&self, token: &TokenSymbol, from: &Address) -> Result<()> {
        self.read().prepare_repay(token, from).map(|_| ())
    }

    /// Reduce `from`'s outstanding amount and return how much of `amount` was
    /// consumed. The caller moves the consumed amount to the pool.
    pub fn repay(&self, token: &TokenSymbol, from: &Address, amount: &BigUint) -> Result<BigUint> {
        let mut state = self.write();
        let total = state.prepare_repay(token, from)?;
        let now = state.timestamp;
        let consumed = if *amount >= total {
            if let Some(lending) = state.lending.as_mut() {
                lending.ledger.remove(from);
            }
            total
        } else {
            if let Some(entry) = state
                .lending
                .as_mut()
                .and_then(|lending| lending.ledger.get_mut(from))
            {
                entry.amount = &total - amount;
                entry.update_at = now;
            }
            amount.clone()
        };
        tracing::debug!(account = %self.id(), from = %from, amount = %consumed, "Repaid");
        Ok(consumed)
    }

    /// Lending pool configuration
    pub fn lending_config(&self) -> Option<LendingConfig> {
        self.read().lending.as_ref().map(|l| l.config.clone())
    }

    /// Borrower entry with interest accrued to the current timestamp
    pub fn lending_info(&self, from: &Address) -> Option<LendingEntry> {
        let state = self.read();
        let lending = state.lending.as_ref()?;
        let entry = lending.ledger.get(from)?;
        Some(LendingEntry {
            amount: calc_borrow_total(&lending.config, entry, state.timestamp),
            update_at: state.timestamp,
            due_time: entry.due_time,
        })
    }
}
