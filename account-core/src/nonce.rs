//! One-time nonce table
//!
//! Accounts can pre-register nonces grouped by an expiry timestamp. A voucher
//! signed by the account can later be redeemed exactly once against a
//! registered nonce, independently of the sequential account nonce. Groups
//! whose expiry is older than the account timestamp are dead: they are
//! ignored by lookups and purged on the next write.

use crate::{account::AccountState, Account, Error, Result, TokenSymbol};
use num_bigint::BigUint;

/// Maximum number of live expiry groups per account
pub const MAX_NONCE_GROUPS: usize = 64;

impl AccountState {
    fn prepare_add_nonce_table(&self, expire: u64, nonces: &[u64]) -> Result<Vec<u64>> {
        if expire < self.timestamp {
            return Err(Error::InvalidInput(format!(
                "nonce table expired, expire {} < timestamp {}",
                expire, self.timestamp
            )));
        }
        let live = self
            .nonce_table
            .keys()
            .filter(|&&e| e >= self.timestamp && e != expire)
            .count();
        if live >= MAX_NONCE_GROUPS {
            return Err(Error::TooManyNonceGroups {
                max: MAX_NONCE_GROUPS,
            });
        }

        let mut group = self.nonce_table.get(&expire).cloned().unwrap_or_default();
        for &nonce in nonces {
            if group.contains(&nonce) {
                return Err(Error::NonceExists { expire, nonce });
            }
            group.push(nonce);
        }
        group.sort_unstable();
        Ok(group)
    }

    fn prepare_sub_by_nonce_table(
        &self,
        token: &TokenSymbol,
        expire: u64,
        nonce: u64,
        amount: &BigUint,
    ) -> Result<()> {
        let found = expire >= self.timestamp
            && self
                .nonce_table
                .get(&expire)
                .map_or(false, |group| group.contains(&nonce));
        if !found {
            return Err(Error::NonceNotFound { expire, nonce });
        }
        self.require_balance(token, amount)
    }

    fn purge_expired_nonces(&mut self) {
        let now = self.timestamp;
        self.nonce_table.retain(|&expire, _| expire >= now);
    }
}

impl Account {
    /// Check that the nonces can be registered under `expire`
    pub fn check_nonce_table(&self, expire: u64, nonces: &[u64]) -> Result<()> {
        self.read().prepare_add_nonce_table(expire, nonces).map(|_| ())
    }

    /// Register one-time nonces under `expire`, merging with an existing group
    pub fn add_nonce_table(&self, expire: u64, nonces: &[u64]) -> Result<()> {
        let mut state = self.write();
        let group = state.prepare_add_nonce_table(expire, nonces)?;
        state.purge_expired_nonces();
        state.nonce_table.insert(expire, group);
        tracing::debug!(
            account = %self.id(),
            expire,
            added = nonces.len(),
            groups = state.nonce_table.len(),
            "Nonce table updated"
        );
        Ok(())
    }

    /// Check a debit against a registered one-time nonce
    pub fn check_sub_by_nonce_table(
        &self,
        token: &TokenSymbol,
        expire: u64,
        nonce: u64,
        amount: &BigUint,
    ) -> Result<()> {
        self.read()
            .prepare_sub_by_nonce_table(token, expire, nonce, amount)
    }

    /// Consume a registered one-time nonce and debit `amount`
    pub fn sub_by_nonce_table(
        &self,
        token: &TokenSymbol,
        expire: u64,
        nonce: u64,
        amount: &BigUint,
    ) -> Result<()> {
        let mut state = self.write();
        state.prepare_sub_by_nonce_table(token, expire, nonce, amount)?;
        state.debit(token, amount)?;
        if let Some(group) = state.nonce_table.get_mut(&expire) {
            group.retain(|&n| n != nonce);
            if group.is_empty() {
                state.nonce_table.remove(&expire);
            }
        }
        state.purge_expired_nonces();
        tracing::debug!(
            account = %self.id(),
            token = %token,
            amount = %amount,
            expire,
            nonce,
            "Nonce consumed"
        );
        Ok(())
    }

    /// Live nonce groups, expiry ascending
    pub fn nonce_table(&self) -> Vec<(u64, Vec<u64>)> {
        let state = self.read();
        state
            .nonce_table
            .iter()
            .filter(|(&expire, _)| expire >= state.timestamp)
            .map(|(&expire, group)| (expire, group.clone()))
            .collect()
    }
}
