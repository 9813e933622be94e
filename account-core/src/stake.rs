//! Stake pools
//!
//! A stake account holds a pool of one token and a ledger of per-depositor
//! entries. Whatever the pool holds above the ledger total is a bonus pot that
//! is shared pro rata between depositors: the pot is crystallized into the
//! ledger whenever a deposit, withdrawal or reset changes the ledger, so every
//! depositor is credited at the same rate.
//!
//! For native-token pools the creator's pledge is seeded as a ledger entry and
//! earns bonus like any other deposit.

use crate::{
    account::{positive, Accounter, AccountState, RoleState},
    amount::{mul_div, ppm_of, PPM},
    Account, Address, Error, Result, StakeSymbol, TokenSymbol,
};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stake pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeConfig {
    /// Pool type, 0 to 2. Higher types may use more transaction kinds.
    pub ty: u8,
    /// Staked token
    pub token: TokenSymbol,
    /// No withdrawals, resets or destruction before this timestamp
    pub lock_time: u64,
    /// Withdrawal fee in parts per million, kept by the pool
    pub withdraw_fee: u32,
    /// Minimum single deposit
    pub min_amount: BigUint,
    /// Maximum stake per depositor, bonus included
    pub max_amount: BigUint,
}

impl StakeConfig {
    /// Syntactic validation
    pub fn validate(&self) -> Result<()> {
        if self.ty > 2 {
            return Err(Error::InvalidInput(format!(
                "invalid stake type, expected <= 2, got {}",
                self.ty
            )));
        }
        if !self.token.is_valid() {
            return Err(Error::InvalidInput(format!("invalid token {}", self.token)));
        }
        if u64::from(self.withdraw_fee) > PPM {
            return Err(Error::InvalidInput(format!(
                "invalid withdraw fee, expected <= {}, got {}",
                PPM, self.withdraw_fee
            )));
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

/// Depositor entry in a stake ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEntry {
    /// Staked amount, crystallized bonus included
    pub amount: BigUint,
    /// No withdrawal before this timestamp
    pub lock_time: u64,
    /// Co-signer required for withdrawals and approver changes
    pub approver: Option<Address>,
}

fn ledger_total(ledger: &BTreeMap<Address, StakeEntry>) -> BigUint {
    ledger.values().map(|e| &e.amount).sum()
}

/// Undistributed pot and the ledger total it is shared over. An entry's share
/// is `amount * pot / total`, truncated.
#[derive(Debug, Clone, Default)]
struct BonusPot {
    pot: BigUint,
    total: BigUint,
}

impl BonusPot {
    fn with_bonus(&self, amount: &BigUint) -> BigUint {
        amount + mul_div(amount, &self.pot, &self.total)
    }

    fn alloc(&self, ledger: &mut BTreeMap<Address, StakeEntry>) {
        if self.pot.is_zero() {
            return;
        }
        for entry in ledger.values_mut() {
            if !entry.amount.is_zero() {
                entry.amount = self.with_bonus(&entry.amount);
            }
        }
    }
}

/// Outcome of a validated withdrawal
#[derive(Debug)]
struct WithdrawPlan {
    bonus: BonusPot,
    net: BigUint,
}

impl AccountState {
    fn stake_pool(&self) -> Result<(&StakeConfig, &BTreeMap<Address, StakeEntry>)> {
        match &self.role {
            RoleState::Stake { config, ledger } => Ok((config, ledger)),
            _ => Err(Error::InvalidRoleState(format!(
                "{} is not a stake account",
                self.id
            ))),
        }
    }

    fn stake_pool_mut(&mut self) -> Option<(&mut StakeConfig, &mut BTreeMap<Address, StakeEntry>)> {
        match &mut self.role {
            RoleState::Stake { config, ledger } => Some((config, ledger)),
            _ => None,
        }
    }

    /// Pool holdings above the ledger total, empty when the ledger is empty
    /// or the pot is exhausted
    fn stake_bonus(&self) -> Result<BonusPot> {
        let (config, ledger) = self.stake_pool()?;
        let total = ledger_total(ledger);
        let held = self.balance_of_all(&config.token);
        if total.is_zero() || held <= total {
            return Ok(BonusPot::default());
        }
        Ok(BonusPot {
            pot: held - &total,
            total,
        })
    }

    fn check_stake_token(&self, token: &TokenSymbol) -> Result<()> {
        let (config, _) = self.stake_pool()?;
        if *token != config.token {
            return Err(Error::InvalidInput(format!(
                "invalid token, expected {}, got {}",
                config.token, token
            )));
        }
        Ok(())
    }

    fn check_stake_unlocked(&self) -> Result<()> {
        let (config, _) = self.stake_pool()?;
        if self.is_locked(config.lock_time) {
            return Err(Error::TimeLocked(format!(
                "stake {} locked until {}",
                self.id, config.lock_time
            )));
        }
        Ok(())
    }

    fn active_holders(&self) -> Result<Vec<Address>> {
        let (_, ledger) = self.stake_pool()?;
        Ok(ledger
            .iter()
            .filter(|(_, e)| !e.amount.is_zero())
            .map(|(addr, _)| *addr)
            .collect())
    }

    fn prepare_create_stake(&self, accounter: &Accounter, config: &StakeConfig) -> Result<()> {
        if !StakeSymbol::from_address(&self.id).is_valid() {
            return Err(Error::InvalidInput(format!("invalid stake account {}", self.id)));
        }
        if !self.is_empty() {
            return Err(Error::InvalidRoleState(format!("stake account {} exists", self.id)));
        }
        accounter.validate(true)?;
        config.validate()
    }

    fn prepare_reset_stake(&self, config: &StakeConfig) -> Result<BonusPot> {
        config.validate()?;
        let (current, _) = self.stake_pool()?;
        if config.ty != current.ty || config.token != current.token {
            return Err(Error::InvalidInput(format!(
                "can't change stake type or token, expected {}/{}, got {}/{}",
                current.ty, current.token, config.ty, config.token
            )));
        }
        self.check_stake_unlocked()?;
        let holders = self.active_holders()?;
        if holders.len() > 1 {
            return Err(Error::InvalidRoleState(format!(
                "stake ledger of {} has {} holders, expected <= 1",
                self.id,
                holders.len()
            )));
        }
        self.stake_bonus()
    }

    fn prepare_destroy_stake(&self, recipient: &Address) -> Result<()> {
        self.stake_pool()?;
        if *recipient == self.id {
            return Err(Error::InvalidInput(format!(
                "can't destroy stake {} to itself",
                self.id
            )));
        }
        if self.lending.is_some() {
            return Err(Error::InvalidRoleState(format!(
                "lending pool of {} should be closed",
                self.id
            )));
        }
        self.check_stake_unlocked()?;
        let holders = self.active_holders()?;
        match holders.as_slice() {
            [] => Ok(()),
            [holder] if holder == recipient => Ok(()),
            [holder] => Err(Error::InvalidRoleState(format!(
                "recipient not matched, expected {}, got {}",
                holder, recipient
            ))),
            _ => Err(Error::InvalidRoleState(format!(
                "stake ledger of {} has {} holders, expected <= 1",
                self.id,
                holders.len()
            ))),
        }
    }

    fn prepare_take_stake(
        &self,
        token: &TokenSymbol,
        from: &Address,
        amount: &BigUint,
        lock_time: u64,
    ) -> Result<BonusPot> {
        self.check_stake_token(token)?;
        let (config, ledger) = self.stake_pool()?;
        if *amount < config.min_amount {
            return Err(Error::InvalidInput(format!(
                "invalid amount, expected >= {}, got {}",
                config.min_amount, amount
            )));
        }
        if lock_time != 0 && lock_time <= config.lock_time {
            return Err(Error::InvalidInput(format!(
                "invalid lock time, expected > {}, got {}",
                config.lock_time, lock_time
            )));
        }
        let bonus = self.stake_bonus()?;
        let existing = ledger
            .get(from)
            .map(|e| bonus.with_bonus(&e.amount))
            .unwrap_or_default();
        let total = existing + amount;
        if total > config.max_amount {
            return Err(Error::CapacityExceeded(format!(
                "stake of {} would be {}, expected <= {}",
                from, total, config.max_amount
            )));
        }
        Ok(bonus)
    }

    fn prepare_withdraw_stake(
        &self,
        token: &TokenSymbol,
        from: &Address,
        signers: &[Address],
        amount: &BigUint,
    ) -> Result<WithdrawPlan> {
        self.check_stake_token(token)?;
        self.check_stake_unlocked()?;
        let (config, ledger) = self.stake_pool()?;
        let entry = ledger.get(from).ok_or_else(|| {
            Error::InvalidInput(format!("{} has no stake in {}", from, self.id))
        })?;
        if self.is_locked(entry.lock_time) {
            return Err(Error::TimeLocked(format!(
                "stake of {} locked until {}",
                from, entry.lock_time
            )));
        }
        if let Some(approver) = &entry.approver {
            if !signers.contains(approver) {
                return Err(Error::NeedApproverSigning(*from));
            }
        }

        let bonus = self.stake_bonus()?;
        if amount.is_zero() {
            return Ok(WithdrawPlan {
                bonus: BonusPot::default(),
                net: BigUint::zero(),
            });
        }
        let staked = bonus.with_bonus(&entry.amount);
        if *amount > staked {
            return Err(Error::InsufficientBalance {
                account: *from,
                token: *token,
                expected: amount.clone(),
                actual: staked,
            });
        }
        self.require_balance(token, amount)?;
        let fee = ppm_of(amount, config.withdraw_fee);
        Ok(WithdrawPlan {
            bonus,
            net: amount - fee,
        })
    }

    fn prepare_update_stake_approver(&self, from: &Address, signers: &[Address]) -> Result<()> {
        let (_, ledger) = self.stake_pool()?;
        let entry = ledger.get(from).ok_or_else(|| {
            Error::InvalidInput(format!("{} has no stake in {}", from, self.id))
        })?;
        if let Some(approver) = &entry.approver {
            if !signers.contains(approver) {
                return Err(Error::NeedApproverSigning(*from));
            }
        }
        Ok(())
    }
}

impl Account {
    /// Check stake account creation
    pub fn check_create_stake(&self, accounter: &Accounter, config: &StakeConfig) -> Result<()> {
        self.read().prepare_create_stake(accounter, config)
    }

    /// Turn this empty account into a stake pool. For native pools the pledge
    /// is recorded as the creator's ledger entry.
    pub fn create_stake(
        &self,
        from: &Address,
        pledge: BigUint,
        accounter: &Accounter,
        config: &StakeConfig,
    ) -> Result<()> {
        let mut state = self.write();
        state.prepare_create_stake(accounter, config)?;

        let mut ledger = BTreeMap::new();
        if config.token.is_native() && !pledge.is_zero() {
            ledger.insert(
                *from,
                StakeEntry {
                    amount: pledge.clone(),
                    lock_time: 0,
                    approver: None,
                },
            );
        }
        state.set_governance(accounter);
        state.role = RoleState::Stake {
            config: config.clone(),
            ledger,
        };
        state.pledge = pledge;
        tracing::info!(
            account = %self.id(),
            token = %config.token,
            ty = config.ty,
            "Stake account created"
        );
        Ok(())
    }

    /// Check a stake configuration reset
    pub fn check_reset_stake(&self, config: &StakeConfig) -> Result<()> {
        self.read().prepare_reset_stake(config).map(|_| ())
    }

    /// Replace lock time, fee and bounds. Type and token are fixed.
    pub fn reset_stake(&self, config: &StakeConfig) -> Result<()> {
        let mut state = self.write();
        let bonus = state.prepare_reset_stake(config)?;
        if let Some((current, ledger)) = state.stake_pool_mut() {
            bonus.alloc(ledger);
            current.lock_time = config.lock_time;
            current.withdraw_fee = config.withdraw_fee;
            current.min_amount = config.min_amount.clone();
            current.max_amount = config.max_amount.clone();
        }
        tracing::info!(account = %self.id(), lock_time = config.lock_time, "Stake reset");
        Ok(())
    }

    /// Check stake account destruction
    pub fn check_destroy_stake(&self, recipient: &Address) -> Result<()> {
        self.read().prepare_destroy_stake(recipient)
    }

    /// Demote the stake pool to a plain account and move everything it holds,
    /// pledge included, to `recipient`
    pub fn destroy_stake(&self, recipient: &Account) -> Result<()> {
        let (native, token, amount) = {
            let mut state = self.write();
            state.prepare_destroy_stake(&recipient.id())?;
            let token = state.stake_pool()?.0.token;
            let native = std::mem::take(&mut state.balance);
            let amount = if token.is_native() {
                BigUint::zero()
            } else {
                state.tokens.remove(&token).unwrap_or_default()
            };
            state.reset_to_plain();
            (native, token, amount)
        };

        recipient.add(&TokenSymbol::NATIVE, &native);
        recipient.add(&token, &amount);
        tracing::info!(
            account = %self.id(),
            recipient = %recipient.id(),
            native = %native,
            amount = %amount,
            "Stake account destroyed"
        );
        Ok(())
    }

    /// Check a deposit into the pool
    pub fn check_take_stake(
        &self,
        token: &TokenSymbol,
        from: &Address,
        amount: &BigUint,
        lock_time: u64,
    ) -> Result<()> {
        self.read()
            .prepare_take_stake(token, from, amount, lock_time)
            .map(|_| ())
    }

    /// Record a deposit. The deposited tokens are credited to the pool by the
    /// caller.
    pub fn take_stake(
        &self,
        token: &TokenSymbol,
        from: &Address,
        amount: &BigUint,
        lock_time: u64,
    ) -> Result<()> {
        let mut state = self.write();
        let bonus = state.prepare_take_stake(token, from, amount, lock_time)?;
        if let Some((_, ledger)) = state.stake_pool_mut() {
            bonus.alloc(ledger);
            let entry = ledger.entry(*from).or_default();
            entry.amount += amount;
            entry.lock_time = entry.lock_time.max(lock_time);
        }
        tracing::debug!(account = %self.id(), from = %from, amount = %amount, "Stake taken");
        Ok(())
    }

    /// Check a withdrawal from the pool
    pub fn check_withdraw_stake(
        &self,
        token: &TokenSymbol,
        from: &Address,
        signers: &[Address],
        amount: &BigUint,
    ) -> Result<()> {
        self.read()
            .prepare_withdraw_stake(token, from, signers, amount)
            .map(|_| ())
    }

    /// Withdraw `amount` of the depositor's stake. The pool keeps the fee and
    /// is debited the net amount, which is returned for the caller to credit.
    pub fn withdraw_stake(
        &self,
        token: &TokenSymbol,
        from: &Address,
        signers: &[Address],
        amount: &BigUint,
    ) -> Result<BigUint> {
        let mut state = self.write();
        let plan = state.prepare_withdraw_stake(token, from, signers, amount)?;
        if amount.is_zero() {
            return Ok(plan.net);
        }
        if let Some((_, ledger)) = state.stake_pool_mut() {
            plan.bonus.alloc(ledger);
            let remove = match ledger.get_mut(from) {
                Some(entry) => {
                    entry.amount -= amount;
                    entry.amount.is_zero() && entry.approver.is_none()
                }
                None => false,
            };
            if remove {
                ledger.remove(from);
            }
        }
        state.debit(token, &plan.net)?;
        tracing::debug!(
            account = %self.id(),
            from = %from,
            amount = %amount,
            net = %plan.net,
            "Stake withdrawn"
        );
        Ok(plan.net)
    }

    /// Check an approver update on a ledger entry
    pub fn check_update_stake_approver(&self, from: &Address, signers: &[Address]) -> Result<()> {
        self.read().prepare_update_stake_approver(from, signers)
    }

    /// Set or clear the approver of `from`'s ledger entry
    pub fn update_stake_approver(
        &self,
        from: &Address,
        approver: Option<Address>,
        signers: &[Address],
    ) -> Result<()> {
        let mut state = self.write();
        state.prepare_update_stake_approver(from, signers)?;
        if let Some((_, ledger)) = state.stake_pool_mut() {
            let remove = match ledger.get_mut(from) {
                Some(entry) => {
                    entry.approver = approver;
                    entry.amount.is_zero() && approver.is_none()
                }
                None => false,
            };
            if remove {
                ledger.remove(from);
            }
        }
        tracing::debug!(account = %self.id(), from = %from, "Stake approver updated");
        Ok(())
    }

    /// Stake pool configuration
    pub fn stake_config(&self) -> Option<StakeConfig> {
        self.read().stake_pool().ok().map(|(config, _)| config.clone())
    }

    /// Ledger entries with pending bonus included, for one depositor or all
    pub fn stake_info(&self, from: Option<&Address>) -> Result<BTreeMap<Address, StakeEntry>> {
        let state = self.read();
        let bonus = state.stake_bonus()?;
        let (_, ledger) = state.stake_pool()?;
        Ok(ledger
            .iter()
            .filter(|(addr, _)| from.map_or(true, |f| f == *addr))
            .map(|(addr, entry)| {
                let mut entry = entry.clone();
                entry.amount = bonus.with_bonus(&entry.amount);
                (*addr, entry)
            })
            .collect())
    }
}
