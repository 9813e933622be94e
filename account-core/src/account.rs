//! Per-address account record
//!
//! An [`Account`] owns a reader/writer lock around its [`AccountState`].
//! Queries and every `check_*` method take the shared lock; mutators take the
//! exclusive lock for the whole read-modify-write. Each check/mutate pair runs
//! the same `prepare_*` validation on the state, the mutator then commits the
//! prepared result, so a successful check implies the mutation succeeds on the
//! same state and inputs.
//!
//! No method holds two account locks at once. Operations that move funds to
//! another account (destroying a token or stake account) finish their own
//! critical section before crediting the recipient.

use crate::{
    lending::Lending,
    signing::{satisfy_signing, satisfy_signing_plus},
    stake::{StakeConfig, StakeEntry},
    types::{Address, TokenSymbol, TxType},
    Error, Result,
};
use num_bigint::BigUint;
use num_traits::Zero;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum number of keepers per account
pub const MAX_KEEPERS: usize = 64;

/// Transaction kinds a token account may send
const TOKEN_FROM_TX_TYPES: &[TxType] = &[
    TxType::Transfer,
    TxType::TransferCash,
    TxType::AddNonceTable,
    TxType::UpdateAccountInfo,
    TxType::DestroyToken,
    TxType::OpenLending,
    TxType::CloseLending,
];

/// Transaction kinds that may target a token account
const TOKEN_TO_TX_TYPES: &[TxType] = &[
    TxType::Transfer,
    TxType::TransferCash,
    TxType::Borrow,
    TxType::Repay,
];

/// Transaction kinds every stake account may send
const STAKE_FROM_TX_TYPES_0: &[TxType] = &[
    TxType::AddNonceTable,
    TxType::UpdateAccountInfo,
    TxType::ResetStake,
    TxType::DestroyStake,
    TxType::OpenLending,
    TxType::CloseLending,
];

/// Added for stake type 1 and above: staking into other pools
const STAKE_FROM_TX_TYPES_1: &[TxType] = &[
    TxType::TakeStake,
    TxType::WithdrawStake,
    TxType::UpdateStakeApprover,
];

/// Added for stake type 2: moving tokens onward
const STAKE_FROM_TX_TYPES_2: &[TxType] = &[TxType::Transfer, TxType::TransferCash];

/// Transaction kinds that may target a stake account
const STAKE_TO_TX_TYPES: &[TxType] = &[
    TxType::Transfer,
    TxType::TakeStake,
    TxType::WithdrawStake,
    TxType::UpdateStakeApprover,
    TxType::Borrow,
    TxType::Repay,
];

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Regular account
    Plain,
    /// Token issuer, lives at a token symbol address
    Token,
    /// Stake pool, lives at a stake symbol address
    Stake,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Plain => f.write_str("PlainAccount"),
            Role::Token => f.write_str("TokenAccount"),
            Role::Stake => f.write_str("StakeAccount"),
        }
    }
}

/// Role together with its role-specific state
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RoleState {
    Plain,
    Token {
        max_total_supply: BigUint,
    },
    Stake {
        config: StakeConfig,
        ledger: BTreeMap<Address, StakeEntry>,
    },
}

impl RoleState {
    pub(crate) fn role(&self) -> Role {
        match self {
            RoleState::Plain => Role::Plain,
            RoleState::Token { .. } => Role::Token,
            RoleState::Stake { .. } => Role::Stake,
        }
    }
}

/// Governance settings supplied when creating or updating an account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accounter {
    /// Minimum number of keepers that must sign
    pub threshold: u16,
    /// Authorized signers
    pub keepers: Vec<Address>,
    /// Optional co-signer for kinds in `approve_list`
    pub approver: Option<Address>,
    /// Kinds requiring the approver; empty means all kinds
    pub approve_list: Vec<TxType>,
}

impl Accounter {
    /// Syntactic validation. Token and stake accounts must have keepers.
    pub fn validate(&self, require_keepers: bool) -> Result<()> {
        if self.keepers.len() > MAX_KEEPERS {
            return Err(Error::InvalidInput(format!(
                "too many keepers, expected <= {}, got {}",
                MAX_KEEPERS,
                self.keepers.len()
            )));
        }
        if require_keepers && self.keepers.is_empty() {
            return Err(Error::InvalidInput("keepers required".to_string()));
        }
        for (i, keeper) in self.keepers.iter().enumerate() {
            if keeper.is_empty() || self.keepers[..i].contains(keeper) {
                return Err(Error::InvalidInput(format!("invalid keeper {}", keeper)));
            }
        }
        if usize::from(self.threshold) > self.keepers.len() {
            return Err(Error::InvalidInput(format!(
                "invalid threshold, expected <= {}, got {}",
                self.keepers.len(),
                self.threshold
            )));
        }
        if !self.keepers.is_empty() && self.threshold == 0 {
            return Err(Error::InvalidInput("invalid threshold, expected >= 1".to_string()));
        }
        if let Some(approver) = &self.approver {
            if approver.is_empty() {
                return Err(Error::InvalidInput("invalid approver".to_string()));
            }
        }
        for (i, ty) in self.approve_list.iter().enumerate() {
            if self.approve_list[..i].contains(ty) {
                return Err(Error::InvalidInput(format!("duplicate approve type {}", ty)));
            }
        }
        Ok(())
    }
}

/// Lock-free account record. Only reachable through [`Account`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub(crate) id: Address,
    pub(crate) role: RoleState,
    pub(crate) nonce: u64,
    pub(crate) balance: BigUint,
    pub(crate) pledge: BigUint,
    pub(crate) tokens: BTreeMap<TokenSymbol, BigUint>,
    pub(crate) nonce_table: BTreeMap<u64, Vec<u64>>,
    pub(crate) threshold: u16,
    pub(crate) keepers: Vec<Address>,
    pub(crate) approver: Option<Address>,
    pub(crate) approve_list: Vec<TxType>,
    pub(crate) lending: Option<Lending>,
    pub(crate) height: u64,
    pub(crate) timestamp: u64,
}

impl AccountState {
    pub(crate) fn new(id: Address) -> Self {
        Self {
            id,
            role: RoleState::Plain,
            nonce: 0,
            balance: BigUint::zero(),
            pledge: BigUint::zero(),
            tokens: BTreeMap::new(),
            nonce_table: BTreeMap::new(),
            threshold: 0,
            keepers: Vec::new(),
            approver: None,
            approve_list: Vec::new(),
            lending: None,
            height: 0,
            timestamp: 0,
        }
    }

    /// Plain role with no keepers
    pub(crate) fn is_empty(&self) -> bool {
        self.role == RoleState::Plain && self.keepers.is_empty()
    }

    /// Everything held of `token`, pledge included
    pub(crate) fn balance_of_all(&self, token: &TokenSymbol) -> BigUint {
        if token.is_native() {
            self.balance.clone()
        } else {
            self.tokens.get(token).cloned().unwrap_or_default()
        }
    }

    /// Spendable amount of `token`: the native balance excludes the pledge
    pub(crate) fn spendable(&self, token: &TokenSymbol) -> BigUint {
        if token.is_native() {
            if self.balance > self.pledge {
                &self.balance - &self.pledge
            } else {
                BigUint::zero()
            }
        } else {
            self.tokens.get(token).cloned().unwrap_or_default()
        }
    }

    pub(crate) fn require_balance(&self, token: &TokenSymbol, amount: &BigUint) -> Result<()> {
        let spendable = self.spendable(token);
        if *amount > spendable {
            return Err(Error::InsufficientBalance {
                account: self.id,
                token: *token,
                expected: amount.clone(),
                actual: spendable,
            });
        }
        Ok(())
    }

    pub(crate) fn credit(&mut self, token: &TokenSymbol, amount: &BigUint) {
        if token.is_native() {
            self.balance += amount;
        } else {
            *self.tokens.entry(*token).or_default() += amount;
        }
    }

    pub(crate) fn debit(&mut self, token: &TokenSymbol, amount: &BigUint) -> Result<()> {
        self.require_balance(token, amount)?;
        if token.is_native() {
            self.balance -= amount;
        } else if let Some(held) = self.tokens.get_mut(token) {
            *held -= amount;
        }
        Ok(())
    }

    pub(crate) fn check_nonce(&self, nonce: u64) -> Result<()> {
        if nonce != self.nonce {
            return Err(Error::NonceMismatch {
                account: self.id,
                expected: self.nonce,
                actual: nonce,
            });
        }
        Ok(())
    }

    pub(crate) fn set_governance(&mut self, accounter: &Accounter) {
        self.threshold = accounter.threshold;
        self.keepers = accounter.keepers.clone();
        self.approver = accounter.approver;
        self.approve_list = accounter.approve_list.clone();
    }

    /// Demote to a plain account, clearing governance and role state
    pub(crate) fn reset_to_plain(&mut self) {
        self.role = RoleState::Plain;
        self.pledge = BigUint::zero();
        self.threshold = 0;
        self.keepers.clear();
        self.approver = None;
        self.approve_list.clear();
        self.nonce_table.clear();
        self.lending = None;
    }

    pub(crate) fn is_locked(&self, lock_time: u64) -> bool {
        lock_time > self.timestamp
    }

    /// Check the account invariants
    pub(crate) fn validate(&self) -> Result<()> {
        if matches!(self.role, RoleState::Token { .. } | RoleState::Stake { .. })
            && self.balance < self.pledge
        {
            return Err(Error::InvalidRoleState(format!(
                "{} {} balance {} below pledge {}",
                self.role.role(),
                self.id,
                self.balance,
                self.pledge
            )));
        }
        if self.nonce_table.len() > crate::nonce::MAX_NONCE_GROUPS {
            return Err(Error::TooManyNonceGroups {
                max: crate::nonce::MAX_NONCE_GROUPS,
            });
        }
        Accounter {
            threshold: self.threshold,
            keepers: self.keepers.clone(),
            approver: self.approver,
            approve_list: self.approve_list.clone(),
        }
        .validate(false)
        .map_err(|e| Error::InvalidRoleState(format!("{} governance: {}", self.id, e)))?;
        match &self.role {
            RoleState::Plain => Ok(()),
            RoleState::Token { max_total_supply } => {
                let token = TokenSymbol::from_address(&self.id);
                if !token.is_valid() {
                    return Err(Error::InvalidRoleState(format!(
                        "invalid token account {}",
                        self.id
                    )));
                }
                if !token.is_native() && self.balance_of_all(&token) > *max_total_supply {
                    return Err(Error::InvalidRoleState(format!(
                        "{} supply exceeds max total supply {}",
                        token, max_total_supply
                    )));
                }
                Ok(())
            }
            RoleState::Stake { config, .. } => config.validate(),
        }
    }
}

/// Account handle shared between concurrently validated transactions
pub struct Account {
    id: Address,
    state: RwLock<AccountState>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("state", &*self.state.read())
            .finish()
    }
}

impl Account {
    /// Create an empty plain account
    pub fn new(id: Address) -> Self {
        Self {
            id,
            state: RwLock::new(AccountState::new(id)),
        }
    }

    pub(crate) fn from_state(state: AccountState) -> Self {
        Self {
            id: state.id,
            state: RwLock::new(state),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, AccountState> {
        self.state.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, AccountState> {
        self.state.write()
    }

    /// Account address
    pub fn id(&self) -> Address {
        self.id
    }

    /// Capture block context and reset the pledge. A role account's pledge
    /// is capped at its native balance, so raising the configured minimum
    /// never leaves an existing pool invalid.
    pub fn init(&self, pledge: BigUint, height: u64, timestamp: u64) {
        let mut state = self.write();
        state.pledge = if state.role == RoleState::Plain {
            BigUint::zero()
        } else {
            pledge.min(state.balance.clone())
        };
        state.height = height;
        state.timestamp = timestamp;
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AccountState {
        self.read().clone()
    }

    /// Account role
    pub fn role(&self) -> Role {
        self.read().role.role()
    }

    /// Plain role with no keepers configured
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Sequential nonce
    pub fn nonce(&self) -> u64 {
        self.read().nonce
    }

    /// Native balance, pledge included
    pub fn balance(&self) -> BigUint {
        self.read().balance.clone()
    }

    /// Reserved collateral
    pub fn pledge(&self) -> BigUint {
        self.read().pledge.clone()
    }

    /// Spendable amount of `token`
    pub fn balance_of(&self, token: &TokenSymbol) -> BigUint {
        self.read().spendable(token)
    }

    /// Everything held of `token`, pledge included
    pub fn balance_of_all(&self, token: &TokenSymbol) -> BigUint {
        self.read().balance_of_all(token)
    }

    /// Signing threshold
    pub fn threshold(&self) -> u16 {
        self.read().threshold
    }

    /// Authorized signers
    pub fn keepers(&self) -> Vec<Address> {
        self.read().keepers.clone()
    }

    /// Approver co-signer
    pub fn approver(&self) -> Option<Address> {
        self.read().approver
    }

    /// Kinds requiring the approver
    pub fn approve_list(&self) -> Vec<TxType> {
        self.read().approve_list.clone()
    }

    /// Block height captured at init
    pub fn height(&self) -> u64 {
        self.read().height
    }

    /// Block timestamp captured at init
    pub fn timestamp(&self) -> u64 {
        self.read().timestamp
    }

    /// Maximum supply of a token account
    pub fn max_total_supply(&self) -> Option<BigUint> {
        match &self.read().role {
            RoleState::Token { max_total_supply } => Some(max_total_supply.clone()),
            _ => None,
        }
    }

    /// Check the account invariants
    pub fn valid(&self) -> Result<()> {
        self.read().validate()
    }

    /// Check that the keepers (or the account key itself when there are no
    /// keepers) authorized the operation
    pub fn satisfy_signing(&self, signers: &[Address]) -> bool {
        let state = self.read();
        satisfy_signing(
            state.threshold,
            &state.keepers,
            signers,
            signers.contains(&self.id),
        )
    }

    /// Like [`Account::satisfy_signing`], one signature above the threshold
    pub fn satisfy_signing_plus(&self, signers: &[Address]) -> bool {
        let state = self.read();
        satisfy_signing_plus(
            state.threshold,
            &state.keepers,
            signers,
            signers.contains(&self.id),
        )
    }

    /// Check the approver co-signature for `ty`
    pub fn satisfy_approving(&self, ty: TxType, signers: &[Address]) -> bool {
        let state = self.read();
        match &state.approver {
            Some(approver) if state.approve_list.is_empty() || state.approve_list.contains(&ty) => {
                signers.contains(approver)
            }
            _ => true,
        }
    }

    /// Check that this account may send a transaction of kind `ty`
    pub fn check_as_from(&self, ty: TxType) -> Result<()> {
        let state = self.read();
        let allowed = match &state.role {
            RoleState::Plain => true,
            RoleState::Token { .. } => TOKEN_FROM_TX_TYPES.contains(&ty),
            RoleState::Stake { config, .. } => {
                STAKE_FROM_TX_TYPES_0.contains(&ty)
                    || (config.ty >= 1 && STAKE_FROM_TX_TYPES_1.contains(&ty))
                    || (config.ty == 2 && STAKE_FROM_TX_TYPES_2.contains(&ty))
            }
        };
        if !allowed {
            return Err(Error::InvalidRoleState(format!(
                "can't use {} {} as sender for {}",
                state.role.role(),
                self.id,
                ty
            )));
        }
        Ok(())
    }

    /// Check that a transaction of kind `ty` may target this account
    pub fn check_as_to(&self, ty: TxType) -> Result<()> {
        let state = self.read();
        let allowed = match &state.role {
            RoleState::Plain => true,
            RoleState::Token { .. } => TOKEN_TO_TX_TYPES.contains(&ty),
            RoleState::Stake { .. } => STAKE_TO_TX_TYPES.contains(&ty),
        };
        if !allowed {
            return Err(Error::InvalidRoleState(format!(
                "can't use {} {} as recipient for {}",
                state.role.role(),
                self.id,
                ty
            )));
        }
        Ok(())
    }

    /// Credit `amount` of `token`
    pub fn add(&self, token: &TokenSymbol, amount: &BigUint) {
        if amount.is_zero() {
            return;
        }
        let mut state = self.write();
        state.credit(token, amount);
        tracing::debug!(account = %self.id, token = %token, amount = %amount, "Balance credited");
    }

    /// Check that `amount` of `token` is spendable
    pub fn check_balance(&self, token: &TokenSymbol, amount: &BigUint) -> Result<()> {
        self.read().require_balance(token, amount)
    }

    /// Debit `amount` of `token`
    pub fn sub(&self, token: &TokenSymbol, amount: &BigUint) -> Result<()> {
        let mut state = self.write();
        state.debit(token, amount)?;
        tracing::debug!(account = %self.id, token = %token, amount = %amount, "Balance debited");
        Ok(())
    }

    /// Check a nonce-ordered debit
    pub fn check_sub_by_nonce(&self, token: &TokenSymbol, nonce: u64, amount: &BigUint) -> Result<()> {
        let state = self.read();
        state.check_nonce(nonce)?;
        state.require_balance(token, amount)
    }

    /// Debit `amount` and advance the nonce, only if `nonce` is current
    pub fn sub_by_nonce(&self, token: &TokenSymbol, nonce: u64, amount: &BigUint) -> Result<()> {
        let mut state = self.write();
        state.check_nonce(nonce)?;
        state.debit(token, amount)?;
        state.nonce += 1;
        tracing::debug!(
            account = %self.id,
            token = %token,
            amount = %amount,
            nonce = state.nonce,
            "Balance debited by nonce"
        );
        Ok(())
    }

    fn prepare_update_keepers(state: &AccountState, accounter: &Accounter) -> Result<()> {
        accounter.validate(state.role != RoleState::Plain)
    }

    /// Check a governance update
    pub fn check_update_keepers(&self, accounter: &Accounter) -> Result<()> {
        Self::prepare_update_keepers(&self.read(), accounter)
    }

    /// Replace threshold, keepers, approver and approve list
    pub fn update_keepers(&self, accounter: &Accounter) -> Result<()> {
        let mut state = self.write();
        Self::prepare_update_keepers(&state, accounter)?;
        state.set_governance(accounter);
        tracing::info!(
            account = %self.id,
            threshold = accounter.threshold,
            keepers = accounter.keepers.len(),
            "Keepers updated"
        );
        Ok(())
    }
}

pub(crate) fn positive(amount: &BigUint, what: &str) -> Result<()> {
    if amount.is_zero() {
        return Err(Error::InvalidInput(format!("invalid {}, expected > 0", what)));
    }
    Ok(())
}
