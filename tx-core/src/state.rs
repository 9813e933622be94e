//! Account loading service
//!
//! [`BlockState`] hands out shared account handles by address, creating empty
//! accounts on first reference. [`MemoryState`] keeps them in a concurrent
//! map and re-initializes each account with the block context the first time
//! it is loaded at a new height, resetting role pledges to the configured
//! minimums.
//!
//! Account mutations are not atomic across accounts; callers take a
//! [`Snapshot`] of the touched accounts before applying a transaction and
//! restore it if settlement fails part way. Restoring writes into the
//! existing handles, so accounts loaded earlier observe the rollback.

use crate::{config::FeeConfig, context::BlockContext, Result};
use account_core::{Account, Address, Role};
use dashmap::DashMap;
use num_bigint::BigUint;
use num_traits::Zero;
use parking_lot::RwLock;
use std::sync::Arc;

/// Encoded accounts captured before a mutation
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    accounts: Vec<(Address, Vec<u8>, Option<Vec<u8>>)>,
}

impl Snapshot {
    /// Number of captured accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// No accounts captured
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Account loading and rollback
pub trait BlockState: Send + Sync {
    /// Load the account at `id`, creating an empty one if needed
    fn load_account(&self, id: &Address) -> Result<Arc<Account>>;

    /// Capture the current state of `ids`
    fn snapshot(&self, ids: &[Address]) -> Result<Snapshot>;

    /// Put captured accounts back
    fn restore(&self, snapshot: Snapshot) -> Result<()>;
}

/// In-memory account service
#[derive(Debug)]
pub struct MemoryState {
    accounts: DashMap<Address, Arc<Account>>,
    context: RwLock<BlockContext>,
    fees: FeeConfig,
}

impl MemoryState {
    /// Create an empty state positioned at `context`
    pub fn new(context: BlockContext, fees: FeeConfig) -> Self {
        Self {
            accounts: DashMap::new(),
            context: RwLock::new(context),
            fees,
        }
    }

    /// Move to a new block; accounts re-initialize on their next load
    pub fn begin_block(&self, context: BlockContext) {
        tracing::debug!(height = context.height, timestamp = context.timestamp, "Block started");
        *self.context.write() = context;
    }

    /// Current block context
    pub fn context(&self) -> BlockContext {
        self.context.read().clone()
    }

    /// Number of known accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// No accounts known
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn pledge_for(&self, role: Role) -> BigUint {
        match role {
            Role::Plain => BigUint::zero(),
            Role::Token => self.fees.token_pledge(),
            Role::Stake => self.fees.stake_pledge(),
        }
    }

    fn init_account(&self, account: &Account) {
        let ctx = self.context.read();
        if account.height() != ctx.height || account.timestamp() != ctx.timestamp {
            account.init(self.pledge_for(account.role()), ctx.height, ctx.timestamp);
        }
    }
}

impl BlockState for MemoryState {
    fn load_account(&self, id: &Address) -> Result<Arc<Account>> {
        let account = self
            .accounts
            .entry(*id)
            .or_insert_with(|| Arc::new(Account::new(*id)))
            .value()
            .clone();
        self.init_account(&account);
        Ok(account)
    }

    fn snapshot(&self, ids: &[Address]) -> Result<Snapshot> {
        let mut accounts = Vec::with_capacity(ids.len());
        for id in ids {
            if accounts.iter().any(|(a, _, _)| a == id) {
                continue;
            }
            let account = self.load_account(id)?;
            let (data, ledger) = account.marshal()?;
            accounts.push((*id, data, ledger));
        }
        Ok(Snapshot { accounts })
    }

    fn restore(&self, snapshot: Snapshot) -> Result<()> {
        for (id, data, ledger) in &snapshot.accounts {
            let account = self
                .accounts
                .entry(*id)
                .or_insert_with(|| Arc::new(Account::new(*id)))
                .value()
                .clone();
            account.restore(data, ledger.as_deref())?;
        }
        tracing::debug!(accounts = snapshot.len(), "Snapshot restored");
        Ok(())
    }
}
