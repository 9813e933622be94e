use super::{
    forbid_to, require_native, require_no_payload, require_positive_amount, require_to,
    require_zero_amount, Tx, TxBase,
};
use crate::{transaction::Transaction, Error, Result};
use account_core::{Accounter, Address, StakeConfig, StakeSymbol, TokenSymbol, TxType};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Stake pool creation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStakePayload {
    /// Governance of the new stake account
    pub accounter: Accounter,
    /// Pool configuration
    pub config: StakeConfig,
}

/// Create a stake account; the transaction amount is the pledge
#[derive(Debug)]
pub struct TxCreateStake {
    payload: CreateStakePayload,
    pledge: BigUint,
}

impl TxCreateStake {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        require_to(tx)?;
        require_native(tx)?;
        let payload: CreateStakePayload = tx.tx.payload()?;
        let valid = tx
            .tx
            .to
            .map_or(false, |to| StakeSymbol::from_address(&to).is_valid());
        if !valid {
            return Err(Error::InvalidTx("invalid stake account".to_string()));
        }
        payload.accounter.validate(true)?;
        payload.config.validate()?;
        Ok(Self {
            payload,
            pledge: tx.tx.amount.clone(),
        })
    }
}

impl Tx for TxCreateStake {
    fn ty(&self) -> TxType {
        TxType::CreateStake
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        let min = base.fees.stake_pledge();
        if self.pledge < min {
            return Err(Error::InvalidTx(format!(
                "invalid pledge, expected >= {}, got {}",
                min, self.pledge
            )));
        }
        base.to()?
            .check_create_stake(&self.payload.accounter, &self.payload.config)?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.to()?.create_stake(
            &base.from.id(),
            self.pledge.clone(),
            &self.payload.accounter,
            &self.payload.config,
        )?;
        base.accept(&self.pledge)
    }
}

/// Replace a stake pool's lock time, fee and bounds
#[derive(Debug)]
pub struct TxResetStake {
    config: StakeConfig,
}

impl TxResetStake {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        forbid_to(tx)?;
        require_zero_amount(tx)?;
        let config: StakeConfig = tx.tx.payload()?;
        config.validate()?;
        Ok(Self { config })
    }
}

impl Tx for TxResetStake {
    fn ty(&self) -> TxType {
        TxType::ResetStake
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        base.from.check_reset_stake(&self.config)?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.from.reset_stake(&self.config)?;
        base.accept(&BigUint::default())
    }
}

/// Destroy a stake account, forwarding everything to the recipient
#[derive(Debug)]
pub struct TxDestroyStake;

impl TxDestroyStake {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        require_to(tx)?;
        require_zero_amount(tx)?;
        require_no_payload(tx)?;
        Ok(Self)
    }
}

impl Tx for TxDestroyStake {
    fn ty(&self) -> TxType {
        TxType::DestroyStake
    }

    fn signing_plus(&self) -> bool {
        true
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        base.from.check_destroy_stake(&base.to()?.id())?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.accept(&BigUint::default())?;
        base.from.destroy_stake(base.to()?)?;
        Ok(())
    }
}

/// TakeStake payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakeStakePayload {
    /// Optional personal lock time, zero for none
    pub lock_time: u64,
}

/// Deposit the transaction amount into a stake pool
#[derive(Debug)]
pub struct TxTakeStake {
    lock_time: u64,
    token: TokenSymbol,
    amount: BigUint,
}

impl TxTakeStake {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        require_to(tx)?;
        require_positive_amount(tx)?;
        let payload: TakeStakePayload = if tx.tx.data.is_empty() {
            TakeStakePayload::default()
        } else {
            tx.tx.payload()?
        };
        Ok(Self {
            lock_time: payload.lock_time,
            token: tx.tx.token,
            amount: tx.tx.amount.clone(),
        })
    }
}

impl Tx for TxTakeStake {
    fn ty(&self) -> TxType {
        TxType::TakeStake
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        base.to()?
            .check_take_stake(&self.token, &base.from.id(), &self.amount, self.lock_time)?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.to()?
            .take_stake(&self.token, &base.from.id(), &self.amount, self.lock_time)?;
        base.accept(&self.amount)
    }
}

/// WithdrawStake payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawStakePayload {
    /// Staked token
    pub token: TokenSymbol,
    /// Gross amount withdrawn, fee included
    pub amount: BigUint,
}

/// Withdraw from a stake pool; the net amount is paid to the sender
#[derive(Debug)]
pub struct TxWithdrawStake {
    payload: WithdrawStakePayload,
}

impl TxWithdrawStake {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        require_to(tx)?;
        require_zero_amount(tx)?;
        let payload: WithdrawStakePayload = tx.tx.payload()?;
        if !payload.token.is_valid() {
            return Err(Error::InvalidTx(format!("invalid token {}", payload.token)));
        }
        Ok(Self { payload })
    }
}

impl Tx for TxWithdrawStake {
    fn ty(&self) -> TxType {
        TxType::WithdrawStake
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        base.to()?.check_withdraw_stake(
            &self.payload.token,
            &base.from.id(),
            &base.signers,
            &self.payload.amount,
        )?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        let net = base.to()?.withdraw_stake(
            &self.payload.token,
            &base.from.id(),
            &base.signers,
            &self.payload.amount,
        )?;
        base.accept(&BigUint::default())?;
        base.from.add(&self.payload.token, &net);
        Ok(())
    }
}

/// UpdateStakeApprover payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStakeApproverPayload {
    /// New approver, `None` clears it
    pub approver: Option<Address>,
}

/// Set or clear the approver on the sender's stake entry
#[derive(Debug)]
pub struct TxUpdateStakeApprover {
    approver: Option<Address>,
}

impl TxUpdateStakeApprover {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        require_to(tx)?;
        require_zero_amount(tx)?;
        let payload: UpdateStakeApproverPayload = tx.tx.payload()?;
        if payload.approver.map_or(false, |a| a.is_empty()) {
            return Err(Error::InvalidTx("invalid approver".to_string()));
        }
        Ok(Self {
            approver: payload.approver,
        })
    }
}

impl Tx for TxUpdateStakeApprover {
    fn ty(&self) -> TxType {
        TxType::UpdateStakeApprover
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        base.to()?
            .check_update_stake_approver(&base.from.id(), &base.signers)?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.to()?
            .update_stake_approver(&base.from.id(), self.approver, &base.signers)?;
        base.accept(&BigUint::default())
    }
}
