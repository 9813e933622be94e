use super::{forbid_to, require_zero_amount, Tx, TxBase};
use crate::{transaction::Transaction, Result};
use account_core::{Accounter, TxType};
use num_bigint::BigUint;

/// Replace the sender's keepers, threshold and approver
#[derive(Debug)]
pub struct TxUpdateAccountInfo {
    accounter: Accounter,
}

impl TxUpdateAccountInfo {
    /// Stateless checks
    pub fn decode(tx: &Transaction) -> Result<Self> {
        forbid_to(tx)?;
        require_zero_amount(tx)?;
        let accounter: Accounter = tx.tx.payload()?;
        accounter.validate(false)?;
        Ok(Self { accounter })
    }
}

impl Tx for TxUpdateAccountInfo {
    fn ty(&self) -> TxType {
        TxType::UpdateAccountInfo
    }

    fn signing_plus(&self) -> bool {
        true
    }

    fn verify(&self, base: &TxBase<'_>) -> Result<()> {
        base.from.check_update_keepers(&self.accounter)?;
        Ok(())
    }

    fn accept(&self, base: &TxBase<'_>) -> Result<()> {
        base.from.update_keepers(&self.accounter)?;
        base.accept(&BigUint::default())
    }
}
