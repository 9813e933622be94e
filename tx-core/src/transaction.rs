//! Transaction model
//!
//! A [`Transaction`] is the unsigned [`TxData`] plus signatures. Keepers sign
//! the SHA-256 digest of the unsigned bincode bytes; TransferCash vouchers are
//! additionally signed by the issuer over the digest of the payload alone
//! (`ex_signatures`).
//!
//! Gas is a function of the unsigned encoding size. bincode encodes integers
//! at fixed width, so filling in the `gas` field does not change the size it
//! was computed from.

use crate::{
    config::FeeConfig,
    crypto::{self, KeyPair, Signature},
    Error, Result,
};
use account_core::{Address, TokenSymbol, TxType};
use num_bigint::BigUint;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Unsigned transaction body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxData {
    /// Transaction kind
    pub ty: TxType,
    /// Chain id
    pub chain_id: u64,
    /// Sender nonce
    pub nonce: u64,
    /// Tip per gas offered to the miner
    pub gas_tip: u64,
    /// Maximum total price per gas
    pub gas_fee_cap: u64,
    /// Declared gas, must equal the required gas
    pub gas: u64,
    /// Sender
    pub from: Address,
    /// Recipient, when the kind has one
    pub to: Option<Address>,
    /// Token moved by the base settlement
    pub token: TokenSymbol,
    /// Amount moved by the base settlement
    pub amount: BigUint,
    /// Kind-specific bincode payload
    pub data: Vec<u8>,
}

impl TxData {
    /// Body with zero amount, native token and empty payload
    pub fn new(ty: TxType, chain_id: u64, from: Address, to: Option<Address>) -> Self {
        Self {
            ty,
            chain_id,
            nonce: 0,
            gas_tip: 0,
            gas_fee_cap: 0,
            gas: 0,
            from,
            to,
            token: TokenSymbol::NATIVE,
            amount: BigUint::default(),
            data: Vec::new(),
        }
    }

    /// Canonical unsigned bytes
    pub fn unsigned_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Digest signed by the sender's keepers
    pub fn signing_hash(&self) -> Result<[u8; 32]> {
        Ok(crypto::hash_bytes(&self.unsigned_bytes()?))
    }

    /// Encode a kind payload into `data`
    pub fn set_payload<T: Serialize>(&mut self, payload: &T) -> Result<()> {
        self.data = bincode::serialize(payload)?;
        Ok(())
    }

    /// Decode the kind payload
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        bincode::deserialize(&self.data)
            .map_err(|e| Error::InvalidTx(format!("invalid {} payload: {}", self.ty, e)))
    }

    /// Gas required for this body under `fees`
    pub fn required_gas(&self, fees: &FeeConfig) -> Result<u64> {
        let size = self.unsigned_bytes()?.len() as u64;
        let size_gas = if size <= fees.threshold_gas {
            size
        } else {
            fees.threshold_gas + (size - fees.threshold_gas) * 2
        };
        Ok(base_gas(self.ty) + size_gas)
    }

    /// Set `gas` to the required gas
    pub fn fill_gas(&mut self, fees: &FeeConfig) -> Result<()> {
        self.gas = self.required_gas(fees)?;
        Ok(())
    }
}

/// Fixed gas charged per kind on top of the size charge
pub fn base_gas(ty: TxType) -> u64 {
    match ty {
        TxType::Transfer | TxType::TransferCash => 0,
        TxType::AddNonceTable
        | TxType::TakeStake
        | TxType::WithdrawStake
        | TxType::UpdateStakeApprover
        | TxType::Borrow
        | TxType::Repay => 100,
        TxType::UpdateAccountInfo
        | TxType::ResetStake
        | TxType::OpenLending
        | TxType::CloseLending => 500,
        TxType::CreateToken | TxType::DestroyToken | TxType::CreateStake | TxType::DestroyStake => {
            1_000
        }
    }
}

/// Signed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unsigned body
    pub tx: TxData,
    /// Sender keeper signatures over the body
    pub signatures: Vec<Signature>,
    /// Issuer signatures over the payload, TransferCash only
    pub ex_signatures: Vec<Signature>,
}

impl Transaction {
    /// Wrap an unsigned body
    pub fn new(tx: TxData) -> Self {
        Self {
            tx,
            signatures: Vec::new(),
            ex_signatures: Vec::new(),
        }
    }

    /// Transaction kind
    pub fn ty(&self) -> TxType {
        self.tx.ty
    }

    /// Transaction id, the hex digest of the full encoding
    pub fn id(&self) -> Result<String> {
        Ok(hex::encode(crypto::hash_bytes(&bincode::serialize(self)?)))
    }

    /// Add a keeper signature
    pub fn sign(&mut self, key: &KeyPair) -> Result<()> {
        let hash = self.tx.signing_hash()?;
        self.signatures.push(key.sign(&hash));
        Ok(())
    }

    /// Add an issuer signature over the payload
    pub fn sign_ex(&mut self, key: &KeyPair) -> Result<()> {
        let hash = crypto::hash_bytes(&self.tx.data);
        self.ex_signatures.push(key.sign(&hash));
        Ok(())
    }

    /// Verified keeper signer addresses
    pub fn signers(&self) -> Result<Vec<Address>> {
        crypto::recover_signers(&self.tx.signing_hash()?, &self.signatures)
    }

    /// Verified issuer signer addresses
    pub fn ex_signers(&self) -> Result<Vec<Address>> {
        crypto::recover_signers(&crypto::hash_bytes(&self.tx.data), &self.ex_signatures)
    }

    /// Stateless checks shared by every kind
    pub fn syntactic_verify(&self) -> Result<()> {
        let tx = &self.tx;
        if tx.from.is_empty() {
            return Err(Error::InvalidTx("invalid from, zero address".to_string()));
        }
        if tx.to == Some(tx.from) {
            return Err(Error::InvalidTx(format!("invalid to, same as from {}", tx.from)));
        }
        if !tx.token.is_valid() {
            return Err(Error::InvalidTx(format!("invalid token {}", tx.token)));
        }
        if tx.gas == 0 {
            return Err(Error::InvalidGas("gas not set".to_string()));
        }
        if tx.gas_fee_cap < tx.gas_tip {
            return Err(Error::InvalidGas(format!(
                "gas fee cap {} below gas tip {}",
                tx.gas_fee_cap, tx.gas_tip
            )));
        }
        if self.signatures.is_empty() {
            return Err(Error::InvalidTx("no signatures".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer() -> TxData {
        let mut tx = TxData::new(
            TxType::Transfer,
            2357,
            Address::new([1u8; 20]),
            Some(Address::new([2u8; 20])),
        );
        tx.gas_fee_cap = 10_000;
        tx.amount = BigUint::from(1_000u32);
        tx
    }

    #[test]
    fn test_gas_stable_after_fill() {
        let fees = FeeConfig::default();
        let mut tx = transfer();
        let before = tx.required_gas(&fees).unwrap();
        tx.fill_gas(&fees).unwrap();
        assert_eq!(tx.gas, before);
        assert_eq!(tx.required_gas(&fees).unwrap(), before);
    }

    #[test]
    fn test_gas_grows_with_payload() {
        let fees = FeeConfig {
            threshold_gas: 10,
            ..FeeConfig::default()
        };
        let mut tx = transfer();
        let small = tx.required_gas(&fees).unwrap();
        tx.data = vec![0u8; 100];
        assert_eq!(tx.required_gas(&fees).unwrap(), small + 200);
    }

    #[test]
    fn test_sign_and_signers() {
        let key = KeyPair::from_seed(&[1u8; 32]);
        let mut tx = Transaction::new(transfer());
        tx.sign(&key).unwrap();
        assert_eq!(tx.signers().unwrap(), vec![key.address()]);

        // tampering invalidates signatures
        tx.tx.amount = BigUint::from(2_000u32);
        assert!(tx.signers().is_err());
    }

    #[test]
    fn test_syntactic_verify() {
        let key = KeyPair::from_seed(&[1u8; 32]);
        let fees = FeeConfig::default();
        let mut body = transfer();
        body.fill_gas(&fees).unwrap();

        let mut tx = Transaction::new(body.clone());
        assert!(tx.syntactic_verify().is_err());
        tx.sign(&key).unwrap();
        assert!(tx.syntactic_verify().is_ok());

        let mut same = body.clone();
        same.to = Some(same.from);
        let mut tx = Transaction::new(same);
        tx.sign(&key).unwrap();
        assert!(tx.syntactic_verify().is_err());

        let mut tip = body;
        tip.gas_tip = tip.gas_fee_cap + 1;
        let mut tx = Transaction::new(tip);
        tx.sign(&key).unwrap();
        assert!(matches!(tx.syntactic_verify(), Err(Error::InvalidGas(_))));
    }
}
