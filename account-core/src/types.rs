//! Core types for account state
//!
//! All identifiers are fixed-width 20-byte values so that they serialize
//! deterministically with bincode and can be used as ordered map keys.
//! Token and stake accounts live at addresses whose bytes spell out their
//! symbol, right-aligned and zero-padded on the left.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address length in bytes
pub const ADDRESS_LEN: usize = 20;

/// Account address
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address. Home of the native token and sink of burned fees.
    pub const EMPTY: Address = Address([0u8; ADDRESS_LEN]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Check if this is the all-zero address
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Create from a byte slice of exactly 20 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidInput(format!(
                "invalid address length, expected {}, got {}",
                ADDRESS_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)
            .map_err(|e| Error::InvalidInput(format!("invalid address {:?}: {}", s, e)))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Check that `bytes` hold `prefix` followed by 1-9 chars of `[A-Z0-9]`
/// (first one a letter), right-aligned with zero padding.
fn valid_symbol(bytes: &[u8; ADDRESS_LEN], prefix: u8) -> bool {
    let start = match bytes.iter().position(|&b| b != 0) {
        Some(i) => i,
        None => return false,
    };
    let symbol = &bytes[start..];
    if symbol.len() < 2 || symbol.len() > 10 || symbol[0] != prefix {
        return false;
    }
    if !symbol[1].is_ascii_uppercase() {
        return false;
    }
    symbol[2..]
        .iter()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

fn encode_symbol(s: &str) -> Result<[u8; ADDRESS_LEN]> {
    if s.is_empty() || s.len() > ADDRESS_LEN {
        return Err(Error::InvalidInput(format!("invalid symbol {:?}", s)));
    }
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes[ADDRESS_LEN - s.len()..].copy_from_slice(s.as_bytes());
    Ok(bytes)
}

fn symbol_str(bytes: &[u8; ADDRESS_LEN]) -> &str {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(ADDRESS_LEN);
    std::str::from_utf8(&bytes[start..]).unwrap_or("")
}

/// Token symbol, e.g. `$USDT`. The zero value is the native token.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenSymbol([u8; ADDRESS_LEN]);

impl TokenSymbol {
    /// The native currency
    pub const NATIVE: TokenSymbol = TokenSymbol([0u8; ADDRESS_LEN]);

    /// Display name of the native currency
    pub const NATIVE_NAME: &'static str = "$LDC";

    /// Parse and validate a token symbol
    pub fn new(s: &str) -> Result<Self> {
        if s == Self::NATIVE_NAME {
            return Ok(Self::NATIVE);
        }
        let symbol = Self(encode_symbol(s)?);
        if !symbol.is_valid() {
            return Err(Error::InvalidInput(format!("invalid token symbol {:?}", s)));
        }
        Ok(symbol)
    }

    /// Interpret an account address as a token symbol
    pub fn from_address(address: &Address) -> Self {
        Self(address.0)
    }

    /// Address of the account issuing this token
    pub fn to_address(&self) -> Address {
        Address(self.0)
    }

    /// Native token check
    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }

    /// Validity check. The native token is always valid.
    pub fn is_valid(&self) -> bool {
        self.is_native() || valid_symbol(&self.0, b'$')
    }
}

impl FromStr for TokenSymbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            f.write_str(Self::NATIVE_NAME)
        } else {
            f.write_str(symbol_str(&self.0))
        }
    }
}

impl fmt::Debug for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Stake pool symbol, e.g. `#POOL1`
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StakeSymbol([u8; ADDRESS_LEN]);

impl StakeSymbol {
    /// Parse and validate a stake symbol
    pub fn new(s: &str) -> Result<Self> {
        let symbol = Self(encode_symbol(s)?);
        if !symbol.is_valid() {
            return Err(Error::InvalidInput(format!("invalid stake symbol {:?}", s)));
        }
        Ok(symbol)
    }

    /// Interpret an account address as a stake symbol
    pub fn from_address(address: &Address) -> Self {
        Self(address.0)
    }

    /// Address of the stake account
    pub fn to_address(&self) -> Address {
        Address(self.0)
    }

    /// Validity check
    pub fn is_valid(&self) -> bool {
        valid_symbol(&self.0, b'#')
    }
}

impl FromStr for StakeSymbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for StakeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(symbol_str(&self.0))
    }
}

impl fmt::Debug for StakeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TxType {
    /// Native or token transfer
    Transfer = 1,
    /// Redeem a pre-authorized cash voucher against the issuer's nonce table
    TransferCash = 2,
    /// Register one-time nonces
    AddNonceTable = 3,
    /// Update keepers, threshold and approver
    UpdateAccountInfo = 4,
    /// Create a token account
    CreateToken = 5,
    /// Destroy a token account
    DestroyToken = 6,
    /// Create a stake account
    CreateStake = 7,
    /// Reset a stake account's configuration
    ResetStake = 8,
    /// Destroy a stake account
    DestroyStake = 9,
    /// Deposit into a stake pool
    TakeStake = 10,
    /// Withdraw from a stake pool
    WithdrawStake = 11,
    /// Set or clear a stake entry's approver
    UpdateStakeApprover = 12,
    /// Open a lending pool
    OpenLending = 13,
    /// Close a lending pool
    CloseLending = 14,
    /// Borrow from a lending pool
    Borrow = 15,
    /// Repay a lending pool
    Repay = 16,
}

impl TxType {
    /// Stable name used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Transfer => "Transfer",
            TxType::TransferCash => "TransferCash",
            TxType::AddNonceTable => "AddNonceTable",
            TxType::UpdateAccountInfo => "UpdateAccountInfo",
            TxType::CreateToken => "CreateToken",
            TxType::DestroyToken => "DestroyToken",
            TxType::CreateStake => "CreateStake",
            TxType::ResetStake => "ResetStake",
            TxType::DestroyStake => "DestroyStake",
            TxType::TakeStake => "TakeStake",
            TxType::WithdrawStake => "WithdrawStake",
            TxType::UpdateStakeApprover => "UpdateStakeApprover",
            TxType::OpenLending => "OpenLending",
            TxType::CloseLending => "CloseLending",
            TxType::Borrow => "Borrow",
            TxType::Repay => "Repay",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
