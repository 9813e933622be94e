//! Configuration for transaction processing

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chain id every transaction must carry
    pub chain_id: u64,

    /// Fee schedule
    pub fees: FeeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: 2357,
            fees: FeeConfig::default(),
        }
    }
}

/// Fee and gas schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Lowest accepted block gas price
    pub min_gas_price: u64,

    /// Highest accepted block gas price
    pub max_gas_price: u64,

    /// Payload bytes charged at the single rate; bytes beyond are charged double
    pub threshold_gas: u64,

    /// Gas limit per transaction
    pub max_tx_gas: u64,

    /// Minimum pledge for a token account (native units)
    pub min_token_pledge: u64,

    /// Minimum pledge for a stake account (native units)
    pub min_stake_pledge: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            min_gas_price: 10_000,
            max_gas_price: 100_000,
            threshold_gas: 1_000,
            max_tx_gas: 42_000_000,
            min_token_pledge: 10_000_000_000_000, // 10,000 LDC
            min_stake_pledge: 1_000_000_000_000,  // 1,000 LDC
        }
    }
}

impl FeeConfig {
    /// Minimum token pledge as an amount
    pub fn token_pledge(&self) -> BigUint {
        BigUint::from(self.min_token_pledge)
    }

    /// Minimum stake pledge as an amount
    pub fn stake_pledge(&self) -> BigUint {
        BigUint::from(self.min_stake_pledge)
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(chain_id) = std::env::var("LDVM_CHAIN_ID") {
            config.chain_id = parse_env("LDVM_CHAIN_ID", &chain_id)?;
        }

        if let Ok(price) = std::env::var("LDVM_MIN_GAS_PRICE") {
            config.fees.min_gas_price = parse_env("LDVM_MIN_GAS_PRICE", &price)?;
        }

        if let Ok(gas) = std::env::var("LDVM_MAX_TX_GAS") {
            config.fees.max_tx_gas = parse_env("LDVM_MAX_TX_GAS", &gas)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the fee schedule is coherent
    pub fn validate(&self) -> crate::Result<()> {
        let fees = &self.fees;
        if fees.min_gas_price == 0 || fees.max_gas_price < fees.min_gas_price {
            return Err(crate::Error::Config(format!(
                "invalid gas price range [{}, {}]",
                fees.min_gas_price, fees.max_gas_price
            )));
        }
        if fees.max_tx_gas == 0 {
            return Err(crate::Error::Config("max_tx_gas must be positive".to_string()));
        }
        if fees.min_token_pledge == 0 || fees.min_stake_pledge == 0 {
            return Err(crate::Error::Config("pledges must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_env(name: &str, value: &str) -> crate::Result<u64> {
    value
        .parse()
        .map_err(|e| crate::Error::Config(format!("invalid {}={:?}: {}", name, value, e)))
}
