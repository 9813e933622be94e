//! Block context

use account_core::Address;
use serde::{Deserialize, Serialize};

/// Block-level inputs to transaction processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Block height
    pub height: u64,
    /// Block timestamp in seconds, "now" for every time-based rule
    pub timestamp: u64,
    /// Block builder, receives tips
    pub miner: Address,
    /// Base gas price of the block
    pub gas_price: u64,
    /// Chain id
    pub chain_id: u64,
}
