//! Token identity and balance snapshots.

use ethereum_types::{H160, U256};
use serde::{Deserialize, Serialize};

/// A token listed on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: H160,
    pub symbol: String,
    pub decimals: u8,
}

/// One account's holding of one token.
///
/// Snapshots are recomputed wholesale on every fetch and never patched
/// incrementally, so a missed transfer event cannot leave the view drifted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub symbol: String,
    pub address: H160,
    /// Human-decimal rendering of `raw_balance`; display only.
    pub balance: String,
    pub raw_balance: U256,
}
