//! Pool reserves and derived liquidity positions.

use ethereum_types::{H160, U256};
use serde::{Deserialize, Serialize};

/// Reserve state of one `token × ALT` pool, as last read from the contract.
///
/// `token_reserve * alt_reserve` is the constant-product invariant value at
/// rest between trades. `total_shares` is nonzero whenever both reserves are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReserves {
    pub token: H160,
    pub token_reserve: U256,
    pub alt_reserve: U256,
    pub total_shares: U256,
}

impl PoolReserves {
    /// A pool nobody has seeded yet. The first deposit sets the price.
    pub fn is_empty(&self) -> bool {
        self.total_shares.is_zero()
    }
}

/// One account's proportional claim on a pool. Derived on each refresh,
/// never stored: a position exists exactly while `user_shares > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub token: H160,
    pub user_shares: U256,
    pub total_shares: U256,
    pub token_reserve: U256,
    pub alt_reserve: U256,
    /// `floor(token_reserve * user_shares / total_shares)`, precomputed for display.
    pub token_amount: U256,
    /// `floor(alt_reserve * user_shares / total_shares)`, precomputed for display.
    pub alt_amount: U256,
}

impl LiquidityPosition {
    /// Pool ownership in basis points, floored.
    pub fn share_bps(&self) -> u32 {
        if self.total_shares.is_zero() {
            return 0;
        }
        let bps = self.user_shares.full_mul(U256::from(10_000u64))
            / ethereum_types::U512::from(self.total_shares);
        bps.low_u32()
    }
}
