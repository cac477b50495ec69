//! Cross-chain escrow records.

use ethereum_types::{H160, U256};
use serde::{Deserialize, Serialize};

/// A time-locked escrow as reported by the contract.
///
/// The record is created externally when a cross-chain swap locks funds, and
/// `active` flips to false externally — either the counterpart leg completes
/// or the owner claims after `timeout_ms`. The client never mutates these
/// fields; it only re-reads them and derives an advisory status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: U256,
    pub user: H160,
    pub alt_amount: U256,
    /// Unix timestamp in milliseconds after which the lock can be reclaimed.
    pub timeout_ms: u64,
    pub active: bool,
}

impl Escrow {
    /// True once the timeout has elapsed. Advisory only: whether funds can
    /// actually move is decided by the contract at claim time.
    pub fn timed_out(&self, now_ms: u64) -> bool {
        now_ms >= self.timeout_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_boundary_is_inclusive() {
        let escrow = Escrow {
            id: U256::from(1u64),
            user: H160::zero(),
            alt_amount: U256::from(10u64),
            timeout_ms: 1_000,
            active: true,
        };
        assert!(!escrow.timed_out(999));
        assert!(escrow.timed_out(1_000));
        assert!(escrow.timed_out(1_001));
    }

    #[test]
    fn serde_round_trip() {
        let escrow = Escrow {
            id: U256::from(7u64),
            user: H160::repeat_byte(0x42),
            alt_amount: U256::from(1_000_000u64),
            timeout_ms: 1_700_000_000_000,
            active: false,
        };
        let json = serde_json::to_string(&escrow).unwrap();
        let back: Escrow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, escrow);
    }
}
