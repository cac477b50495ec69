//! Constant-product share math with exact integer arithmetic.
//!
//! Deposits must preserve the resting price ratio of the pool, withdrawals
//! are proportional redemptions against the share ledger, and every result
//! floors — the pool keeps rounding dust, the user never mints it.

use ethereum_types::{U256, U512};
use thiserror::Error;
use types::PoolReserves;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MathError {
    #[error("amount must be positive")]
    ZeroAmount,

    #[error("pool has no liquidity")]
    EmptyPool,

    #[error("amount too small: computed value rounds to zero")]
    AmountTooSmall,

    #[error("deposit legs disagree on share delta: token side {token_side}, alt side {alt_side}")]
    InconsistentDeposit { token_side: U256, alt_side: U256 },

    #[error("arithmetic overflow")]
    Overflow,
}

/// Pool share math over `U256` base units.
pub struct PoolMath;

impl PoolMath {
    /// ALT amount that matches `token_in` at the pool's current price:
    /// `floor(token_in * alt_reserve / token_reserve)`.
    ///
    /// An empty pool has no price to preserve — the first depositor supplies
    /// the ALT leg directly, and this returns [`MathError::EmptyPool`].
    pub fn optimal_counterpart(
        reserves: &PoolReserves,
        token_in: U256,
    ) -> Result<U256, MathError> {
        if token_in.is_zero() {
            return Err(MathError::ZeroAmount);
        }
        if reserves.is_empty() || reserves.token_reserve.is_zero() {
            return Err(MathError::EmptyPool);
        }
        mul_div(token_in, reserves.alt_reserve, reserves.token_reserve)
    }

    /// Shares minted for depositing `(token_in, alt_in)`.
    ///
    /// First deposit into an empty pool seeds the ledger with the integer
    /// geometric mean `isqrt(token_in * alt_in)`, so the seed is nonzero
    /// exactly when both legs are. Subsequent deposits mint
    /// `floor(total_shares * token_in / token_reserve)`, cross-checked
    /// against the ALT-side computation: a difference beyond one unit of
    /// input rounding per leg means the deposit does not match the pool
    /// price and is rejected rather than submitted.
    pub fn share_delta(
        reserves: &PoolReserves,
        token_in: U256,
        alt_in: U256,
    ) -> Result<U256, MathError> {
        if token_in.is_zero() || alt_in.is_zero() {
            return Err(MathError::ZeroAmount);
        }
        if reserves.is_empty() {
            return Ok(isqrt(token_in.full_mul(alt_in)));
        }
        if reserves.token_reserve.is_zero() || reserves.alt_reserve.is_zero() {
            return Err(MathError::EmptyPool);
        }

        let token_side = mul_div(reserves.total_shares, token_in, reserves.token_reserve)?;
        let alt_side = mul_div(reserves.total_shares, alt_in, reserves.alt_reserve)?;

        // One base unit of rounding on either input leg moves the share
        // computation by at most total/reserve, plus the two floors.
        let tolerance = reserves.total_shares / reserves.token_reserve
            + reserves.total_shares / reserves.alt_reserve
            + U256::from(2u64);
        let diff = token_side.max(alt_side) - token_side.min(alt_side);
        if diff > tolerance {
            tracing::debug!(%token_side, %alt_side, %tolerance, "deposit legs off the pool price");
            return Err(MathError::InconsistentDeposit {
                token_side,
                alt_side,
            });
        }

        let shares = token_side.min(alt_side);
        if shares.is_zero() {
            return Err(MathError::AmountTooSmall);
        }
        Ok(shares)
    }

    /// Proportional redemption for burning `shares`:
    /// `floor(reserve * shares / total_shares)` on each side.
    ///
    /// Whether the caller actually owns `shares` is the contract's check,
    /// not this engine's. A redemption that floors to zero on either side
    /// is rejected — no zero-value transactions.
    pub fn withdraw_amounts(
        reserves: &PoolReserves,
        shares: U256,
    ) -> Result<(U256, U256), MathError> {
        if shares.is_zero() {
            return Err(MathError::ZeroAmount);
        }
        if reserves.is_empty() {
            return Err(MathError::EmptyPool);
        }
        let (token_amount, alt_amount) = Self::position_amounts(reserves, shares)?;
        if token_amount.is_zero() || alt_amount.is_zero() {
            return Err(MathError::AmountTooSmall);
        }
        Ok((token_amount, alt_amount))
    }

    /// Display twin of [`PoolMath::withdraw_amounts`]: the same proportional
    /// formula, but zero results are fine (a dust position renders as 0).
    pub fn position_amounts(
        reserves: &PoolReserves,
        shares: U256,
    ) -> Result<(U256, U256), MathError> {
        if reserves.is_empty() {
            return Ok((U256::zero(), U256::zero()));
        }
        let token_amount = mul_div(reserves.token_reserve, shares, reserves.total_shares)?;
        let alt_amount = mul_div(reserves.alt_reserve, shares, reserves.total_shares)?;
        Ok((token_amount, alt_amount))
    }
}

/// `floor(a * b / den)` with a 512-bit intermediate product.
fn mul_div(a: U256, b: U256, den: U256) -> Result<U256, MathError> {
    if den.is_zero() {
        return Err(MathError::EmptyPool);
    }
    let wide = a.full_mul(b) / U512::from(den);
    U256::try_from(wide).map_err(|_| MathError::Overflow)
}

/// Floor square root by Newton's method. The root of a 512-bit value always
/// fits in 256 bits.
fn isqrt(value: U512) -> U256 {
    if value.is_zero() {
        return U256::zero();
    }
    let mut x = value;
    let mut y = (x + U512::one()) >> 1;
    while y < x {
        x = y;
        y = (x + value / x) >> 1;
    }
    U256::try_from(x).unwrap_or_else(|_| U256::max_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::H160;
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;

    fn pool(token_reserve: u128, alt_reserve: u128, total_shares: u128) -> PoolReserves {
        PoolReserves {
            token: H160::zero(),
            token_reserve: U256::from(token_reserve),
            alt_reserve: U256::from(alt_reserve),
            total_shares: U256::from(total_shares),
        }
    }

    #[test]
    fn counterpart_preserves_price_ratio() {
        let reserves = pool(1000, 2000, 100);
        assert_eq!(
            PoolMath::optimal_counterpart(&reserves, U256::from(100u64)).unwrap(),
            U256::from(200u64)
        );
        // Flooring: 333 * 2000 / 1000 = 666
        assert_eq!(
            PoolMath::optimal_counterpart(&reserves, U256::from(333u64)).unwrap(),
            U256::from(666u64)
        );
    }

    #[test]
    fn counterpart_rejects_zero_and_empty() {
        let reserves = pool(1000, 2000, 100);
        assert_eq!(
            PoolMath::optimal_counterpart(&reserves, U256::zero()),
            Err(MathError::ZeroAmount)
        );
        assert_eq!(
            PoolMath::optimal_counterpart(&pool(0, 0, 0), U256::from(10u64)),
            Err(MathError::EmptyPool)
        );
    }

    #[test]
    fn first_deposit_seeds_geometric_mean() {
        let four = U256::from(4_000_000_000_000_000_000u128);
        let nine = U256::from(9_000_000_000_000_000_000u128);
        let seed = PoolMath::share_delta(&pool(0, 0, 0), four, nine).unwrap();
        assert_eq!(seed, U256::from(6_000_000_000_000_000_000u128));
    }

    #[test]
    fn subsequent_deposit_mints_proportionally() {
        let reserves = pool(1000, 2000, 100);
        let shares =
            PoolMath::share_delta(&reserves, U256::from(100u64), U256::from(200u64)).unwrap();
        assert_eq!(shares, U256::from(10u64));
    }

    #[test]
    fn mismatched_deposit_legs_are_rejected() {
        let reserves = pool(
            1_000_000_000_000_000_000_000,
            2_000_000_000_000_000_000_000,
            1_414_000_000_000_000_000_000,
        );
        // ALT leg priced at half the pool ratio.
        let err = PoolMath::share_delta(
            &reserves,
            U256::from(100_000_000_000_000_000_000u128),
            U256::from(100_000_000_000_000_000_000u128),
        )
        .unwrap_err();
        assert!(matches!(err, MathError::InconsistentDeposit { .. }));
    }

    #[test]
    fn dust_deposit_is_rejected_not_zeroed() {
        let reserves = pool(
            1_000_000_000_000_000_000_000,
            2_000_000_000_000_000_000_000,
            1_000,
        );
        // One wei of each leg floors to zero shares.
        assert_eq!(
            PoolMath::share_delta(&reserves, U256::from(1u64), U256::from(2u64)),
            Err(MathError::AmountTooSmall)
        );
    }

    #[test]
    fn withdraw_matches_worked_example() {
        let reserves = pool(1000, 2000, 100);
        let (token_amount, alt_amount) =
            PoolMath::withdraw_amounts(&reserves, U256::from(10u64)).unwrap();
        assert_eq!(token_amount, U256::from(100u64));
        assert_eq!(alt_amount, U256::from(200u64));
    }

    #[test]
    fn withdraw_rejects_dust_and_zero() {
        assert_eq!(
            PoolMath::withdraw_amounts(&pool(5, 7, 1000), U256::from(10u64)),
            Err(MathError::AmountTooSmall)
        );
        assert_eq!(
            PoolMath::withdraw_amounts(&pool(1000, 2000, 100), U256::zero()),
            Err(MathError::ZeroAmount)
        );
        assert_eq!(
            PoolMath::withdraw_amounts(&pool(0, 0, 0), U256::from(1u64)),
            Err(MathError::EmptyPool)
        );
    }

    #[test]
    fn position_amounts_allow_dust() {
        let reserves = pool(5, 7, 1000);
        assert_eq!(
            PoolMath::position_amounts(&reserves, U256::from(10u64)).unwrap(),
            (U256::zero(), U256::zero())
        );
    }

    #[test]
    fn isqrt_floors() {
        assert_eq!(isqrt(U512::zero()), U256::zero());
        assert_eq!(isqrt(U512::from(1u64)), U256::from(1u64));
        assert_eq!(isqrt(U512::from(36u64)), U256::from(6u64));
        assert_eq!(isqrt(U512::from(35u64)), U256::from(5u64));
        assert_eq!(isqrt(U512::from(37u64)), U256::from(6u64));
        let big = U256::from(u128::MAX);
        assert_eq!(isqrt(big.full_mul(big)), big);
    }

    proptest! {
        #[test]
        fn counterpart_is_monotonic(
            token_reserve in 1u128..=u128::MAX >> 1,
            alt_reserve in 1u128..=u128::MAX >> 1,
            token_in in 1u128..=u128::MAX >> 1,
            bump in 0u128..=1_000_000u128,
        ) {
            let reserves = pool(token_reserve, alt_reserve, 1);
            let small = PoolMath::optimal_counterpart(&reserves, U256::from(token_in)).unwrap();
            let large =
                PoolMath::optimal_counterpart(&reserves, U256::from(token_in) + U256::from(bump))
                    .unwrap();
            prop_assert!(small <= large);
        }

        #[test]
        fn deposit_withdraw_round_trip_never_fabricates_value(
            token_reserve in 1_000u128..=1u128 << 100,
            alt_reserve in 1_000u128..=1u128 << 100,
            total_shares in 1_000u128..=1u128 << 100,
            token_in in 1u128..=1u128 << 90,
        ) {
            let reserves = pool(token_reserve, alt_reserve, total_shares);
            let token_in = U256::from(token_in);
            let alt_in = PoolMath::optimal_counterpart(&reserves, token_in).unwrap();
            prop_assume!(!alt_in.is_zero());
            let shares = match PoolMath::share_delta(&reserves, token_in, alt_in) {
                Ok(shares) => shares,
                Err(MathError::AmountTooSmall) => return Ok(()),
                Err(other) => return Err(TestCaseError::fail(other.to_string())),
            };

            let after = PoolReserves {
                token: reserves.token,
                token_reserve: reserves.token_reserve + token_in,
                alt_reserve: reserves.alt_reserve + alt_in,
                total_shares: reserves.total_shares + shares,
            };
            let (token_out, alt_out) = match PoolMath::withdraw_amounts(&after, shares) {
                Ok(amounts) => amounts,
                Err(MathError::AmountTooSmall) => return Ok(()),
                Err(other) => return Err(TestCaseError::fail(other.to_string())),
            };
            prop_assert!(token_out <= token_in);
            prop_assert!(alt_out <= alt_in);
        }
    }
}
