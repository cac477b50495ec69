//! Pool share mathematics for `token × ALT` liquidity pools.
//!
//! Pure and deterministic: no I/O, no clock, no floating point. Every
//! quantity is a `U256` in base units; intermediate products widen to
//! `U512` so the usual `a * b / c` shape cannot overflow. Decimal strings
//! are somebody else's problem (the `types::units` presentation boundary).

mod pool_math;

pub use pool_math::{MathError, PoolMath};
