//! Shared data model for the altswap client engine
//!
//! Every other crate in the workspace consumes these types. They mirror the
//! on-chain records (pool reserves, shares, escrows, token balances) but are
//! purely derived views: nothing here is authoritative state, and nothing
//! here performs I/O.
//!
//! All conservation-sensitive quantities (reserves, shares, escrow amounts)
//! are `U256` base units. Human-decimal strings exist only at the
//! presentation boundary, produced and parsed by [`units`].

pub mod address;
pub mod escrow;
pub mod pool;
pub mod token;
pub mod units;

pub use address::{parse_address, same_address, AddressError};
pub use escrow::Escrow;
pub use pool::{LiquidityPosition, PoolReserves};
pub use token::{Balance, Token};
pub use units::{ALT_DECIMALS, UnitError};

// Re-export the chain primitives so downstream crates agree on one set.
pub use ethereum_types::{H160, U256, U512};
