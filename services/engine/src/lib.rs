//! Client-side liquidity & escrow accounting engine.
//!
//! This crate is the one stateful piece of the altswap client: it derives
//! pool positions, balances and escrow status from the contracts, keeps
//! that view converged through bounded reconciliation polling, and fronts
//! the mutating actions (deposit, withdraw, claim, chain switch) with
//! synchronous validation and in-flight guards.
//!
//! Nothing here is authoritative. The contracts own every balance, share
//! and escrow; this engine re-reads and re-derives, and the worst failure
//! mode anywhere in it is a visible warning over an unchanged view.
//!
//! ## Structure
//!
//! - [`rpc`] — the [`rpc::SwapContract`] trait and its web3 implementation
//! - [`reconcile`] — the bounded polling policy and cycle owner
//! - [`escrow`] — escrow status derivation and the per-account book
//! - [`view`] — epoch-guarded per-chain derived state
//! - [`engine`] — the [`engine::SwapEngine`] facade the UI talks to
//! - [`wallet`] — wallet network-switch plumbing
//! - [`prefs`] — the JSON key/value preference store

pub mod engine;
pub mod error;
pub mod escrow;
pub mod prefs;
pub mod reconcile;
pub mod rpc;
pub mod view;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::{ContractFactory, SwapEngine, Web3ContractFactory};
pub use error::EngineError;
pub use escrow::{escrow_status, EscrowBook, EscrowStatus, EscrowView};
pub use prefs::{PreferenceStore, PREF_ACTIVE_CHAIN};
pub use reconcile::{FnRefresh, ReconcilePolicy, Reconciler, Refresh};
pub use rpc::{RpcError, SwapContract, Web3SwapContract};
pub use view::{ChainView, SharedView, StatsSnapshot};
pub use wallet::{add_chain_params, ensure_network, AddChainParams, WalletBridge, WalletError};

/// Milliseconds since the Unix epoch, the clock escrow timeouts live on.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
