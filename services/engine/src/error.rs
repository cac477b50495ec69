//! Error taxonomy of the engine surface.
//!
//! Validation and consistency failures are recoverable locally (the user
//! corrects the input); external failures are transient and retryable by
//! re-invocation — nothing here is fatal and no error leaves the view in a
//! partial state.

use crate::escrow::EscrowStatus;
use crate::rpc::RpcError;
use crate::wallet::WalletError;
use amm::MathError;
use thiserror::Error;
use types::{UnitError, H160, U256};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The previous request for this action has not resolved yet; the
    /// triggering control stays disabled until it does.
    #[error("a {0} request is already in flight")]
    Busy(&'static str),

    #[error("token {0} is not listed on the active chain")]
    UnknownToken(H160),

    #[error("unknown chain id {0}")]
    UnknownChain(String),

    #[error("escrow {0} is not in the current view")]
    UnknownEscrow(U256),

    /// Claiming is gated locally on the derived status; the contract check
    /// remains authoritative, but a request we know will fail is never sent.
    #[error("escrow {id} is not claimable (status {status:?})")]
    NotClaimable { id: U256, status: EscrowStatus },

    #[error(transparent)]
    InvalidAmount(#[from] UnitError),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    External(#[from] RpcError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
