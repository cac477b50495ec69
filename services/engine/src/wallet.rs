//! Wallet network control.
//!
//! The engine never signs anything; it only asks the user's wallet to point
//! at the right network. When the wallet does not know the chain, the full
//! registration parameters come from the chain registry — the wallet
//! dialog is the UI's problem, the parameters are ours.

use async_trait::async_trait;
use config::Chain;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("user rejected the wallet request")]
    Rejected,

    #[error("network {0} is not registered with the wallet")]
    UnknownNetwork(String),

    #[error("wallet bridge failure: {0}")]
    Bridge(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// `wallet_addEthereumChain` registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    pub block_explorer_urls: Vec<String>,
}

/// Full registration parameters for `chain`, straight from the registry.
pub fn add_chain_params(chain: &Chain) -> AddChainParams {
    AddChainParams {
        chain_id: chain.id.to_string(),
        chain_name: chain.name.to_string(),
        rpc_urls: vec![chain.rpc_url.to_string()],
        native_currency: NativeCurrency {
            name: chain.native_symbol.to_string(),
            symbol: chain.native_symbol.to_string(),
            decimals: 18,
        },
        block_explorer_urls: vec![chain.block_explorer_url.to_string()],
    }
}

/// The wallet's network-control surface.
#[async_trait]
pub trait WalletBridge: Send + Sync {
    /// Ask the wallet to activate the network with this hex chain id.
    async fn switch_network(&self, chain_id: &str) -> Result<(), WalletError>;

    /// Register a network the wallet does not know yet.
    async fn register_network(&self, params: &AddChainParams) -> Result<(), WalletError>;
}

/// Switch to `chain`, registering it first if the wallet has never seen it.
pub async fn ensure_network(bridge: &dyn WalletBridge, chain: &Chain) -> Result<(), WalletError> {
    match bridge.switch_network(chain.id).await {
        Err(WalletError::UnknownNetwork(_)) => {
            info!(chain = chain.name, id = chain.id, "registering network with wallet");
            bridge.register_network(&add_chain_params(chain)).await?;
            bridge.switch_network(chain.id).await
        }
        other => other,
    }
}
