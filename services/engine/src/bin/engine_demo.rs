//! One-shot engine demo: connect to the active chain, load every snapshot
//! once, and print the derived view. Useful for poking at a live RPC
//! endpoint without a UI in front of the engine.

use async_trait::async_trait;
use config::EngineSettings;
use std::path::Path;
use std::sync::Arc;
use swap_engine::{
    AddChainParams, PreferenceStore, SwapEngine, WalletBridge, WalletError, Web3ContractFactory,
};
use tracing::{info, warn};
use types::{parse_address, H160};

/// Headless stand-in for a wallet: accepts every switch, since there is no
/// user to ask.
struct AutoApproveWallet;

#[async_trait]
impl WalletBridge for AutoApproveWallet {
    async fn switch_network(&self, chain_id: &str) -> Result<(), WalletError> {
        info!(chain_id, "wallet switch approved");
        Ok(())
    }

    async fn register_network(&self, params: &AddChainParams) -> Result<(), WalletError> {
        info!(chain = %params.chain_name, "network registered with wallet");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,swap_engine=debug".into()),
        )
        .init();

    let account = std::env::args()
        .nth(1)
        .map(|raw| parse_address(&raw))
        .transpose()?
        .unwrap_or_else(H160::zero);

    let settings = match std::env::var("ALTSWAP_SETTINGS") {
        Ok(path) => config::load_settings(Path::new(&path))?,
        Err(_) => EngineSettings::default(),
    };

    let factory = Arc::new(Web3ContractFactory {
        account,
        settings: settings.clone(),
    });
    let prefs = PreferenceStore::open("altswap-prefs.json");
    let engine = SwapEngine::new(factory, Arc::new(AutoApproveWallet), account, settings, prefs)?;

    info!(chain = engine.active_chain().name, %account, "loading snapshots");
    if let Err(error) = engine.refresh_once().await {
        warn!(%error, "initial load failed; printing whatever arrived");
    }

    for balance in engine.balances() {
        info!(symbol = %balance.symbol, balance = %balance.balance, "balance");
    }
    for position in engine.positions() {
        info!(
            token = %position.token,
            share_bps = position.share_bps(),
            "liquidity position"
        );
    }
    for view in engine.escrows() {
        info!(id = %view.escrow.id, status = ?view.status, "escrow");
    }
    info!(total_active_alt = %engine.total_active_alt(), stats = ?engine.stats(), "done");

    Ok(())
}
