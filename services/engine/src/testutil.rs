//! In-memory doubles for engine tests.

use crate::engine::ContractFactory;
use crate::rpc::{RpcError, SwapContract};
use crate::wallet::{AddChainParams, WalletBridge, WalletError};
use async_trait::async_trait;
use config::Chain;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use types::{Escrow, PoolReserves, H160, U256};

#[derive(Default)]
pub(crate) struct MockState {
    pub reserves: HashMap<H160, PoolReserves>,
    pub shares: HashMap<H160, U256>,
    pub escrows: Vec<Escrow>,
    pub balances: HashMap<H160, (U256, u8)>,
    pub symbols: HashMap<H160, String>,
}

/// Scriptable [`SwapContract`]. The optional gates park a call mid-flight
/// until the test releases it, with the paired `*_entered` notify telling
/// the test the call has arrived.
pub(crate) struct MockContract {
    pub state: Mutex<MockState>,
    pub add_calls: AtomicU64,
    pub remove_calls: AtomicU64,
    pub claim_calls: AtomicU64,
    pub add_gate: Mutex<Option<Arc<Notify>>>,
    pub add_entered: Arc<Notify>,
    pub escrow_gate: Mutex<Option<Arc<Notify>>>,
    pub escrow_entered: Arc<Notify>,
}

impl Default for MockContract {
    fn default() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            add_calls: AtomicU64::new(0),
            remove_calls: AtomicU64::new(0),
            claim_calls: AtomicU64::new(0),
            add_gate: Mutex::new(None),
            add_entered: Arc::new(Notify::new()),
            escrow_gate: Mutex::new(None),
            escrow_entered: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl SwapContract for MockContract {
    async fn pool_reserves(&self, token: H160) -> Result<PoolReserves, RpcError> {
        Ok(self
            .state
            .lock()
            .reserves
            .get(&token)
            .cloned()
            .unwrap_or(PoolReserves {
                token,
                token_reserve: U256::zero(),
                alt_reserve: U256::zero(),
                total_shares: U256::zero(),
            }))
    }

    async fn user_shares(&self, token: H160, _account: H160) -> Result<U256, RpcError> {
        Ok(self
            .state
            .lock()
            .shares
            .get(&token)
            .copied()
            .unwrap_or_default())
    }

    async fn add_liquidity(
        &self,
        _token: H160,
        _token_amount: U256,
        _alt_amount: U256,
    ) -> Result<bool, RpcError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.add_entered.notify_one();
        let gate = self.add_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(true)
    }

    async fn remove_liquidity(&self, _token: H160, _shares: U256) -> Result<bool, RpcError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn user_escrows(&self, _account: H160) -> Result<Vec<Escrow>, RpcError> {
        self.escrow_entered.notify_one();
        let gate = self.escrow_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.state.lock().escrows.clone())
    }

    async fn claim_timed_out_escrow(&self, _id: U256) -> Result<bool, RpcError> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn token_balance(&self, _account: H160, token: H160) -> Result<(U256, u8), RpcError> {
        Ok(self
            .state
            .lock()
            .balances
            .get(&token)
            .copied()
            .unwrap_or((U256::zero(), 18)))
    }

    async fn token_symbol(&self, token: H160) -> Result<String, RpcError> {
        self.state
            .lock()
            .symbols
            .get(&token)
            .cloned()
            .ok_or_else(|| RpcError::BadResponse("no symbol".to_string()))
    }
}

pub(crate) struct MockFactory {
    contracts: Mutex<HashMap<u64, Arc<MockContract>>>,
}

impl MockFactory {
    pub fn new(entries: Vec<(u64, Arc<MockContract>)>) -> Arc<Self> {
        Arc::new(Self {
            contracts: Mutex::new(entries.into_iter().collect()),
        })
    }
}

impl ContractFactory for MockFactory {
    fn connect(&self, chain: &'static Chain) -> anyhow::Result<Arc<dyn SwapContract>> {
        self.contracts
            .lock()
            .get(&chain.decimal_id)
            .cloned()
            .map(|contract| contract as Arc<dyn SwapContract>)
            .ok_or_else(|| anyhow::anyhow!("no mock contract for chain {}", chain.decimal_id))
    }
}

/// Wallet that knows a fixed set of networks and learns registered ones.
pub(crate) struct MockWallet {
    known: Mutex<HashSet<String>>,
    pub switches: AtomicU64,
    pub registrations: AtomicU64,
}

impl MockWallet {
    pub fn knowing<I>(ids: I) -> Arc<Self>
    where
        I: IntoIterator<Item = &'static str>,
    {
        Arc::new(Self {
            known: Mutex::new(ids.into_iter().map(str::to_string).collect()),
            switches: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl WalletBridge for MockWallet {
    async fn switch_network(&self, chain_id: &str) -> Result<(), WalletError> {
        self.switches.fetch_add(1, Ordering::SeqCst);
        if self.known.lock().contains(chain_id) {
            Ok(())
        } else {
            Err(WalletError::UnknownNetwork(chain_id.to_string()))
        }
    }

    async fn register_network(&self, params: &AddChainParams) -> Result<(), WalletError> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        self.known.lock().insert(params.chain_id.clone());
        Ok(())
    }
}
