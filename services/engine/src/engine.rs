//! The swap engine facade.
//!
//! Owns the derived state for the active chain and exposes the two halves
//! of the product surface:
//!
//! - **snapshots out** — read-only views of pools, positions, balances and
//!   escrows, cheap to clone and safe to render;
//! - **actions in** — `add_liquidity`, `remove_liquidity`, `claim_escrow`,
//!   `switch_chain`, each returning a success boolean with diagnostics left
//!   to structured logging.
//!
//! Every action validates synchronously before anything touches the
//! network, holds a per-action in-flight guard so a double-click cannot
//! double-submit, and on success triggers bounded reconciliation polling to
//! converge the local view with the contract.

use crate::error::EngineError;
use crate::escrow::{escrow_status, EscrowStatus, EscrowView};
use crate::now_ms;
use crate::prefs::{PreferenceStore, PREF_ACTIVE_CHAIN};
use crate::reconcile::{ReconcilePolicy, Reconciler, Refresh};
use crate::rpc::SwapContract;
use crate::view::{SharedView, StatsSnapshot};
use crate::wallet::{ensure_network, WalletBridge};
use amm::{MathError, PoolMath};
use async_trait::async_trait;
use config::{chain_by_id, default_chain, validate_registry, Chain, EngineSettings};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::units::{self, ALT_DECIMALS};
use types::{parse_address, Balance, LiquidityPosition, PoolReserves, Token, H160, U256};

/// Builds a [`SwapContract`] for a chain. The engine reconnects through
/// this on every chain switch, so per-chain transports never outlive their
/// chain context.
pub trait ContractFactory: Send + Sync {
    fn connect(&self, chain: &'static Chain) -> anyhow::Result<Arc<dyn SwapContract>>;
}

/// Production factory: one [`crate::rpc::Web3SwapContract`] per chain.
pub struct Web3ContractFactory {
    pub account: H160,
    pub settings: EngineSettings,
}

impl ContractFactory for Web3ContractFactory {
    fn connect(&self, chain: &'static Chain) -> anyhow::Result<Arc<dyn SwapContract>> {
        let contract = crate::rpc::Web3SwapContract::connect(chain, self.account, &self.settings)?;
        Ok(Arc::new(contract))
    }
}

#[derive(Default)]
struct ActionFlags {
    add_liquidity: AtomicBool,
    remove_liquidity: AtomicBool,
    claim_escrow: AtomicBool,
    switch_chain: AtomicBool,
}

/// Released on drop, so early returns and failures re-enable the action.
struct ActionGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ActionGuard<'a> {
    fn acquire(flag: &'a AtomicBool, action: &'static str) -> Result<Self, EngineError> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EngineError::Busy(action));
        }
        Ok(Self { flag })
    }
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

struct ResourceReconcilers {
    positions: Reconciler,
    escrows: Reconciler,
    balances: Reconciler,
}

/// The engine. Created at application start, torn down at exit; dropping it
/// cancels every polling cycle it owns.
pub struct SwapEngine {
    settings: EngineSettings,
    factory: Arc<dyn ContractFactory>,
    wallet: Arc<dyn WalletBridge>,
    account: H160,
    prefs: PreferenceStore,
    shared: SharedView,
    chain: RwLock<&'static Chain>,
    contract: RwLock<Arc<dyn SwapContract>>,
    /// `(chain, token) → symbol`, filled lazily from ERC-20 reads.
    symbols: Arc<DashMap<(u64, H160), String>>,
    reconcilers: Mutex<Option<ResourceReconcilers>>,
    busy: ActionFlags,
}

impl SwapEngine {
    pub fn new(
        factory: Arc<dyn ContractFactory>,
        wallet: Arc<dyn WalletBridge>,
        account: H160,
        settings: EngineSettings,
        prefs: PreferenceStore,
    ) -> anyhow::Result<Self> {
        validate_registry()?;

        let chain = prefs
            .get(PREF_ACTIVE_CHAIN)
            .and_then(|id| chain_by_id(&id))
            .unwrap_or_else(default_chain);
        let contract = factory.connect(chain)?;
        let shared = SharedView::new(chain.decimal_id);

        let engine = Self {
            settings,
            factory,
            wallet,
            account,
            prefs,
            shared,
            chain: RwLock::new(chain),
            contract: RwLock::new(contract),
            symbols: Arc::new(DashMap::new()),
            reconcilers: Mutex::new(None),
            busy: ActionFlags::default(),
        };
        engine.install_reconcilers();
        info!(chain = chain.name, account = %account, "swap engine initialized");
        Ok(engine)
    }

    // ---- snapshots ---------------------------------------------------

    pub fn active_chain(&self) -> &'static Chain {
        *self.chain.read()
    }

    pub fn pool_reserves(&self, token: H160) -> Option<PoolReserves> {
        self.shared.read(|view| view.pool(token).cloned())
    }

    pub fn positions(&self) -> Vec<LiquidityPosition> {
        self.shared.read(|view| view.positions().to_vec())
    }

    pub fn balances(&self) -> Vec<Balance> {
        self.shared.read(|view| view.balances().to_vec())
    }

    /// Escrows in display order with their status as of now.
    pub fn escrows(&self) -> Vec<EscrowView> {
        let now = now_ms();
        self.shared.read(|view| view.escrows().sorted_views(now))
    }

    pub fn total_active_alt(&self) -> U256 {
        self.shared.read(|view| view.escrows().total_active_alt())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats()
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.prefs
    }

    // ---- refresh -----------------------------------------------------

    /// Kick off a reconciliation cycle on every resource.
    pub fn refresh_all(&self) {
        if let Some(reconcilers) = self.reconcilers.lock().as_ref() {
            reconcilers.positions.trigger();
            reconcilers.escrows.trigger();
            reconcilers.balances.trigger();
        }
    }

    /// One synchronous pass over every resource — the initial load path.
    pub async fn refresh_once(&self) -> anyhow::Result<()> {
        let chain = *self.chain.read();
        let contract = self.contract.read().clone();
        let epoch = self.shared.current_epoch();
        refresh_positions(contract.as_ref(), chain, self.account, &self.shared, epoch).await?;
        refresh_escrows(contract.as_ref(), self.account, &self.shared, epoch).await?;
        refresh_balances(
            contract.as_ref(),
            chain,
            self.account,
            &self.shared,
            epoch,
            &self.symbols,
        )
        .await?;
        Ok(())
    }

    fn install_reconcilers(&self) {
        let chain = *self.chain.read();
        let contract = self.contract.read().clone();
        let epoch = self.shared.current_epoch();
        let policy = ReconcilePolicy {
            interval: self.settings.poll_interval(),
            max_duration: self.settings.poll_window(),
        };

        let positions = Reconciler::new(
            "positions",
            policy,
            Arc::new(PositionsRefresh {
                contract: Arc::clone(&contract),
                chain,
                account: self.account,
                shared: self.shared.clone(),
                epoch,
            }),
        );
        let escrows = Reconciler::new(
            "escrows",
            policy,
            Arc::new(EscrowsRefresh {
                contract: Arc::clone(&contract),
                account: self.account,
                shared: self.shared.clone(),
                epoch,
            }),
        );
        let balances = Reconciler::new(
            "balances",
            policy,
            Arc::new(BalancesRefresh {
                contract,
                chain,
                account: self.account,
                shared: self.shared.clone(),
                epoch,
                symbols: Arc::clone(&self.symbols),
            }),
        );

        *self.reconcilers.lock() = Some(ResourceReconcilers {
            positions,
            escrows,
            balances,
        });
    }

    fn reconcile_positions_and_balances(&self) {
        if let Some(reconcilers) = self.reconcilers.lock().as_ref() {
            reconcilers.positions.trigger();
            reconcilers.balances.trigger();
        }
    }

    fn reconcile_escrows_and_balances(&self) {
        if let Some(reconcilers) = self.reconcilers.lock().as_ref() {
            reconcilers.escrows.trigger();
            reconcilers.balances.trigger();
        }
    }

    // ---- actions -----------------------------------------------------

    /// Deposit both legs into the `token × ALT` pool. Amounts are
    /// human-decimal strings; everything is validated locally before the
    /// contract sees the request.
    pub async fn add_liquidity(&self, token: H160, token_amount: &str, alt_amount: &str) -> bool {
        let result = self.try_add_liquidity(token, token_amount, alt_amount).await;
        self.report("add_liquidity", result)
    }

    /// Burn `shares` (a decimal string in share units) for a proportional
    /// withdrawal of both legs.
    pub async fn remove_liquidity(&self, token: H160, shares: &str) -> bool {
        let result = self.try_remove_liquidity(token, shares).await;
        self.report("remove_liquidity", result)
    }

    /// Reclaim a timed-out escrow. Rejected locally unless the record is
    /// currently `ActiveClaimable`; the contract remains the authoritative
    /// gate for the funds themselves.
    pub async fn claim_escrow(&self, id: U256) -> bool {
        let result = self.try_claim_escrow(id).await;
        self.report("claim_escrow", result)
    }

    /// Make `chain_id` (hex form) the active chain: point the wallet at it,
    /// drop every view and polling cycle of the old chain, and re-fetch
    /// from scratch.
    pub async fn switch_chain(&self, chain_id: &str) -> bool {
        let result = self.try_switch_chain(chain_id).await;
        self.report("switch_chain", result)
    }

    fn report(&self, action: &'static str, result: Result<bool, EngineError>) -> bool {
        match result {
            Ok(accepted) => accepted,
            Err(error) => {
                self.shared.counters().note_rejected_action();
                warn!(action, %error, "action not completed");
                false
            }
        }
    }

    async fn try_add_liquidity(
        &self,
        token: H160,
        token_amount: &str,
        alt_amount: &str,
    ) -> Result<bool, EngineError> {
        let _guard = ActionGuard::acquire(&self.busy.add_liquidity, "add_liquidity")?;

        let listing = self.listed_token(token)?;
        let token_in = units::to_base_units(token_amount, listing.decimals)?;
        let alt_in = units::to_base_units(alt_amount, ALT_DECIMALS)?;
        if token_in.is_zero() || alt_in.is_zero() {
            return Err(MathError::ZeroAmount.into());
        }

        let contract = self.contract.read().clone();
        let reserves = contract.pool_reserves(token).await?;
        // Rejects mismatched legs and dust before anything is submitted.
        let shares = PoolMath::share_delta(&reserves, token_in, alt_in)?;
        debug!(%token, %token_in, %alt_in, %shares, "submitting liquidity deposit");

        let accepted = contract.add_liquidity(token, token_in, alt_in).await?;
        if accepted {
            self.reconcile_positions_and_balances();
        } else {
            warn!(%token, "contract declined the deposit");
        }
        Ok(accepted)
    }

    async fn try_remove_liquidity(&self, token: H160, shares: &str) -> Result<bool, EngineError> {
        let _guard = ActionGuard::acquire(&self.busy.remove_liquidity, "remove_liquidity")?;

        self.listed_token(token)?;
        let shares = units::to_base_units(shares, ALT_DECIMALS)?;
        if shares.is_zero() {
            return Err(MathError::ZeroAmount.into());
        }

        let contract = self.contract.read().clone();
        let reserves = contract.pool_reserves(token).await?;
        let (token_out, alt_out) = PoolMath::withdraw_amounts(&reserves, shares)?;
        debug!(%token, %shares, %token_out, %alt_out, "submitting liquidity withdrawal");

        let accepted = contract.remove_liquidity(token, shares).await?;
        if accepted {
            self.reconcile_positions_and_balances();
        } else {
            warn!(%token, "contract declined the withdrawal");
        }
        Ok(accepted)
    }

    async fn try_claim_escrow(&self, id: U256) -> Result<bool, EngineError> {
        let _guard = ActionGuard::acquire(&self.busy.claim_escrow, "claim_escrow")?;

        let now = now_ms();
        let status = self
            .shared
            .read(|view| view.escrows().get(id).map(|e| escrow_status(e, now)));
        match status {
            None => return Err(EngineError::UnknownEscrow(id)),
            Some(EscrowStatus::ActiveClaimable) => {}
            Some(status) => return Err(EngineError::NotClaimable { id, status }),
        }

        let contract = self.contract.read().clone();
        let accepted = contract.claim_timed_out_escrow(id).await?;
        if accepted {
            self.reconcile_escrows_and_balances();
        } else {
            warn!(%id, "contract declined the claim");
        }
        Ok(accepted)
    }

    async fn try_switch_chain(&self, chain_id: &str) -> Result<bool, EngineError> {
        let _guard = ActionGuard::acquire(&self.busy.switch_chain, "switch_chain")?;

        let chain =
            chain_by_id(chain_id).ok_or_else(|| EngineError::UnknownChain(chain_id.to_string()))?;
        if chain.decimal_id == self.active_chain().decimal_id {
            return Ok(true);
        }

        ensure_network(self.wallet.as_ref(), chain).await?;

        // Old-chain cycles die before the view is cleared, and the epoch
        // bump strands any refresh still in flight.
        *self.reconcilers.lock() = None;
        self.shared.reset(chain.decimal_id);
        *self.chain.write() = chain;
        let contract = self.factory.connect(chain)?;
        *self.contract.write() = contract;

        if let Err(error) = self.prefs.set(PREF_ACTIVE_CHAIN, chain.id) {
            warn!(%error, "failed to persist chain preference");
        }

        self.install_reconcilers();
        self.refresh_all();
        info!(chain = chain.name, "active chain switched");
        Ok(true)
    }

    fn listed_token(&self, token: H160) -> Result<Token, EngineError> {
        let chain = *self.chain.read();
        for listing in chain.tokens {
            let listed = parse_address(listing.address)
                .map(|address| address == token)
                .unwrap_or(false);
            if listed {
                return Ok(Token {
                    address: token,
                    symbol: listing.symbol.to_string(),
                    decimals: listing.decimals,
                });
            }
        }
        Err(EngineError::UnknownToken(token))
    }
}

// ---- refresh functions -----------------------------------------------

struct PositionsRefresh {
    contract: Arc<dyn SwapContract>,
    chain: &'static Chain,
    account: H160,
    shared: SharedView,
    epoch: u64,
}

#[async_trait]
impl Refresh for PositionsRefresh {
    async fn refresh(&self) -> anyhow::Result<()> {
        let result = refresh_positions(
            self.contract.as_ref(),
            self.chain,
            self.account,
            &self.shared,
            self.epoch,
        )
        .await;
        if result.is_err() {
            self.shared.counters().note_refresh_failure();
        }
        result
    }
}

struct EscrowsRefresh {
    contract: Arc<dyn SwapContract>,
    account: H160,
    shared: SharedView,
    epoch: u64,
}

#[async_trait]
impl Refresh for EscrowsRefresh {
    async fn refresh(&self) -> anyhow::Result<()> {
        let result =
            refresh_escrows(self.contract.as_ref(), self.account, &self.shared, self.epoch).await;
        if result.is_err() {
            self.shared.counters().note_refresh_failure();
        }
        result
    }
}

struct BalancesRefresh {
    contract: Arc<dyn SwapContract>,
    chain: &'static Chain,
    account: H160,
    shared: SharedView,
    epoch: u64,
    symbols: Arc<DashMap<(u64, H160), String>>,
}

#[async_trait]
impl Refresh for BalancesRefresh {
    async fn refresh(&self) -> anyhow::Result<()> {
        let result = refresh_balances(
            self.contract.as_ref(),
            self.chain,
            self.account,
            &self.shared,
            self.epoch,
            &self.symbols,
        )
        .await;
        if result.is_err() {
            self.shared.counters().note_refresh_failure();
        }
        result
    }
}

/// Re-read reserves and user shares for every listed pool. The position
/// list is rebuilt wholesale; a position with zero shares simply does not
/// exist in the new snapshot.
async fn refresh_positions(
    contract: &dyn SwapContract,
    chain: &'static Chain,
    account: H160,
    shared: &SharedView,
    epoch: u64,
) -> anyhow::Result<()> {
    let mut pools = HashMap::new();
    let mut positions = Vec::new();
    for listing in chain.tokens {
        let token = parse_address(listing.address)?;
        let reserves = contract.pool_reserves(token).await?;
        let shares = contract.user_shares(token, account).await?;
        if !shares.is_zero() && !reserves.is_empty() {
            let (token_amount, alt_amount) = PoolMath::position_amounts(&reserves, shares)?;
            positions.push(LiquidityPosition {
                token,
                user_shares: shares,
                total_shares: reserves.total_shares,
                token_reserve: reserves.token_reserve,
                alt_reserve: reserves.alt_reserve,
                token_amount,
                alt_amount,
            });
        }
        pools.insert(token, reserves);
    }

    shared.write_if_current(epoch, |view| {
        view.set_pools(pools);
        view.set_positions(positions);
    });
    Ok(())
}

async fn refresh_escrows(
    contract: &dyn SwapContract,
    account: H160,
    shared: &SharedView,
    epoch: u64,
) -> anyhow::Result<()> {
    let escrows = contract.user_escrows(account).await?;
    shared.write_if_current(epoch, |view| view.set_escrows(escrows));
    Ok(())
}

/// Re-read every tracked balance (ALT plus the listed tokens). Decimals
/// come from the token's own `decimals()` report; symbols are read once
/// per (chain, token) and cached, falling back to the registry symbol when
/// the contract has none.
async fn refresh_balances(
    contract: &dyn SwapContract,
    chain: &'static Chain,
    account: H160,
    shared: &SharedView,
    epoch: u64,
    symbols: &DashMap<(u64, H160), String>,
) -> anyhow::Result<()> {
    let mut tracked: Vec<(H160, &str)> = vec![(parse_address(chain.alt_address)?, "ALT")];
    for listing in chain.tokens {
        tracked.push((parse_address(listing.address)?, listing.symbol));
    }

    let mut balances = Vec::with_capacity(tracked.len());
    for (token, registry_symbol) in tracked {
        let (raw, decimals) = contract.token_balance(account, token).await?;
        let key = (chain.decimal_id, token);
        let symbol = match symbols.get(&key) {
            Some(entry) => entry.clone(),
            None => {
                let symbol = match contract.token_symbol(token).await {
                    Ok(symbol) => symbol,
                    Err(error) => {
                        debug!(%token, %error, "symbol lookup failed; using registry symbol");
                        registry_symbol.to_string()
                    }
                };
                symbols.insert(key, symbol.clone());
                symbol
            }
        };
        balances.push(Balance {
            symbol,
            address: token,
            balance: units::from_base_units(raw, decimals),
            raw_balance: raw,
        });
    }

    shared.write_if_current(epoch, |view| view.set_balances(balances));
    Ok(())
}
