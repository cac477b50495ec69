//! Derived per-chain state.
//!
//! One [`ChainView`] holds everything the UI renders for the active chain:
//! pool reserves, liquidity positions, balances, and the escrow book. The
//! engine owns it exclusively — updates flow only through the refresh
//! functions, and every write is epoch-checked so a response that raced a
//! chain switch lands on the floor instead of in the new chain's view.

use crate::escrow::EscrowBook;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use types::{Balance, Escrow, LiquidityPosition, PoolReserves, H160};

/// Everything derived from one chain's contract state.
#[derive(Debug, Default)]
pub struct ChainView {
    chain_id: u64,
    pools: HashMap<H160, PoolReserves>,
    positions: Vec<LiquidityPosition>,
    balances: Vec<Balance>,
    escrows: EscrowBook,
}

impl ChainView {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn pool(&self, token: H160) -> Option<&PoolReserves> {
        self.pools.get(&token)
    }

    pub fn positions(&self) -> &[LiquidityPosition] {
        &self.positions
    }

    pub fn balances(&self) -> &[Balance] {
        &self.balances
    }

    pub fn escrows(&self) -> &EscrowBook {
        &self.escrows
    }

    pub(crate) fn set_pools(&mut self, pools: HashMap<H160, PoolReserves>) {
        self.pools = pools;
    }

    pub(crate) fn set_positions(&mut self, positions: Vec<LiquidityPosition>) {
        self.positions = positions;
    }

    pub(crate) fn set_balances(&mut self, balances: Vec<Balance>) {
        self.balances = balances;
    }

    pub(crate) fn set_escrows(&mut self, escrows: Vec<Escrow>) {
        self.escrows.replace_all(escrows);
    }
}

/// Monotonic engine counters.
#[derive(Debug, Default)]
pub struct EngineStats {
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
    stale_drops: AtomicU64,
    rejected_actions: AtomicU64,
}

impl EngineStats {
    pub fn note_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_refresh_failure(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_stale_drop(&self) {
        self.stale_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_rejected_action(&self) {
        self.rejected_actions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            stale_drops: self.stale_drops.load(Ordering::Relaxed),
            rejected_actions: self.rejected_actions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub refreshes: u64,
    pub refresh_failures: u64,
    pub stale_drops: u64,
    pub rejected_actions: u64,
}

/// Shared, epoch-guarded handle to the active [`ChainView`].
///
/// The epoch bumps on every chain switch. Refreshes capture the epoch when
/// they start and present it at write time; a mismatch means the chain
/// changed mid-flight and the write is discarded — logged, counted, never
/// surfaced as a user error.
#[derive(Clone)]
pub struct SharedView {
    epoch: Arc<AtomicU64>,
    view: Arc<RwLock<ChainView>>,
    stats: Arc<EngineStats>,
}

impl SharedView {
    pub fn new(chain_id: u64) -> Self {
        Self {
            epoch: Arc::new(AtomicU64::new(0)),
            view: Arc::new(RwLock::new(ChainView::new(chain_id))),
            stats: Arc::new(EngineStats::default()),
        }
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalidate everything: bump the epoch and install a fresh, empty
    /// view for `chain_id`. Returns the new epoch for the next refreshes.
    pub fn reset(&self, chain_id: u64) -> u64 {
        let mut view = self.view.write();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *view = ChainView::new(chain_id);
        debug!(chain_id, epoch, "chain view invalidated");
        epoch
    }

    pub fn read<R>(&self, f: impl FnOnce(&ChainView) -> R) -> R {
        f(&self.view.read())
    }

    /// Apply a refresh result if the chain has not changed since the
    /// refresh started. The epoch check happens under the write lock, so a
    /// concurrent [`SharedView::reset`] cannot interleave.
    pub fn write_if_current(&self, epoch: u64, f: impl FnOnce(&mut ChainView)) -> bool {
        let mut view = self.view.write();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            self.stats.note_stale_drop();
            debug!(
                stale_epoch = epoch,
                current_epoch = self.current_epoch(),
                "discarding refresh for a previous chain"
            );
            return false;
        }
        f(&mut view);
        self.stats.note_refresh();
        true
    }

    pub fn counters(&self) -> &EngineStats {
        &self.stats
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
