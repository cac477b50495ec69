//! Escrow lifecycle tracking.
//!
//! The contract owns escrow state; this module only derives a local label
//! from the last refresh. Time moves a record from pending to claimable as
//! an *advisory* status — funds move only through the external claim call,
//! and only a refresh confirms that `active` actually flipped.

use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;
use types::{Escrow, U256};

/// Locally derived status of one escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EscrowStatus {
    /// Locked, timeout not yet reached.
    ActivePending,
    /// Locked and past its timeout; the owner may claim.
    ActiveClaimable,
    /// Cleared externally — counterpart completed or claim succeeded.
    Inactive,
}

/// Status of `escrow` as of `now_ms`.
pub fn escrow_status(escrow: &Escrow, now_ms: u64) -> EscrowStatus {
    if !escrow.active {
        EscrowStatus::Inactive
    } else if escrow.timed_out(now_ms) {
        EscrowStatus::ActiveClaimable
    } else {
        EscrowStatus::ActivePending
    }
}

/// An escrow plus its derived status, as handed to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscrowView {
    pub escrow: Escrow,
    pub status: EscrowStatus,
}

/// All escrows of one account on one chain.
///
/// Replaced wholesale on every refresh; nothing here is patched
/// incrementally, so the aggregate can never drift from the records.
#[derive(Debug, Clone, Default)]
pub struct EscrowBook {
    records: Vec<Escrow>,
}

impl EscrowBook {
    pub fn replace_all(&mut self, records: Vec<Escrow>) {
        debug!(count = records.len(), "escrow book replaced");
        self.records = records;
    }

    pub fn get(&self, id: U256) -> Option<&Escrow> {
        self.records.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of locked ALT across active records, recomputed on demand.
    pub fn total_active_alt(&self) -> U256 {
        self.records
            .iter()
            .filter(|e| e.active)
            .fold(U256::zero(), |acc, e| acc + e.alt_amount)
    }

    /// Display order: active records first, soonest timeout first; inactive
    /// records after, in the order the contract returned them (stable).
    pub fn sorted_views(&self, now_ms: u64) -> Vec<EscrowView> {
        let mut records = self.records.clone();
        records.sort_by(|a, b| match (a.active, b.active) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => a.timeout_ms.cmp(&b.timeout_ms),
            (false, false) => Ordering::Equal,
        });
        records
            .into_iter()
            .map(|escrow| {
                let status = escrow_status(&escrow, now_ms);
                EscrowView { escrow, status }
            })
            .collect()
    }
}
