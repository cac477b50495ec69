//! Bounded reconciliation polling.
//!
//! There is no push channel from the chain, so after a mutating action the
//! engine re-reads external state until the local view converges: one
//! immediate refresh to catch fast-settling changes, then fixed-interval
//! repeats until a deadline, then silence. The policy is deliberately
//! transport-agnostic — a refresh function plus two durations — so a
//! push-based subscription can replace it later without touching callers.
//!
//! Rules enforced here:
//! - at most one live cycle per [`Reconciler`]; re-triggering extends the
//!   running cycle's deadline instead of starting a second one;
//! - a failed refresh is logged and the cycle continues — the previous
//!   snapshot stays on screen;
//! - cancellation is guaranteed: explicit [`Reconciler::cancel`] or simply
//!   dropping the owner aborts the task, so no timer outlives its context.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How a reconciliation cycle paces itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Delay between consecutive refreshes.
    pub interval: Duration,
    /// Cycle length; the final refresh happens at or before this deadline.
    pub max_duration: Duration,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_duration: Duration::from_secs(30),
        }
    }
}

/// A snapshot refresh for one tracked resource.
#[async_trait]
pub trait Refresh: Send + Sync {
    async fn refresh(&self) -> anyhow::Result<()>;
}

/// Adapter for closure-based refreshes.
pub struct FnRefresh<F>(pub F);

#[async_trait]
impl<F, Fut> Refresh for FnRefresh<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn refresh(&self) -> anyhow::Result<()> {
        (self.0)().await
    }
}

/// Owns the polling cycle of one resource.
pub struct Reconciler {
    label: String,
    policy: ReconcilePolicy,
    refresh: Arc<dyn Refresh>,
    deadline: Arc<Mutex<Instant>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Reconciler {
    pub fn new(label: impl Into<String>, policy: ReconcilePolicy, refresh: Arc<dyn Refresh>) -> Self {
        Self {
            label: label.into(),
            policy,
            refresh,
            deadline: Arc::new(Mutex::new(Instant::now())),
            task: Mutex::new(None),
        }
    }

    /// Start a cycle, or push the deadline of the one already running.
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self) {
        *self.deadline.lock() = Instant::now() + self.policy.max_duration;

        let mut task = self.task.lock();
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                debug!(resource = %self.label, "reconciliation already running; extending window");
                return;
            }
        }

        let refresh = Arc::clone(&self.refresh);
        let deadline = Arc::clone(&self.deadline);
        let interval = self.policy.interval;
        let label = self.label.clone();
        *task = Some(tokio::spawn(async move {
            loop {
                if let Err(error) = refresh.refresh().await {
                    // Transient by policy: keep the last good snapshot and
                    // keep polling until the window closes.
                    warn!(resource = %label, %error, "refresh failed; retaining last snapshot");
                }
                if Instant::now() >= *deadline.lock() {
                    break;
                }
                tokio::time::sleep(interval).await;
                if Instant::now() > *deadline.lock() {
                    break;
                }
            }
            debug!(resource = %label, "reconciliation window closed");
        }));
    }

    /// Stop the running cycle, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            debug!(resource = %self.label, "reconciliation cancelled");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn counting_refresh(count: Arc<AtomicU64>) -> Arc<dyn Refresh> {
        Arc::new(FnRefresh(move || {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }))
    }

    fn policy(interval_ms: u64, max_ms: u64) -> ReconcilePolicy {
        ReconcilePolicy {
            interval: Duration::from_millis(interval_ms),
            max_duration: Duration::from_millis(max_ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn final_refresh_is_at_or_before_the_deadline() {
        let count = Arc::new(AtomicU64::new(0));
        let reconciler = Reconciler::new("test", policy(2_000, 30_000), counting_refresh(count.clone()));

        reconciler.trigger();
        tokio::time::sleep(Duration::from_millis(60_000)).await;

        // Refreshes at t = 0, 2000, ..., 30000 and none after.
        assert_eq!(count.load(Ordering::SeqCst), 16);
        tokio::time::sleep(Duration::from_millis(30_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 16);
        assert!(!reconciler.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn retrigger_extends_instead_of_duplicating() {
        let count = Arc::new(AtomicU64::new(0));
        let reconciler = Reconciler::new("test", policy(2_000, 30_000), counting_refresh(count.clone()));

        reconciler.trigger();
        reconciler.trigger();
        tokio::time::sleep(Duration::from_millis(1)).await;
        // A second concurrent cycle would have produced two immediate refreshes.
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(29_000)).await;
        reconciler.trigger(); // extend while still running
        tokio::time::sleep(Duration::from_millis(40_000)).await;

        let total = count.load(Ordering::SeqCst);
        assert!(total > 16, "cycle should have outlived the original window, got {total}");
        tokio::time::sleep(Duration::from_millis(30_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), total);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_the_cycle() {
        let count = Arc::new(AtomicU64::new(0));
        let reconciler = Reconciler::new("test", policy(2_000, 30_000), counting_refresh(count.clone()));

        reconciler.trigger();
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3); // t = 0, 2000, 4000

        drop(reconciler);
        tokio::time::sleep(Duration::from_millis(20_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_the_cycle() {
        let count = Arc::new(AtomicU64::new(0));
        let inner = count.clone();
        let refresh: Arc<dyn Refresh> = Arc::new(FnRefresh(move || {
            let count = Arc::clone(&inner);
            async move {
                let n = count.fetch_add(1, Ordering::SeqCst);
                if n % 2 == 0 {
                    anyhow::bail!("transient RPC failure");
                }
                Ok(())
            }
        }));
        let reconciler = Reconciler::new("test", policy(2_000, 10_000), refresh);

        reconciler.trigger();
        tokio::time::sleep(Duration::from_millis(20_000)).await;
        // t = 0..10000 step 2000: all six attempts ran despite alternating failures.
        assert_eq!(count.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_restarts_after_a_finished_cycle() {
        let count = Arc::new(AtomicU64::new(0));
        let reconciler = Reconciler::new("test", policy(2_000, 4_000), counting_refresh(count.clone()));

        reconciler.trigger();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        let first_cycle = count.load(Ordering::SeqCst);
        assert_eq!(first_cycle, 3); // t = 0, 2000, 4000

        reconciler.trigger();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), first_cycle + 3);
    }
}
