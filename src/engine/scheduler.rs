//! Periodic catalog polling.
//!
//! Owns the poll loop lifecycle. The loop is a spawned tokio task shut
//! down through a oneshot channel; ticks are skipped, never queued, while
//! a session is active or after missed intervals.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{EngineError, UpdateEngine};

/// Default polling interval (30 minutes).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1800;

/// Read-only scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// True while the poll loop is running.
    pub running: bool,
}

/// Handle to the running poll loop.
struct LoopHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Periodic update scheduler.
pub struct UpdateScheduler {
    engine: UpdateEngine,
    period: Duration,
    inner: Mutex<Option<LoopHandle>>,
}

impl UpdateScheduler {
    /// Creates a stopped scheduler with the given polling period.
    #[must_use]
    pub fn new(engine: UpdateEngine, period: Duration) -> Self {
        Self {
            engine,
            period,
            inner: Mutex::new(None),
        }
    }

    /// Starts the poll loop. Starting while already running is a no-op.
    ///
    /// The backend lifecycle controls are notified first; the loop's
    /// initial tick fires immediately, so starting triggers a refresh.
    pub async fn start(&self) -> Result<(), EngineError> {
        if self.lock_inner().is_some() {
            debug!("[SCHEDULER] already running, start ignored");
            return Ok(());
        }

        self.engine.notify_scheduler_started().await?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let engine = self.engine.clone();
        let period = self.period;
        let task = tokio::spawn(async move {
            run_poll_loop(engine, period, shutdown_rx).await;
        });

        let mut slot = self.lock_inner();
        if slot.is_some() {
            // A concurrent start won the race; drop our loop immediately.
            let _ = shutdown_tx.send(());
            return Ok(());
        }
        *slot = Some(LoopHandle { shutdown_tx, task });
        info!("[SCHEDULER] started, period {:?}", self.period);
        Ok(())
    }

    /// Stops the poll loop. Stopping while stopped is a no-op.
    ///
    /// The loop is cancelled locally first; a failed backend notification
    /// is logged rather than propagated.
    pub async fn stop(&self) {
        let Some(handle) = self.lock_inner().take() else {
            debug!("[SCHEDULER] already stopped, stop ignored");
            return;
        };

        let _ = handle.shutdown_tx.send(());
        if let Err(e) = handle.task.await {
            warn!("[SCHEDULER] poll loop join failed: {}", e);
        }

        if let Err(e) = self.engine.notify_scheduler_stopped().await {
            warn!("[SCHEDULER] backend stop notification failed: {}", e);
        }
        info!("[SCHEDULER] stopped");
    }

    /// Triggers one immediate refresh outside the periodic cadence.
    ///
    /// Allowed in either state; does not alter the running state. Returns
    /// the count of newly discovered versions.
    pub async fn manual_refresh(&self) -> Result<usize, EngineError> {
        debug!("[SCHEDULER] manual refresh requested");
        self.engine.poll_refresh().await
    }

    /// Returns the local running flag. Never touches the network.
    #[must_use]
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.lock_inner().is_some(),
        }
    }

    /// Queries the backend-side scheduler flag for reconciliation.
    pub async fn remote_status(&self) -> Result<bool, EngineError> {
        self.engine.remote_loop_status().await
    }

    fn lock_inner(&self) -> MutexGuard<'_, Option<LoopHandle>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The poll loop body.
///
/// Missed ticks are skipped, so waking from suspend yields exactly one
/// immediate catch-up tick rather than a burst; a gap longer than twice
/// the period is logged as a resume.
async fn run_poll_loop(
    engine: UpdateEngine,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick: Option<Instant> = None;

    info!("[SCHEDULER] poll loop started");
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("[SCHEDULER] shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                if let Some(prev) = last_tick {
                    let gap = prev.elapsed();
                    if gap > period.saturating_mul(2) {
                        info!("[SCHEDULER] resumed after {:?} gap, catching up with one refresh", gap);
                    }
                }
                last_tick = Some(Instant::now());

                if engine.session_active() {
                    debug!("[SCHEDULER] session active, tick skipped");
                    continue;
                }

                match engine.poll_refresh().await {
                    Ok(fresh) => debug!("[SCHEDULER] refresh complete, {} new versions", fresh),
                    Err(e) => warn!("[SCHEDULER] scheduled refresh failed: {}", e),
                }
            }
        }
    }
    info!("[SCHEDULER] poll loop exited");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::engine::types::{AddonInfo, AddonVersionInfo};
    use crate::gateway::{AddonGateway, GatewayError};

    /// Gateway that returns empty snapshots and counts calls.
    #[derive(Default)]
    struct NullGateway {
        checks: AtomicUsize,
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    #[async_trait]
    impl AddonGateway for NullGateway {
        async fn list_addons(&self) -> Result<Vec<AddonInfo>, GatewayError> {
            Ok(Vec::new())
        }

        async fn check_for_updates(&self) -> Result<Vec<AddonVersionInfo>, GatewayError> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn manual_check_for_updates(&self) -> Result<Vec<AddonVersionInfo>, GatewayError> {
            Ok(Vec::new())
        }

        async fn upgrade_addon(
            &self,
            _version: &AddonVersionInfo,
        ) -> Result<Vec<AddonInfo>, GatewayError> {
            Ok(Vec::new())
        }

        async fn upgrade_all(&self) -> Result<Vec<AddonInfo>, GatewayError> {
            Ok(Vec::new())
        }

        async fn install_essentials(&self) -> Result<Vec<AddonInfo>, GatewayError> {
            Ok(Vec::new())
        }

        async fn get_versions_from_config(&self) -> Result<String, GatewayError> {
            Ok("0.1.0".to_string())
        }

        async fn get_update_loop_status(&self) -> Result<bool, GatewayError> {
            Ok(true)
        }

        async fn start_timer(&self) -> Result<(), GatewayError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop_long_running(&self) -> Result<(), GatewayError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn start_scheduler_remote(&self) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn scheduler(period: Duration) -> (Arc<NullGateway>, UpdateScheduler) {
        let gateway = Arc::new(NullGateway::default());
        let engine = UpdateEngine::new(gateway.clone());
        (gateway, UpdateScheduler::new(engine, period))
    }

    #[tokio::test]
    async fn test_starts_stopped() {
        let (_, scheduler) = scheduler(Duration::from_secs(60));
        assert!(!scheduler.status().running);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (gateway, scheduler) = scheduler(Duration::from_secs(60));

        scheduler.start().await.expect("start");
        scheduler.start().await.expect("second start");
        assert!(scheduler.status().running);

        // The backend was only notified once.
        assert_eq!(gateway.starts.load(Ordering::SeqCst), 1);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_stop_while_stopped_is_noop() {
        let (gateway, scheduler) = scheduler(Duration::from_secs(60));
        scheduler.stop().await;
        assert!(!scheduler.status().running);
        assert_eq!(gateway.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_cancels_loop_and_notifies_backend() {
        let (gateway, scheduler) = scheduler(Duration::from_secs(60));
        scheduler.start().await.expect("start");
        scheduler.stop().await;
        assert!(!scheduler.status().running);
        assert_eq!(gateway.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_tick_refreshes_immediately() {
        let (gateway, scheduler) = scheduler(Duration::from_secs(600));
        scheduler.start().await.expect("start");

        // No time advanced yet: only the immediate first tick has fired.
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(gateway.checks.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(601)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(gateway.checks.load(Ordering::SeqCst), 2);

        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_manual_refresh_does_not_alter_state() {
        let (gateway, scheduler) = scheduler(Duration::from_secs(600));

        scheduler.manual_refresh().await.expect("refresh");
        assert!(!scheduler.status().running);
        assert_eq!(gateway.checks.load(Ordering::SeqCst), 1);
    }
}
