//! Update resolution and orchestration engine.
//!
//! The engine owns the only mutable core state (registry snapshots and the
//! session flag), drives the gateway, and publishes events for the
//! presentation layer. The view holds a read reference and never mutates
//! engine state directly.
//!
//! # Architecture
//!
//! - **types**: wire-facing data structures
//! - **resolver**: pure update resolution
//! - **registry**: installed/catalog snapshot cache
//! - **session**: single-session discipline with RAII progress handles
//! - **events**: broadcast event bus
//! - **scheduler**: periodic catalog polling

pub mod events;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};

use crate::gateway::{AddonGateway, GatewayError};

pub use events::{DEFAULT_EVENT_CAPACITY, EngineEvent, EventBus};
pub use registry::AddonRegistry;
pub use resolver::{available_updates, resolve_all_updates, resolve_update};
pub use scheduler::{DEFAULT_POLL_INTERVAL_SECS, SchedulerStatus, UpdateScheduler};
pub use session::{SessionHandle, SessionTracker};
pub use types::{AddonInfo, AddonVersionInfo, ProgressState, TERMINAL_PROGRESS};

/// Engine error types.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A gateway call failed; propagated, never retried.
    #[error("gateway call failed: {0}")]
    Gateway(#[from] GatewayError),

    /// Another session is active. Raised synchronously before any gateway
    /// call; the caller may retry after the active session ends.
    #[error("operation '{0}' already in progress")]
    Busy(String),
}

/// The orchestration engine.
///
/// Cheap to clone; clones share the registry, session tracker, and event
/// bus. All operations run on the single logical orchestration flow —
/// bulk operations serialize through the session tracker.
#[derive(Clone)]
pub struct UpdateEngine {
    gateway: Arc<dyn AddonGateway>,
    registry: Arc<AddonRegistry>,
    session: Arc<SessionTracker>,
    events: EventBus,
}

impl UpdateEngine {
    /// Creates an engine over the given gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn AddonGateway>) -> Self {
        Self::with_event_capacity(gateway, DEFAULT_EVENT_CAPACITY)
    }

    /// Creates an engine with a specific event channel capacity.
    #[must_use]
    pub fn with_event_capacity(gateway: Arc<dyn AddonGateway>, capacity: usize) -> Self {
        let events = EventBus::new(capacity);
        Self {
            gateway,
            registry: Arc::new(AddonRegistry::new()),
            session: Arc::new(SessionTracker::new(events.clone())),
            events,
        }
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    /// Returns the installed-addon snapshot.
    #[must_use]
    pub fn installed(&self) -> Vec<AddonInfo> {
        self.registry.installed()
    }

    /// Returns the catalog snapshot.
    #[must_use]
    pub fn catalog(&self) -> Vec<AddonVersionInfo> {
        self.registry.catalog()
    }

    /// Returns the current session state.
    #[must_use]
    pub fn progress(&self) -> ProgressState {
        self.session.snapshot()
    }

    /// Returns true while a session is active.
    #[must_use]
    pub fn session_active(&self) -> bool {
        self.session.is_active()
    }

    /// Subscribes to engine events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Subscribes to engine events as a `Stream`.
    #[must_use]
    pub fn event_stream(&self) -> BroadcastStream<EngineEvent> {
        self.events.stream()
    }

    /// Resolves the update candidates against the current snapshots, one
    /// per installed addon with an available update. The length of the
    /// result is the "available updates" display count.
    #[must_use]
    pub fn available_updates(&self) -> Vec<AddonVersionInfo> {
        resolver::available_updates(&self.registry.installed(), &self.registry.catalog())
    }

    /// Vectorized resolution over the current snapshots, keyed by
    /// `project_id`.
    #[must_use]
    pub fn resolve_all(&self) -> HashMap<i64, Option<AddonVersionInfo>> {
        resolver::resolve_all_updates(&self.registry.installed(), &self.registry.catalog())
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Refreshes the installed list from the gateway.
    pub async fn refresh_installed(&self) -> Result<Vec<AddonInfo>, EngineError> {
        let installed = self.gateway.list_addons().await?;
        self.registry.replace_installed(installed.clone());
        Ok(installed)
    }

    /// Runs one combined refresh: installed list, then catalog.
    ///
    /// Both snapshots are committed only after both gateway calls succeed,
    /// so a failed refresh leaves the registry untouched. Emits
    /// `new_versions_found` when the catalog diff discovered versions for
    /// installed projects. Returns the discovered count.
    pub async fn poll_refresh(&self) -> Result<usize, EngineError> {
        let installed = self.gateway.list_addons().await?;
        let catalog = self.gateway.check_for_updates().await?;

        self.registry.replace_installed(installed);
        let fresh = self.registry.replace_catalog(catalog);
        if fresh > 0 {
            info!(count = fresh, "new versions discovered");
            self.events.emit(EngineEvent::NewVersionsFound { count: fresh });
        }
        Ok(fresh)
    }

    // ------------------------------------------------------------------
    // Orchestration
    // ------------------------------------------------------------------

    /// Upgrades a single addon to the given version.
    ///
    /// Not session-tracked; the gateway failure, if any, is propagated
    /// unchanged. On success the installed snapshot is replaced with the
    /// refreshed list the backend returned.
    pub async fn upgrade_one(
        &self,
        version: &AddonVersionInfo,
    ) -> Result<Vec<AddonInfo>, EngineError> {
        info!(
            project_id = version.project_id,
            version_id = version.version_id,
            "upgrading addon"
        );
        let installed = self.gateway.upgrade_addon(version).await?;
        self.registry.replace_installed(installed.clone());
        Ok(installed)
    }

    /// Upgrades every addon with an available update, one gateway call per
    /// addon, publishing a progress event after each step.
    ///
    /// Targets are resolved against one consistent snapshot pair, in
    /// registry order, so a retry over the same state processes the same
    /// sequence. Fails with [`EngineError::Busy`] when a session is
    /// active. A gateway failure aborts the sequence, emits the terminal
    /// sentinel, and propagates; addons already processed keep their
    /// refreshed state.
    pub async fn upgrade_all(&self) -> Result<Vec<AddonInfo>, EngineError> {
        let installed = self.registry.installed();
        let catalog = self.registry.catalog();
        let targets = resolver::available_updates(&installed, &catalog);
        let total = targets.len() as i64;

        let mut session = self.session.begin("upgrade all", total)?;
        info!(targets = targets.len(), "bulk upgrade started");

        let mut refreshed = installed;
        for (done, version) in targets.iter().enumerate() {
            let result = self.gateway.upgrade_addon(version).await?;
            self.registry.replace_installed(result.clone());
            refreshed = result;
            session.advance((done + 1) as i64);
        }

        session.finish();
        info!("bulk upgrade complete");
        Ok(refreshed)
    }

    /// Delegates the bulk upgrade to the backend in one call.
    ///
    /// Session-tracked like [`UpdateEngine::upgrade_all`], but without
    /// per-addon progress; hosts that want the backend-side path use this.
    pub async fn upgrade_all_remote(&self) -> Result<Vec<AddonInfo>, EngineError> {
        let mut session = self.session.begin("upgrade all", 1)?;
        let installed = self.gateway.upgrade_all().await?;
        self.registry.replace_installed(installed.clone());
        session.advance(1);
        session.finish();
        Ok(installed)
    }

    /// Installs the backend's baseline addon set.
    ///
    /// A bulk-upgrade variant for progress-reporting purposes: the fixed
    /// set is supplied by the backend, which installs it in one call.
    pub async fn install_essentials(&self) -> Result<Vec<AddonInfo>, EngineError> {
        let mut session = self.session.begin("installing essentials", 1)?;
        info!("installing essential addons");
        let installed = self.gateway.install_essentials().await?;
        self.registry.replace_installed(installed.clone());
        session.advance(1);
        session.finish();
        Ok(installed)
    }

    /// Runs a session-tracked catalog refresh and returns the resolved
    /// update candidates.
    ///
    /// Distinct from the periodic scheduler tick: progress events are
    /// published while the call is in flight so the view can disable
    /// controls, and `new_versions_found` is emitted on fresh discoveries.
    pub async fn manual_check(&self) -> Result<Vec<AddonVersionInfo>, EngineError> {
        let mut session = self.session.begin("checking for updates", 1)?;
        let catalog = self.gateway.manual_check_for_updates().await?;

        let fresh = self.registry.replace_catalog(catalog);
        if fresh > 0 {
            info!(count = fresh, "new versions discovered");
            self.events.emit(EngineEvent::NewVersionsFound { count: fresh });
        }

        session.advance(1);
        session.finish();
        Ok(self.available_updates())
    }

    // ------------------------------------------------------------------
    // Backend passthroughs
    // ------------------------------------------------------------------

    /// Returns the backend version/identity string.
    pub async fn backend_version(&self) -> Result<String, EngineError> {
        Ok(self.gateway.get_versions_from_config().await?)
    }

    /// Queries the backend-side scheduler flag.
    pub async fn remote_loop_status(&self) -> Result<bool, EngineError> {
        Ok(self.gateway.get_update_loop_status().await?)
    }

    pub(crate) async fn notify_scheduler_started(&self) -> Result<(), EngineError> {
        self.gateway.start_timer().await?;
        self.gateway.start_scheduler_remote().await?;
        debug!("backend notified of scheduler start");
        Ok(())
    }

    pub(crate) async fn notify_scheduler_stopped(&self) -> Result<(), EngineError> {
        self.gateway.stop_long_running().await?;
        debug!("backend notified of scheduler stop");
        Ok(())
    }
}
