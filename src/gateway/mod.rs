//! Remote procedure gateway boundary.
//!
//! Every network and storage effect lives behind [`AddonGateway`]: the
//! engine treats each call as a fallible asynchronous operation with no
//! implicit retry. The transport that marshals these calls to the backend
//! process supplies the implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::engine::{AddonInfo, AddonVersionInfo};

/// Gateway error types.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The call never reached the backend or the connection dropped.
    #[error("gateway transport error: {0}")]
    Transport(String),

    /// The backend received the call and rejected it.
    #[error("backend rejected call: {0}")]
    Rejected(String),

    /// The backend replied with a payload the transport could not decode.
    #[error("malformed gateway payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Asynchronous request/response surface of the backend process.
///
/// Implementations are free to marshal however they like; the engine only
/// depends on these contracts. Timeouts are the implementation's
/// responsibility.
#[async_trait]
pub trait AddonGateway: Send + Sync {
    /// Returns the current installed-addon snapshot.
    async fn list_addons(&self) -> Result<Vec<AddonInfo>, GatewayError>;

    /// Refreshes the version catalog (periodic/background path).
    async fn check_for_updates(&self) -> Result<Vec<AddonVersionInfo>, GatewayError>;

    /// Refreshes the version catalog (user-triggered, session-tracked path).
    async fn manual_check_for_updates(&self) -> Result<Vec<AddonVersionInfo>, GatewayError>;

    /// Upgrades one addon to the given version and returns the refreshed
    /// installed list.
    async fn upgrade_addon(
        &self,
        version: &AddonVersionInfo,
    ) -> Result<Vec<AddonInfo>, GatewayError>;

    /// Backend-side bulk upgrade; returns the refreshed installed list.
    async fn upgrade_all(&self) -> Result<Vec<AddonInfo>, GatewayError>;

    /// Installs the backend's fixed baseline set; returns the refreshed
    /// installed list.
    async fn install_essentials(&self) -> Result<Vec<AddonInfo>, GatewayError>;

    /// Backend version/identity string, informational only.
    async fn get_versions_from_config(&self) -> Result<String, GatewayError>;

    /// Backend-side scheduler running flag.
    async fn get_update_loop_status(&self) -> Result<bool, GatewayError>;

    /// Notifies the backend that the polling timer started.
    async fn start_timer(&self) -> Result<(), GatewayError>;

    /// Notifies the backend that long-running work should stop.
    async fn stop_long_running(&self) -> Result<(), GatewayError>;

    /// Notifies the backend that the scheduler is live.
    async fn start_scheduler_remote(&self) -> Result<(), GatewayError>;
}
