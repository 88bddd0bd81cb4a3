//! Addonup
//!
//! Update resolution and orchestration engine for game-client add-ons.
//! Tracks installed add-ons, polls a remote catalog for newer versions,
//! and drives single or bulk upgrades with progress tracking and
//! new-version notifications.
//!
//! # Architecture
//!
//! - **Engine Module**: orchestration operations, snapshot registry,
//!   session discipline, event bus, and the periodic scheduler
//! - **Gateway Module**: the async boundary to the backend process; every
//!   network and storage effect lives behind it
//! - **Config Module**: TOML configuration with defaults
//! - **Logging Module**: file-based tracing setup
//!
//! # Usage
//!
//! ```ignore
//! use addonup::{UpdateEngine, UpdateScheduler, UpdaterConfig};
//!
//! let config = UpdaterConfig::load();
//! let engine = UpdateEngine::new(gateway);
//! let scheduler = UpdateScheduler::new(engine.clone(), config.poll_interval());
//!
//! let mut events = engine.subscribe();
//! scheduler.start().await?;
//! // ... react to events, drive upgrades
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod engine;
pub mod gateway;
pub mod logging;

// Re-export main types
pub use config::{ConfigError, UpdaterConfig};
pub use engine::{
    AddonInfo, AddonVersionInfo, EngineError, EngineEvent, ProgressState, SchedulerStatus,
    UpdateEngine, UpdateScheduler,
};
pub use gateway::{AddonGateway, GatewayError};
pub use logging::LogConfig;
