//! Core data types for the update engine.
//!
//! These structures cross the gateway marshalling boundary, so they all
//! derive serde traits. The wire format itself belongs to the transport.

use serde::{Deserialize, Serialize};

/// Progress value signalling that a session has terminated.
pub const TERMINAL_PROGRESS: i64 = -1;

/// A single published version of an add-on in the remote catalog.
///
/// `version_id` is strictly increasing per `project_id` and unique within
/// it; `file_name`, `date_created` and `game_version` are opaque
/// descriptive strings the engine never interprets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonVersionInfo {
    /// Version identifier, unique within a project.
    pub version_id: i64,
    /// Catalog entry the version belongs to.
    pub project_id: i64,
    /// Archive file name as published.
    pub file_name: String,
    /// Publication timestamp, opaque.
    pub date_created: String,
    /// Game version the file targets, opaque.
    pub game_version: String,
}

/// An installed add-on as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonInfo {
    /// Display name, not used for matching.
    pub name: String,
    /// Join key into the version catalog.
    pub project_id: i64,
    /// Version the user has pinned to, if any.
    #[serde(default)]
    pub desired_version: Option<i64>,
    /// Last-installed timestamp, informational.
    #[serde(default)]
    pub date: Option<String>,
    /// Installed version id; `None` when never installed.
    #[serde(default)]
    pub current_version_id: Option<i64>,
}

impl AddonInfo {
    /// Returns the version floor for update resolution.
    ///
    /// A never-installed addon (absent or zero `current_version_id`) has a
    /// floor of 0, so every catalog version for its project is a candidate.
    #[must_use]
    pub fn installed_floor(&self) -> i64 {
        self.current_version_id.unwrap_or(0)
    }
}

/// State of the single orchestration session.
///
/// At most one session is active system-wide. A `progress` of
/// [`TERMINAL_PROGRESS`] in an emitted event marks the end of a session
/// regardless of `total`; the stored state is reset to idle at that point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Label of the operation in progress, empty when idle.
    pub name: String,
    /// True while a session is running.
    pub in_progress: bool,
    /// Completed step count.
    pub progress: i64,
    /// Total step count for the session.
    pub total: i64,
}

impl ProgressState {
    /// Returns the idle state.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            name: String::new(),
            in_progress: false,
            progress: 0,
            total: 0,
        }
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(project_id: i64, version_id: i64) -> AddonVersionInfo {
        AddonVersionInfo {
            version_id,
            project_id,
            file_name: format!("addon-{project_id}-{version_id}.zip"),
            date_created: "2025-01-01".to_string(),
            game_version: "11.0.2".to_string(),
        }
    }

    #[test]
    fn test_installed_floor() {
        let mut addon = AddonInfo {
            name: "Details".to_string(),
            project_id: 61284,
            desired_version: None,
            date: None,
            current_version_id: Some(5),
        };
        assert_eq!(addon.installed_floor(), 5);

        addon.current_version_id = None;
        assert_eq!(addon.installed_floor(), 0);

        addon.current_version_id = Some(0);
        assert_eq!(addon.installed_floor(), 0);
    }

    #[test]
    fn test_progress_state_idle() {
        let state = ProgressState::idle();
        assert!(!state.in_progress);
        assert!(state.name.is_empty());
        assert_eq!(state.progress, 0);
        assert_eq!(state.total, 0);
        assert_eq!(state, ProgressState::default());
    }

    #[test]
    fn test_addon_info_deserialize_defaults() {
        // Backend rows with NULL columns arrive without the optional fields.
        let addon: AddonInfo =
            serde_json::from_str(r#"{"name":"Details","project_id":61284}"#)
                .expect("minimal addon payload should parse");
        assert_eq!(addon.project_id, 61284);
        assert!(addon.current_version_id.is_none());
        assert!(addon.desired_version.is_none());
    }

    #[test]
    fn test_version_info_roundtrip() {
        let v = version(7, 5);
        let json = serde_json::to_string(&v).expect("serialize");
        let back: AddonVersionInfo = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(v, back);
    }
}
