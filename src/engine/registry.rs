//! Installed-addon and catalog snapshot cache.
//!
//! Holds the last successful snapshots from the gateway. Both are replaced
//! wholesale on refresh, never merged incrementally; readers always get one
//! consistent snapshot (stale-but-consistent over empty-but-broken).

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use super::types::{AddonInfo, AddonVersionInfo};

/// In-core cache of the installed list and the version catalog.
#[derive(Debug, Default)]
pub struct AddonRegistry {
    installed: RwLock<Vec<AddonInfo>>,
    catalog: RwLock<Vec<AddonVersionInfo>>,
}

impl AddonRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the installed-addon snapshot.
    #[must_use]
    pub fn installed(&self) -> Vec<AddonInfo> {
        self.installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns a copy of the catalog snapshot.
    #[must_use]
    pub fn catalog(&self) -> Vec<AddonVersionInfo> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the installed snapshot wholesale.
    pub fn replace_installed(&self, next: Vec<AddonInfo>) {
        debug!(count = next.len(), "installed snapshot replaced");
        *self
            .installed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Replaces the catalog snapshot wholesale.
    ///
    /// Returns the number of newly discovered versions: entries whose
    /// `(project_id, version_id)` key was absent from the prior snapshot,
    /// restricted to projects the registry currently has installed. On the
    /// first refresh the prior snapshot is empty, so every version of an
    /// installed project counts.
    pub fn replace_catalog(&self, next: Vec<AddonVersionInfo>) -> usize {
        let installed_projects: HashSet<i64> = self
            .installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|a| a.project_id)
            .collect();

        let mut catalog = self
            .catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let prior: HashSet<(i64, i64)> = catalog
            .iter()
            .map(|v| (v.project_id, v.version_id))
            .collect();

        let fresh = next
            .iter()
            .filter(|v| {
                installed_projects.contains(&v.project_id)
                    && !prior.contains(&(v.project_id, v.version_id))
            })
            .count();

        debug!(count = next.len(), fresh, "catalog snapshot replaced");
        *catalog = next;
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addon(project_id: i64, current: Option<i64>) -> AddonInfo {
        AddonInfo {
            name: format!("addon-{project_id}"),
            project_id,
            desired_version: None,
            date: None,
            current_version_id: current,
        }
    }

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
    fn test_snapshots_start_empty() {
        let registry = AddonRegistry::new();
        assert!(registry.installed().is_empty());
        assert!(registry.catalog().is_empty());
    }

    #[test]
    fn test_replace_is_wholesale() {
        let registry = AddonRegistry::new();
        registry.replace_installed(vec![addon(7, Some(1)), addon(9, None)]);
        registry.replace_installed(vec![addon(9, None)]);
        assert_eq!(registry.installed().len(), 1);
    }

    #[test]
    fn test_first_catalog_counts_installed_projects_only() {
        let registry = AddonRegistry::new();
        registry.replace_installed(vec![addon(7, Some(1))]);

        // Project 9 is not installed; its versions are not "new".
        let fresh = registry.replace_catalog(vec![
            version(7, 2),
            version(7, 3),
            version(9, 10),
        ]);
        assert_eq!(fresh, 2);
    }

    #[test]
    fn test_unchanged_catalog_discovers_nothing() {
        let registry = AddonRegistry::new();
        registry.replace_installed(vec![addon(7, Some(1))]);
        registry.replace_catalog(vec![version(7, 2)]);

        let fresh = registry.replace_catalog(vec![version(7, 2)]);
        assert_eq!(fresh, 0);
    }

    #[test]
    fn test_new_version_is_counted() {
        let registry = AddonRegistry::new();
        registry.replace_installed(vec![addon(7, Some(1))]);
        registry.replace_catalog(vec![version(7, 2)]);

        let fresh = registry.replace_catalog(vec![version(7, 2), version(7, 3)]);
        assert_eq!(fresh, 1);
    }

    #[test]
    fn test_catalog_shrink_discovers_nothing() {
        let registry = AddonRegistry::new();
        registry.replace_installed(vec![addon(7, Some(1))]);
        registry.replace_catalog(vec![version(7, 2), version(7, 3)]);

        let fresh = registry.replace_catalog(vec![version(7, 3)]);
        assert_eq!(fresh, 0);
        assert_eq!(registry.catalog().len(), 1);
    }
}
