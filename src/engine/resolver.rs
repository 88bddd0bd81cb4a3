//! Pure update resolution.
//!
//! Matches installed add-ons against a catalog snapshot and picks the best
//! applicable update. No side effects, no network access; callable on stale
//! or empty catalogs without failure.

use std::collections::HashMap;

use tracing::warn;

use super::types::{AddonInfo, AddonVersionInfo};

/// Resolves the best available update for a single add-on.
///
/// Considers catalog entries with the same `project_id` and a `version_id`
/// strictly greater than the installed one (every version when the addon
/// was never installed), and returns the entry with the maximum
/// `version_id`. Returns `None` when no candidate exists, which is the
/// ordinary "no update" state, not an error.
///
/// `version_id` is unique per project, so ties should not occur. A
/// duplicate id is malformed catalog data: it is logged and the later
/// catalog entry wins.
#[must_use]
pub fn resolve_update<'a>(
    addon: &AddonInfo,
    catalog: &'a [AddonVersionInfo],
) -> Option<&'a AddonVersionInfo> {
    let floor = addon.installed_floor();
    let mut best: Option<&AddonVersionInfo> = None;

    for entry in catalog
        .iter()
        .filter(|v| v.project_id == addon.project_id && v.version_id > floor)
    {
        match best {
            None => best = Some(entry),
            Some(current) if entry.version_id > current.version_id => best = Some(entry),
            Some(current) if entry.version_id == current.version_id => {
                warn!(
                    project_id = entry.project_id,
                    version_id = entry.version_id,
                    "duplicate version_id in catalog, keeping later entry"
                );
                best = Some(entry);
            }
            Some(_) => {}
        }
    }

    best
}

/// Resolves updates for every add-on, keyed by `project_id`.
///
/// The vectorized form used by bulk operations and the "available updates"
/// count. An addon with no matching catalog entries maps to `None`.
#[must_use]
pub fn resolve_all_updates(
    addons: &[AddonInfo],
    catalog: &[AddonVersionInfo],
) -> HashMap<i64, Option<AddonVersionInfo>> {
    addons
        .iter()
        .map(|addon| (addon.project_id, resolve_update(addon, catalog).cloned()))
        .collect()
}

/// Returns the update candidates in addon order, one per addon with an
/// available update.
///
/// Iteration order follows `addons`, so the result is deterministic for a
/// given registry snapshot.
#[must_use]
pub fn available_updates(
    addons: &[AddonInfo],
    catalog: &[AddonVersionInfo],
) -> Vec<AddonVersionInfo> {
    addons
        .iter()
        .filter_map(|addon| resolve_update(addon, catalog).cloned())
        .collect()
}
