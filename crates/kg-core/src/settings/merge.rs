//! Settings merging logic (immutable pattern)
//!
//! A layer overrides exactly the fields it sets, so a settings file only has
//! to mention the values it changes.

use super::types::{Settings, SettingsLayer};

impl Settings {
    /// Merge a settings layer into this one (the layer takes precedence)
    ///
    /// Lists are replaced, not appended.
    #[must_use]
    pub fn merge(self, layer: SettingsLayer) -> Self {
        Self {
            manifest_file: layer.manifest_file.unwrap_or(self.manifest_file),
            package_manifest: layer.package_manifest.unwrap_or(self.package_manifest),
            discovery_concurrency: layer
                .discovery_concurrency
                .unwrap_or(self.discovery_concurrency),
            member_search_depth: layer.member_search_depth.unwrap_or(self.member_search_depth),
            root_search: layer.root_search.unwrap_or(self.root_search),
            ignored_directories: layer
                .ignored_directories
                .unwrap_or(self.ignored_directories),
        }
    }
}
