//! Settings type definitions and defaults

use serde::{Deserialize, Serialize};

/// How the workspace root marker is searched for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RootSearch {
    /// Walk from the start directory towards the filesystem root
    #[default]
    Outward,
    /// Search the whole tree beneath the start directory
    Inward,
}

impl std::str::FromStr for RootSearch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outward" => Ok(Self::Outward),
            "inward" => Ok(Self::Inward),
            other => Err(format!("expected 'outward' or 'inward', got '{other}'")),
        }
    }
}

/// Root settings structure
///
/// Loaded from defaults → global → project → env vars → CLI flags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// File name of the CLI manifest inside a plugin package
    pub manifest_file: String,
    /// File name of a package manifest (member packages and the root marker)
    pub package_manifest: String,
    /// Maximum number of manifest reads in flight during discovery
    pub discovery_concurrency: usize,
    /// Maximum directory depth searched for member packages
    pub member_search_depth: usize,
    pub root_search: RootSearch,
    /// Directory names never descended into
    pub ignored_directories: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest_file: "kg.json".to_string(),
            package_manifest: "package.json".to_string(),
            discovery_concurrency: 16,
            member_search_depth: 4,
            root_search: RootSearch::Outward,
            ignored_directories: vec!["node_modules".to_string(), ".git".to_string()],
        }
    }
}

/// One settings file. Fields the file omits stay `None` so they never
/// override an earlier layer.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SettingsLayer {
    pub manifest_file: Option<String>,
    pub package_manifest: Option<String>,
    pub discovery_concurrency: Option<usize>,
    pub member_search_depth: Option<usize>,
    pub root_search: Option<RootSearch>,
    pub ignored_directories: Option<Vec<String>>,
}

impl Settings {
    /// Whether a directory entry with this name is skipped by tree walks.
    #[must_use]
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_directories.iter().any(|d| d == name)
    }
}
