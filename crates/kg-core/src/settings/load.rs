//! Settings loading from files and environment

use std::path::{Path, PathBuf};

use super::types::{Settings, SettingsLayer};
use crate::{Error, Result};

/// Load settings from all sources with hierarchy
///
/// `start` is the directory the tool was invoked in; `env` looks up
/// environment variables so callers decide where they come from.
///
/// # Errors
///
/// Returns error if:
/// - A settings file is malformed TOML
/// - An environment override has an invalid value
/// - The merged settings fail validation
pub fn load_settings(start: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Settings> {
    let settings = Settings::default();

    let settings = match global_settings_path() {
        Some(path) if path.is_file() => settings.merge(load_toml_file(&path)?),
        _ => settings,
    };

    let project_path = project_settings_path(start);
    let settings = if project_path.is_file() {
        settings.merge(load_toml_file(&project_path)?)
    } else {
        settings
    };

    let settings = settings.apply_env_vars(env)?;
    settings.validate()?;
    Ok(settings)
}

/// Get path to the global settings file
pub fn global_settings_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "kg")
        .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
}

/// Get path to the project settings file for a start directory
pub fn project_settings_path(start: &Path) -> PathBuf {
    start.join(".kg").join("config.toml")
}

/// Load a TOML file into a settings layer
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn load_toml_file(path: &Path) -> Result<SettingsLayer> {
    if path.is_dir() {
        return Err(Error::Settings(format!(
            "Settings path is a directory, not a file: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::io_error(format!(
            "Failed to read settings file {}: {e}",
            path.display()
        ))
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::Settings(format!(
            "Failed to parse settings file {}: {e}",
            path.display()
        ))
    })
}

impl Settings {
    /// Apply `KG_*` environment overrides - immutable pattern
    ///
    /// # Errors
    ///
    /// Returns error if an override value cannot be parsed
    pub fn apply_env_vars(mut self, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = env("KG_MANIFEST_FILE") {
            self.manifest_file = value;
        }

        if let Some(value) = env("KG_PACKAGE_MANIFEST") {
            self.package_manifest = value;
        }

        if let Some(value) = env("KG_DISCOVERY_CONCURRENCY") {
            self.discovery_concurrency = value.parse().map_err(|e| {
                Error::Settings(format!("Invalid KG_DISCOVERY_CONCURRENCY value: {e}"))
            })?;
        }

        if let Some(value) = env("KG_MEMBER_SEARCH_DEPTH") {
            self.member_search_depth = value.parse().map_err(|e| {
                Error::Settings(format!("Invalid KG_MEMBER_SEARCH_DEPTH value: {e}"))
            })?;
        }

        if let Some(value) = env("KG_ROOT_SEARCH") {
            self.root_search = value
                .parse()
                .map_err(|e| Error::Settings(format!("Invalid KG_ROOT_SEARCH value: {e}")))?;
        }

        Ok(self)
    }

    /// Validate settings values
    ///
    /// # Errors
    ///
    /// Returns error if a value is empty or out of range
    pub fn validate(&self) -> Result<()> {
        if self.manifest_file.trim().is_empty() {
            return Err(Error::Settings("manifest_file cannot be empty".to_string()));
        }
        if self.package_manifest.trim().is_empty() {
            return Err(Error::Settings(
                "package_manifest cannot be empty".to_string(),
            ));
        }
        if self.discovery_concurrency == 0 {
            return Err(Error::Settings(
                "discovery_concurrency must be at least 1".to_string(),
            ));
        }
        if self.member_search_depth == 0 {
            return Err(Error::Settings(
                "member_search_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
