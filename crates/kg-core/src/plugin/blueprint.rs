//! Blueprints: template directories registered by plugins

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::grammar::BoundParameters;
use crate::manifest::PluginRecord;
use crate::project::ProjectHandle;
use crate::registry::PluginMap;
use crate::{Error, Result};

/// A request to materialise one blueprint.
#[derive(Debug, Clone, Copy)]
pub struct BlueprintRequest<'a> {
    pub blueprint: &'a str,
    /// Name of the thing being created
    pub name: &'a str,
    pub template_directory: &'a Path,
    pub destination: &'a Path,
    pub project: &'a ProjectHandle,
    pub parameters: &'a BoundParameters,
}

/// Turns a blueprint template into files.
#[async_trait]
pub trait BlueprintResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns error if the blueprint cannot be materialised.
    async fn resolve(&self, request: &BlueprintRequest<'_>) -> Result<()>;
}

/// The plugin registering a blueprint and its template directory.
#[derive(Debug, Clone, Copy)]
pub struct BlueprintMatch<'a> {
    pub record: &'a PluginRecord,
    pub template: &'a str,
}

impl BlueprintMatch<'_> {
    /// Template directory resolved against the plugin's package directory.
    #[must_use]
    pub fn template_directory(&self) -> PathBuf {
        self.record
            .directory
            .as_deref()
            .map_or_else(|| PathBuf::from(self.template), |dir| dir.join(self.template))
    }
}

/// Find the plugin registering blueprint `name`.
///
/// When several plugins register the same name, the one with the smallest
/// plugin name wins.
///
/// # Errors
///
/// Returns `BlueprintNotFound` when no plugin registers `name`.
pub fn find_blueprint<'a>(plugins: &'a PluginMap, name: &str) -> Result<BlueprintMatch<'a>> {
    let mut matches: Vec<BlueprintMatch<'a>> = plugins
        .values()
        .filter_map(|record| {
            let template = record.manifest.blueprints.as_ref()?.registrations.get(name)?;
            Some(BlueprintMatch { record, template })
        })
        .collect();
    matches.sort_by(|a, b| a.record.name().cmp(b.record.name()));

    if matches.len() > 1 {
        tracing::warn!(
            blueprint = name,
            plugins = ?matches.iter().map(|m| m.record.name()).collect::<Vec<_>>(),
            "Blueprint registered by several plugins"
        );
    }

    matches
        .into_iter()
        .next()
        .ok_or_else(|| Error::BlueprintNotFound(name.to_string()))
}
