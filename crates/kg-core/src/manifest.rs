//! CLI manifests and the manifest reader
//!
//! A package declares itself CLI-capable by shipping a `kg.json` next to its
//! `package.json`:
//!
//! ```json
//! {
//!   "name": "build",
//!   "commandEntryPoint": "@kg/build::BuildCommand",
//!   "blueprints": {
//!     "resolverEntryPoint": "@kg/build::Resolver",
//!     "packages": { "library": "blueprints/library" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Self-description of a CLI-capable package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_entry_point: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprints: Option<BlueprintRegistrations>,
}

/// Blueprints a package contributes, keyed by blueprint name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintRegistrations {
    pub resolver_entry_point: String,
    /// Blueprint name → template directory relative to the package
    #[serde(default, rename = "packages", alias = "registrations")]
    pub registrations: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse manifest JSON read for `package`.
    ///
    /// # Errors
    ///
    /// Returns `ManifestInvalid` if the JSON does not have the manifest shape
    /// or the name is empty.
    pub fn from_json(package: &str, content: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(content)
            .map_err(|e| Error::manifest_invalid(package, e.to_string()))?;
        if manifest.name.trim().is_empty() {
            return Err(Error::manifest_invalid(package, "name cannot be empty"));
        }
        Ok(manifest)
    }
}

/// A discovered manifest together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRecord {
    /// Package specifier the manifest was read from
    pub source_package: String,
    /// Installed package directory; `None` for built-in commands
    pub directory: Option<PathBuf>,
    pub manifest: Manifest,
}

impl PluginRecord {
    /// Package name reported for commands compiled into the binary.
    pub const BUILTIN_PACKAGE: &'static str = "kg";

    /// A record for a command compiled into the binary.
    #[must_use]
    pub fn builtin(name: impl Into<String>, command_entry_point: impl Into<String>) -> Self {
        Self {
            source_package: Self::BUILTIN_PACKAGE.to_string(),
            directory: None,
            manifest: Manifest {
                name: name.into(),
                command_entry_point: Some(command_entry_point.into()),
                blueprints: None,
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.directory.is_none() && self.source_package == Self::BUILTIN_PACKAGE
    }
}

/// Reads the manifest of one package.
///
/// Implementations must be free of side effects: discovery abandons reads
/// that are still in flight once it has what it needs.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// # Errors
    ///
    /// `ManifestNotFound` when the package or its manifest cannot be
    /// resolved, `ManifestInvalid` when the manifest cannot be parsed.
    async fn read(&self, specifier: &str) -> Result<PluginRecord>;
}

/// Resolves packages through `node_modules` directories on disk.
#[derive(Debug, Clone)]
pub struct FsManifestSource {
    root: PathBuf,
    manifest_file: String,
}

impl FsManifestSource {
    pub fn new(root: impl Into<PathBuf>, manifest_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            manifest_file: manifest_file.into(),
        }
    }
}

#[async_trait]
impl ManifestSource for FsManifestSource {
    async fn read(&self, specifier: &str) -> Result<PluginRecord> {
        let directory = resolve_package_dir(&self.root, specifier)
            .await
            .ok_or_else(|| Error::ManifestNotFound(specifier.to_string()))?;
        let path = directory.join(&self.manifest_file);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ManifestNotFound(specifier.to_string()))
            }
            Err(e) => {
                return Err(Error::io_error(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        Ok(PluginRecord {
            source_package: specifier.to_string(),
            manifest: Manifest::from_json(specifier, &content)?,
            directory: Some(directory),
        })
    }
}

/// Strip registry prefixes and version ranges from an import specifier.
///
/// `npm:@scope/pkg@^1.2` → `@scope/pkg`, `left-pad@1` → `left-pad`.
#[must_use]
pub fn package_name(specifier: &str) -> &str {
    let bare = specifier.strip_prefix("npm:").unwrap_or(specifier);
    match bare.rfind('@') {
        Some(index) if index > 0 => &bare[..index],
        _ => bare,
    }
}

/// Find the installed directory of a package, Node style: the first
/// `node_modules/<name>` found walking up from `from`.
pub async fn resolve_package_dir(from: &Path, specifier: &str) -> Option<PathBuf> {
    let name = package_name(specifier);
    let relative = Path::new(name);
    let safe = !name.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return None;
    }

    for dir in from.ancestors() {
        let candidate = dir.join("node_modules").join(relative);
        if tokio::fs::metadata(&candidate)
            .await
            .is_ok_and(|m| m.is_dir())
        {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_with_blueprints() -> Result<()> {
        let manifest = Manifest::from_json(
            "@kg/build",
            r#"{
                "name": "build",
                "commandEntryPoint": "build::Command",
                "blueprints": {
                    "resolverEntryPoint": "build::Resolver",
                    "packages": { "library": "blueprints/library" }
                }
            }"#,
        )?;

        assert_eq!(manifest.name, "build");
        assert_eq!(manifest.command_entry_point.as_deref(), Some("build::Command"));
        let blueprints = manifest.blueprints.unwrap_or_else(|| panic!("blueprints expected"));
        assert_eq!(
            blueprints.registrations.get("library").map(String::as_str),
            Some("blueprints/library")
        );
        Ok(())
    }

    #[test]
    fn test_registrations_alias_accepted() -> Result<()> {
        let manifest = Manifest::from_json(
            "p",
            r#"{"name":"p","blueprints":{"resolverEntryPoint":"r","registrations":{"app":"a"}}}"#,
        )?;
        assert!(manifest
            .blueprints
            .is_some_and(|b| b.registrations.contains_key("app")));
        Ok(())
    }

    #[test]
    fn test_missing_name_is_invalid() {
        let result = Manifest::from_json("p", r#"{"commandEntryPoint":"x"}"#);
        assert!(matches!(result, Err(Error::ManifestInvalid { .. })));

        let result = Manifest::from_json("p", r#"{"name":"  "}"#);
        assert!(matches!(result, Err(Error::ManifestInvalid { .. })));
    }

    #[test]
    fn test_package_name_strips_prefix_and_version() {
        assert_eq!(package_name("npm:@scope/pkg@^1.2"), "@scope/pkg");
        assert_eq!(package_name("@scope/pkg"), "@scope/pkg");
        assert_eq!(package_name("left-pad@1.0.0"), "left-pad");
        assert_eq!(package_name("left-pad"), "left-pad");
    }

    #[tokio::test]
    async fn test_fs_source_reads_installed_manifest() -> Result<()> {
        let root = tempfile::tempdir().map_err(|e| Error::io_error(e.to_string()))?;
        let pkg = root.path().join("node_modules").join("@kg").join("lint");
        std::fs::create_dir_all(&pkg)?;
        std::fs::write(pkg.join("kg.json"), r#"{"name":"lint","commandEntryPoint":"lint"}"#)?;

        let nested = root.path().join("apps").join("web");
        std::fs::create_dir_all(&nested)?;
        let source = FsManifestSource::new(&nested, "kg.json");

        let record = source.read("@kg/lint").await?;
        assert_eq!(record.name(), "lint");
        assert_eq!(record.directory.as_deref(), Some(pkg.as_path()));
        Ok(())
    }

    #[tokio::test]
    async fn test_fs_source_missing_manifest() -> Result<()> {
        let root = tempfile::tempdir().map_err(|e| Error::io_error(e.to_string()))?;
        std::fs::create_dir_all(root.path().join("node_modules").join("plain"))?;
        let source = FsManifestSource::new(root.path(), "kg.json");

        let plain = source.read("plain").await;
        assert!(matches!(plain, Err(Error::ManifestNotFound(_))));

        let absent = source.read("absent").await;
        assert!(matches!(absent, Err(Error::ManifestNotFound(_))));

        let escape = source.read("../outside").await;
        assert!(matches!(escape, Err(Error::ManifestNotFound(_))));
        Ok(())
    }
}
