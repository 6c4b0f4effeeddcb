//! Member packages of a project

use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::settings::Settings;
use crate::{Error, Result};

/// Version reported for packages whose manifest declares none.
const DEFAULT_VERSION: &str = "0.0.0";

/// One member package and its raw `package.json`.
///
/// The raw manifest is kept verbatim so it can be written back without
/// losing fields kg does not know about.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageHandle {
    pub id: String,
    pub name: String,
    pub directory: PathBuf,
    pub version: String,
    pub raw_manifest: Value,
    manifest_path: PathBuf,
}

impl PackageHandle {
    /// Build a handle from a parsed manifest. Returns `None` for unnamed
    /// manifests.
    #[must_use]
    pub fn from_manifest(manifest_path: impl Into<PathBuf>, raw_manifest: Value) -> Option<Self> {
        let manifest_path = manifest_path.into();
        let name = raw_manifest
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())?
            .to_string();
        let version = raw_manifest
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_VERSION)
            .to_string();
        let directory = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Some(Self {
            id: package_id(&name),
            name,
            directory,
            version,
            raw_manifest,
            manifest_path,
        })
    }

    /// Read and parse a package manifest. `Ok(None)` for unnamed manifests.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `Json` if it is not valid JSON.
    pub fn load(manifest_path: &Path) -> Result<Option<Self>> {
        let content = std::fs::read_to_string(manifest_path).map_err(|e| {
            Error::io_error(format!("Failed to read {}: {e}", manifest_path.display()))
        })?;
        let raw: Value = serde_json::from_str(&content)
            .map_err(|e| Error::Json(format!("Failed to parse {}: {e}", manifest_path.display())))?;
        Ok(Self::from_manifest(manifest_path, raw))
    }

    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Stored configuration under `kg.config[name]`.
    #[must_use]
    pub fn stored_configuration(&self, name: &str) -> Option<&Value> {
        self.raw_manifest
            .get("kg")
            .and_then(|kg| kg.get("config"))
            .and_then(|config| config.get(name))
    }

    /// Mutable slot for `kg.config[name]`, created (as `null`) when absent.
    pub fn stored_configuration_mut(&mut self, name: &str) -> &mut Value {
        let kg = object_field(&mut self.raw_manifest, "kg");
        let config = object_field(kg, "config");
        object_field(config, name)
    }

    /// Write the raw manifest back as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be written.
    pub async fn save(&self) -> Result<()> {
        let mut content = serde_json::to_string_pretty(&self.raw_manifest)?;
        content.push('\n');
        tokio::fs::write(&self.manifest_path, content)
            .await
            .map_err(|e| {
                Error::io_error(format!(
                    "Failed to write {}: {e}",
                    self.manifest_path.display()
                ))
            })?;
        tracing::debug!(package = %self.id, path = %self.manifest_path.display(), "Saved package manifest");
        Ok(())
    }
}

/// Make `value` an object (replacing anything else) and return its `key`
/// field, inserting `null` when missing.
fn object_field<'a>(value: &'a mut Value, key: &str) -> &'a mut Value {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    &mut value[key]
}

/// Derive a package id from its declared name.
///
/// `@scope/my-cool_lib` → `Scope.My_Cool_Lib`, `utils` → `Utils`.
#[must_use]
pub fn package_id(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let bare = lowered.strip_prefix('@').unwrap_or(&lowered);
    let mut segments = bare
        .split(['/', '-', '_', '.'])
        .filter(|segment| !segment.is_empty())
        .map(capitalize);

    let Some(namespace) = segments.next() else {
        return String::new();
    };
    let rest = segments.join("_");
    if rest.is_empty() {
        namespace
    } else {
        format!("{namespace}.{rest}")
    }
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// Find the member packages beneath `root`, sorted by id.
///
/// The root's own manifest, unnamed manifests and ignored directories are
/// skipped. Manifests that fail to parse are logged and skipped.
#[must_use]
pub fn list_member_packages(root: &Path, settings: &Settings) -> Vec<PackageHandle> {
    let root_manifest = root.join(&settings.package_manifest);

    WalkDir::new(root)
        .max_depth(settings.member_search_depth.saturating_add(1))
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !settings.is_ignored(&entry.file_name().to_string_lossy())
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!("Skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.file_name() == settings.package_manifest.as_str()
                && entry.path() != root_manifest
        })
        .filter_map(|entry| match PackageHandle::load(entry.path()) {
            Ok(Some(package)) => Some(package),
            Ok(None) => {
                tracing::debug!(path = %entry.path().display(), "Skipping unnamed package");
                None
            }
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), "Skipping package: {err}");
                None
            }
        })
        .sorted_by(|a, b| a.id.cmp(&b.id).then_with(|| a.directory.cmp(&b.directory)))
        .collect()
}

/// Resolve a `--package` selector against the member packages: by id
/// (case-insensitive), then declared name, then directory name.
///
/// # Errors
///
/// Returns `PackageNotFound` when nothing matches.
pub fn find_package<'a>(packages: &'a [PackageHandle], selector: &str) -> Result<&'a PackageHandle> {
    packages
        .iter()
        .find(|p| p.id.eq_ignore_ascii_case(selector))
        .or_else(|| packages.iter().find(|p| p.name == selector))
        .or_else(|| {
            packages
                .iter()
                .find(|p| p.directory.file_name().is_some_and(|n| n == selector))
        })
        .ok_or_else(|| Error::PackageNotFound(selector.to_string()))
}
