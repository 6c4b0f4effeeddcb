//! Project model
//!
//! A project is the directory tree under a workspace root. The root is the
//! directory whose `package.json` carries `"kg": { "root": true }`; member
//! packages are the named `package.json` files beneath it.

mod package;

use std::path::{Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

pub use package::{find_package, list_member_packages, package_id, PackageHandle};

use crate::settings::{RootSearch, Settings};
use crate::{Error, Result};

/// The located workspace root for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectHandle {
    root_directory: PathBuf,
}

impl ProjectHandle {
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root_directory.into(),
        }
    }

    /// Locate the project containing (or contained in) `start`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if `start` is not a directory.
    pub fn locate(start: &Path, settings: &Settings) -> Result<Self> {
        if !start.is_dir() {
            return Err(Error::io_error(format!(
                "Not a directory: {}",
                start.display()
            )));
        }
        Ok(Self::new(find_root(start, settings.root_search, settings)))
    }

    /// [`Self::locate`] run on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns `Io` if `start` is not a directory or the search task fails.
    pub async fn resolve(start: PathBuf, settings: Settings) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::locate(&start, &settings))
            .await
            .map_err(|e| Error::io_error(format!("Failed to join root search task: {e}")))?
    }

    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Member packages beneath the root, sorted by id.
    #[must_use]
    pub fn packages(&self, settings: &Settings) -> Vec<PackageHandle> {
        list_member_packages(&self.root_directory, settings)
    }

    /// [`Self::packages`] run on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the search task fails.
    pub async fn member_packages(&self, settings: &Settings) -> Result<Vec<PackageHandle>> {
        let root = self.root_directory.clone();
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || list_member_packages(&root, &settings))
            .await
            .map_err(|e| Error::io_error(format!("Failed to join member search task: {e}")))
    }
}

/// Find the workspace root for `start`.
///
/// Every directory holding a root-marked package manifest is a candidate and
/// the deepest one wins. Falls back to `start` when nothing is marked.
#[must_use]
pub fn find_root(start: &Path, mode: RootSearch, settings: &Settings) -> PathBuf {
    let found = match mode {
        RootSearch::Outward => start
            .ancestors()
            .find(|dir| is_root_marked(&dir.join(&settings.package_manifest)))
            .map(Path::to_path_buf),
        RootSearch::Inward => WalkDir::new(start)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !settings.is_ignored(&entry.file_name().to_string_lossy())
            })
            .filter_map(std::result::Result::ok)
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry.file_name() == settings.package_manifest.as_str()
                    && is_root_marked(entry.path())
            })
            .filter_map(|entry| entry.path().parent().map(Path::to_path_buf))
            .fold(None, |deepest: Option<PathBuf>, dir| match deepest {
                Some(current) if current.components().count() >= dir.components().count() => {
                    Some(current)
                }
                _ => Some(dir),
            }),
    };

    match found {
        Some(root) => {
            tracing::debug!(root = %root.display(), "Located workspace root");
            root
        }
        None => {
            tracing::debug!(start = %start.display(), "No root marker, using start directory");
            start.to_path_buf()
        }
    }
}

fn is_root_marked(manifest_path: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(manifest_path) else {
        return false;
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(manifest) => manifest.pointer("/kg/root").and_then(Value::as_bool) == Some(true),
        Err(err) => {
            tracing::debug!(path = %manifest_path.display(), "Unparsable package manifest: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    #[test]
    fn test_outward_finds_nearest_marked_ancestor() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| Error::io_error(e.to_string()))?;
        let root = dir.path().join("repo");
        write(&root.join("package.json"), r#"{"kg":{"root":true}}"#)?;
        let start = root.join("apps").join("web");
        std::fs::create_dir_all(&start)?;

        let found = find_root(&start, RootSearch::Outward, &Settings::default());
        assert_eq!(found, root);
        Ok(())
    }

    #[test]
    fn test_unmarked_falls_back_to_start() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| Error::io_error(e.to_string()))?;
        write(&dir.path().join("package.json"), r#"{"name":"x","kg":{"root":false}}"#)?;

        let found = find_root(dir.path(), RootSearch::Inward, &Settings::default());
        assert_eq!(found, dir.path());
        Ok(())
    }

    #[test]
    fn test_inward_deepest_wins_and_skips_ignored() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| Error::io_error(e.to_string()))?;
        write(&dir.path().join("a/package.json"), r#"{"kg":{"root":true}}"#)?;
        write(&dir.path().join("a/b/package.json"), r#"{"kg":{"root":true}}"#)?;
        write(
            &dir.path().join("node_modules/x/y/z/package.json"),
            r#"{"kg":{"root":true}}"#,
        )?;

        let found = find_root(dir.path(), RootSearch::Inward, &Settings::default());
        assert_eq!(found, dir.path().join("a").join("b"));
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_and_member_packages_off_runtime() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| Error::io_error(e.to_string()))?;
        let root = dir.path().to_path_buf();
        write(&root.join("package.json"), r#"{"name":"root","kg":{"root":true}}"#)?;
        write(&root.join("libs/ui/package.json"), r#"{"name":"@acme/ui"}"#)?;
        let start = root.join("libs").join("ui");

        let project = ProjectHandle::resolve(start, Settings::default()).await?;
        let packages = project.member_packages(&Settings::default()).await?;

        assert_eq!(project.root_directory(), root);
        assert_eq!(packages, project.packages(&Settings::default()));
        assert_eq!(packages.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_rejects_missing_directory() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| Error::io_error(e.to_string()))?;
        let result = ProjectHandle::resolve(dir.path().join("nope"), Settings::default()).await;
        assert!(matches!(result, Err(Error::Io(_))));
        Ok(())
    }

    #[test]
    fn test_locate_rejects_missing_directory() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| Error::io_error(e.to_string()))?;
        let result = ProjectHandle::locate(&dir.path().join("nope"), &Settings::default());
        assert!(matches!(result, Err(Error::Io(_))));
        Ok(())
    }
}
