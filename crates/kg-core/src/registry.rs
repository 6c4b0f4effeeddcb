//! Plugin discovery
//!
//! Candidates come from the root `package.json`: an explicit `kg.imports`
//! list when present, otherwise the installed dependency tree flattened into
//! a deduplicated list. Every candidate's manifest is read concurrently and
//! failures only drop that candidate.
//!
//! When two candidates declare the same manifest name, the one listed first
//! wins. Built-in records are listed before every candidate.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use itertools::Itertools;
use serde_json::{json, Map, Value};

use crate::manifest::{resolve_package_dir, ManifestSource, PluginRecord};
use crate::{Error, Result};

/// Discovered plugins keyed by manifest name.
pub type PluginMap = HashMap<String, PluginRecord>;

/// Concurrent manifest discovery over a [`ManifestSource`].
#[derive(Clone)]
pub struct PluginRegistry {
    source: Arc<dyn ManifestSource>,
    concurrency: usize,
    builtins: Vec<PluginRecord>,
}

impl PluginRegistry {
    pub fn new(source: Arc<dyn ManifestSource>, concurrency: usize) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
            builtins: Vec::new(),
        }
    }

    /// Seed records that are always present and win name collisions.
    #[must_use]
    pub fn with_builtins(mut self, builtins: impl IntoIterator<Item = PluginRecord>) -> Self {
        self.builtins.extend(builtins);
        self
    }

    /// Discover the plugins available to the project rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns error only if the root `package.json` exists but cannot be
    /// read or parsed; individual manifest failures are logged and skipped.
    pub async fn discover(
        &self,
        root: &Path,
        package_manifest: &str,
        early_exit: Option<&str>,
    ) -> Result<PluginMap> {
        if let Some(name) = early_exit {
            if let Some(record) = self.builtins.iter().find(|r| r.name() == name) {
                tracing::debug!(command = name, "Resolved built-in command");
                return Ok(HashMap::from([(name.to_string(), record.clone())]));
            }
        }

        let candidates = list_candidates(root, package_manifest).await?;
        Ok(self.discover_candidates(&candidates, early_exit).await)
    }

    /// Read every candidate's manifest, stopping early once `early_exit` is found.
    ///
    /// An early exit waits until every candidate listed before the match has
    /// settled, so collisions resolve the same way as in a full discovery.
    /// Reads still in flight at that point are dropped, not awaited.
    pub async fn discover_candidates(
        &self,
        candidates: &[String],
        early_exit: Option<&str>,
    ) -> PluginMap {
        let mut found: HashMap<String, (usize, PluginRecord)> = self
            .builtins
            .iter()
            .map(|record| (record.name().to_string(), (0, record.clone())))
            .collect();

        if let Some(name) = early_exit {
            if let Some((_, record)) = found.remove(name) {
                return HashMap::from([(name.to_string(), record)]);
            }
        }

        tracing::debug!(
            candidates = candidates.len(),
            concurrency = self.concurrency,
            "Discovering plugins"
        );

        let source = &self.source;
        let pending: Vec<_> = candidates
            .iter()
            .enumerate()
            .map(|(index, specifier)| async move {
                (index + 1, specifier, source.read(specifier).await)
            })
            .collect();
        let mut reads = futures::stream::iter(pending).buffer_unordered(self.concurrency);

        let mut settled = vec![false; candidates.len() + 1];
        let mut first_unsettled = 1;

        while let Some((order, specifier, result)) = reads.next().await {
            settled[order] = true;
            while settled.get(first_unsettled).copied().unwrap_or(false) {
                first_unsettled += 1;
            }

            match result {
                Ok(record) => insert_first_wins(&mut found, order, record),
                Err(Error::ManifestNotFound(_)) => {
                    tracing::trace!(package = %specifier, "No CLI manifest");
                }
                Err(err) => {
                    tracing::warn!(package = %specifier, "Skipping plugin: {err}");
                }
            }

            let ready = early_exit
                .and_then(|name| found.get(name))
                .is_some_and(|(winner, _)| *winner < first_unsettled);
            if ready {
                tracing::debug!(
                    command = early_exit.unwrap_or_default(),
                    "Found requested plugin, abandoning pending reads"
                );
                break;
            }
        }

        found
            .into_iter()
            .map(|(name, (_, record))| (name, record))
            .collect()
    }
}

fn insert_first_wins(
    found: &mut HashMap<String, (usize, PluginRecord)>,
    order: usize,
    record: PluginRecord,
) {
    let name = record.name().to_string();
    let keep_existing = match found.get(&name) {
        Some((existing, kept)) => {
            let keep = *existing <= order;
            let (kept, ignored) = if keep { (kept, &record) } else { (&record, kept) };
            tracing::warn!(
                command = %name,
                kept = %kept.source_package,
                ignored = %ignored.source_package,
                "Duplicate plugin name"
            );
            keep
        }
        None => false,
    };

    if !keep_existing {
        found.insert(name, (order, record));
    }
}

/// List candidate package specifiers for the project rooted at `root`.
///
/// # Errors
///
/// Returns error if the root manifest exists but is unreadable or invalid JSON.
pub async fn list_candidates(root: &Path, package_manifest: &str) -> Result<Vec<String>> {
    let manifest_path = root.join(package_manifest);
    let Some(manifest) = read_json(&manifest_path).await? else {
        return Ok(Vec::new());
    };

    if let Some(imports) = manifest.pointer("/kg/imports").and_then(Value::as_array) {
        return Ok(imports
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .unique()
            .collect());
    }

    let mut visited = HashSet::new();
    let mut dependencies = Map::new();
    for name in declared_dependencies(&manifest, true) {
        if visited.insert(name.clone()) {
            let subtree =
                installed_subtree(root.to_path_buf(), name.clone(), package_manifest, &mut visited)
                    .await;
            dependencies.insert(name, subtree);
        }
    }

    Ok(flatten_dependency_tree(&json!({ "dependencies": dependencies })))
}

/// Flatten an `npm ls --json` shaped tree into unique package names,
/// depth first, parents before children.
#[must_use]
pub fn flatten_dependency_tree(tree: &Value) -> Vec<String> {
    fn walk(node: &Value, out: &mut Vec<String>) {
        if let Some(dependencies) = node.get("dependencies").and_then(Value::as_object) {
            for (name, child) in dependencies {
                out.push(name.clone());
                walk(child, out);
            }
        }
    }

    let mut names = Vec::new();
    walk(tree, &mut names);
    names.into_iter().unique().collect()
}

/// Build the subtree of an installed package from its `package.json`,
/// resolving it from the directory of the package that depends on it.
fn installed_subtree<'a>(
    from: PathBuf,
    name: String,
    package_manifest: &'a str,
    visited: &'a mut HashSet<String>,
) -> BoxFuture<'a, Value> {
    async move {
        let Some(directory) = resolve_package_dir(&from, &name).await else {
            return json!({});
        };
        let manifest = match read_json(&directory.join(package_manifest)).await {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return json!({}),
            Err(err) => {
                tracing::debug!(package = %name, "Unreadable package manifest: {err}");
                return json!({});
            }
        };

        let mut dependencies = Map::new();
        for child in declared_dependencies(&manifest, false) {
            if visited.insert(child.clone()) {
                let subtree =
                    installed_subtree(directory.clone(), child.clone(), package_manifest, visited)
                        .await;
                dependencies.insert(child, subtree);
            }
        }
        json!({ "dependencies": dependencies })
    }
    .boxed()
}

fn declared_dependencies(manifest: &Value, include_dev: bool) -> Vec<String> {
    let sections: &[&str] = if include_dev {
        &["dependencies", "devDependencies"]
    } else {
        &["dependencies"]
    };
    sections
        .iter()
        .filter_map(|section| manifest.get(*section).and_then(Value::as_object))
        .flat_map(|deps| deps.keys().cloned())
        .unique()
        .collect()
}

async fn read_json(path: &Path) -> Result<Option<Value>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str(&content).map(Some).map_err(|e| {
            Error::Json(format!("Failed to parse {}: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io_error(format!(
            "Failed to read {}: {e}",
            path.display()
        ))),
    }
}
