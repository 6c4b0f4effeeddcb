//! The built-in `kg::copy` blueprint resolver
//!
//! Copies the template directory into the destination. `__name__` in file
//! and directory names and `{{name}}` in UTF-8 file contents are replaced by
//! the name being created.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kg_core::{BlueprintRequest, BlueprintResolver, Error, Result};
use walkdir::WalkDir;

const NAME_IN_PATH: &str = "__name__";
const NAME_IN_CONTENT: &str = "{{name}}";

pub struct CopyResolver;

#[async_trait]
impl BlueprintResolver for CopyResolver {
    async fn resolve(&self, request: &BlueprintRequest<'_>) -> Result<()> {
        let template = request.template_directory;
        if !template.is_dir() {
            return Err(Error::io_error(format!(
                "Blueprint '{}' template is not a directory: {}",
                request.blueprint,
                template.display()
            )));
        }

        let entries = WalkDir::new(template)
            .sort_by_file_name()
            .into_iter()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::io_error(format!("Failed to walk {}: {e}", template.display())))?;

        for entry in entries {
            let target = destination_path(template, entry.path(), request.destination, request.name)?;
            if entry.file_type().is_dir() {
                tokio::fs::create_dir_all(&target).await?;
            } else if entry.file_type().is_file() {
                copy_file(entry.path(), &target, request.name).await?;
            }
        }

        tracing::debug!(
            blueprint = request.blueprint,
            destination = %request.destination.display(),
            "Copied blueprint template"
        );
        Ok(())
    }
}

fn destination_path(template: &Path, source: &Path, destination: &Path, name: &str) -> Result<PathBuf> {
    let relative = source
        .strip_prefix(template)
        .map_err(|e| Error::io_error(format!("{}: {e}", source.display())))?;
    let renamed = relative.to_string_lossy().replace(NAME_IN_PATH, name);
    Ok(destination.join(renamed))
}

async fn copy_file(source: &Path, target: &Path, name: &str) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = tokio::fs::read(source).await?;
    let content = match String::from_utf8(bytes) {
        Ok(text) => text.replace(NAME_IN_CONTENT, name).into_bytes(),
        Err(binary) => binary.into_bytes(),
    };
    tokio::fs::write(target, content).await?;
    Ok(())
}
