//! `kg packages [--json]` - list member packages

use std::path::Path;

use async_trait::async_trait;
use kg_core::{Command, CommandGrammar, PackageHandle, Result, RunContext};
use serde::Serialize;

pub struct PackagesCommand {
    grammar: CommandGrammar,
}

impl PackagesCommand {
    pub fn new() -> Result<Self> {
        Ok(Self {
            grammar: CommandGrammar::parse("packages [--json]")?,
        })
    }
}

#[derive(Debug, Serialize)]
struct PackageRow {
    id: String,
    name: String,
    version: String,
    directory: String,
}

impl PackageRow {
    fn new(package: &PackageHandle, root: &Path) -> Self {
        let directory = package
            .directory
            .strip_prefix(root)
            .unwrap_or(&package.directory)
            .display()
            .to_string();
        Self {
            id: package.id.clone(),
            name: package.name.clone(),
            version: package.version.clone(),
            directory,
        }
    }
}

#[async_trait]
impl Command for PackagesCommand {
    fn grammar(&self) -> &CommandGrammar {
        &self.grammar
    }

    async fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        let root = ctx.project.root_directory();
        let rows: Vec<PackageRow> = match ctx.package {
            Some(package) => vec![PackageRow::new(package, root)],
            None => ctx
                .project
                .member_packages(ctx.settings())
                .await?
                .iter()
                .map(|package| PackageRow::new(package, root))
                .collect(),
        };

        if ctx.parameters.contains("json") {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        if rows.is_empty() {
            println!("No packages found under {}", root.display());
            return Ok(());
        }

        let width = rows.iter().map(|row| row.id.len()).max().unwrap_or(0);
        for row in &rows {
            println!("{:<width$}  {:<10}  {}", row.id, row.version, row.directory);
        }
        Ok(())
    }
}
