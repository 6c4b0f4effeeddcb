use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::ArgMatches;
use kg_core::{Context, Dispatcher, RootSearch};

use crate::commands::builtin_factories;

/// Format an error with its cause, if the cause adds anything.
pub fn format_error(err: &anyhow::Error) -> String {
    let msg = err.to_string();
    if let Some(source) = err.source() {
        let source_msg = source.to_string();
        if !msg.contains(&source_msg) && !source_msg.is_empty() {
            return format!("{msg}\nCause: {source_msg}");
        }
    }
    msg
}

/// Build the context from the parsed command line and dispatch the command.
pub async fn run_cli(matches: &ArgMatches) -> Result<()> {
    let working_directory = match matches.get_one::<PathBuf>("directory") {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };

    let mut context = Context::load(working_directory, |key| std::env::var(key).ok())?;
    if let Some(mode) = matches.get_one::<String>("root-search") {
        context.settings_mut().root_search = mode
            .parse::<RootSearch>()
            .map_err(kg_core::Error::Settings)?;
    }

    let argv: Vec<String> = matches
        .get_many::<String>("command")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let dispatcher = Dispatcher::new(context, builtin_factories());
    let report = dispatcher.dispatch(&argv).await?;

    tracing::debug!(
        command = %report.command,
        packages = report.packages.len(),
        "Command finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_appends_new_cause() {
        let err = anyhow::Error::from(kg_core::Error::io_error("disk full")).context("Saving");
        assert_eq!(format_error(&err), "Saving\nCause: IO error: disk full");
    }

    #[test]
    fn test_format_error_plain() {
        let err = anyhow::Error::from(kg_core::Error::CommandNotFound("x".to_string()));
        assert_eq!(format_error(&err), "Command not found: 'x'");
    }
}
