//! Plugin interfaces
//!
//! Plugins are not loaded by reflection. Every entry point named in a
//! manifest must be registered in a [`PluginFactories`] table compiled into
//! the binary, under the capability it provides.

mod blueprint;
mod factory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

pub use blueprint::{find_blueprint, BlueprintMatch, BlueprintRequest, BlueprintResolver};
pub use factory::{Capability, CommandFactory, PluginFactories, ResolverFactory};

use crate::config::{resolve_configuration, ConfigurationDescriptor};
use crate::dispatch::Dispatcher;
use crate::grammar::{BoundParameters, CommandGrammar};
use crate::project::{PackageHandle, ProjectHandle};
use crate::settings::Settings;
use crate::{Error, Result};

/// A runnable command.
#[async_trait]
pub trait Command: Send + Sync {
    /// The command line shape this command accepts.
    fn grammar(&self) -> &CommandGrammar;

    /// Per-package configuration, if the command has any.
    fn configuration(&self) -> Option<&ConfigurationDescriptor> {
        None
    }

    /// Run once, for one package or without a package context.
    ///
    /// # Errors
    ///
    /// Any error is recorded against the current package. `Error::Aborted`
    /// additionally stops the remaining packages from running.
    async fn run(&self, ctx: &RunContext<'_>) -> Result<()>;
}

/// Everything a command can see while it runs.
pub struct RunContext<'a> {
    /// Name the command was discovered under
    pub command: &'a str,
    pub project: &'a ProjectHandle,
    /// The target package; `None` unless `--all` or `--package` was given
    pub package: Option<&'a PackageHandle>,
    pub parameters: &'a BoundParameters,
    pub configuration: Option<&'a ConfigurationDescriptor>,
    /// For commands that discover or instantiate other plugins
    pub dispatcher: &'a Dispatcher,
}

impl RunContext<'_> {
    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.dispatcher.context().settings()
    }

    /// The command's configuration for the current package.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the command declares none and
    /// `InvalidConfiguration` if the stored value has the wrong shape.
    pub fn configuration<T: DeserializeOwned>(&self) -> Result<T> {
        let descriptor = self
            .configuration
            .ok_or_else(|| Error::ConfigurationMissing(self.command.to_string()))?;
        resolve_configuration(self.package, descriptor)
    }
}
