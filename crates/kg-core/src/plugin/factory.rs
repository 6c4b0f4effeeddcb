//! Entry point factory table

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{BlueprintResolver, Command};
use crate::manifest::PluginRecord;
use crate::{Error, Result};

pub type CommandFactory = Arc<dyn Fn() -> Result<Box<dyn Command>> + Send + Sync>;
pub type ResolverFactory = Arc<dyn Fn() -> Result<Box<dyn BlueprintResolver>> + Send + Sync>;

/// What an entry point is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Command,
    BlueprintResolver,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::BlueprintResolver => f.write_str("blueprint resolver"),
        }
    }
}

/// Factories keyed by entry point, one table per capability.
#[derive(Clone, Default)]
pub struct PluginFactories {
    commands: HashMap<String, CommandFactory>,
    resolvers: HashMap<String, ResolverFactory>,
    builtins: Vec<PluginRecord>,
}

impl fmt::Debug for PluginFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginFactories")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .field("builtins", &self.builtins)
            .finish()
    }
}

impl PluginFactories {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for a command entry point.
    pub fn register_command<F>(&mut self, entry_point: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Box<dyn Command>> + Send + Sync + 'static,
    {
        self.commands.insert(entry_point.into(), Arc::new(factory));
        self
    }

    /// Register a command that needs no package to ship it: it is always
    /// discovered under `name` and wins collisions with installed plugins.
    pub fn register_builtin_command<F>(
        &mut self,
        name: impl Into<String>,
        entry_point: impl Into<String>,
        factory: F,
    ) -> &mut Self
    where
        F: Fn() -> Result<Box<dyn Command>> + Send + Sync + 'static,
    {
        let entry_point = entry_point.into();
        self.builtins
            .push(PluginRecord::builtin(name, entry_point.clone()));
        self.register_command(entry_point, factory)
    }

    /// Register the factory for a blueprint resolver entry point.
    pub fn register_blueprint_resolver<F>(
        &mut self,
        entry_point: impl Into<String>,
        factory: F,
    ) -> &mut Self
    where
        F: Fn() -> Result<Box<dyn BlueprintResolver>> + Send + Sync + 'static,
    {
        self.resolvers.insert(entry_point.into(), Arc::new(factory));
        self
    }

    #[must_use]
    pub fn builtins(&self) -> &[PluginRecord] {
        &self.builtins
    }

    #[must_use]
    pub fn has_entry_point(&self, capability: Capability, entry_point: &str) -> bool {
        match capability {
            Capability::Command => self.commands.contains_key(entry_point),
            Capability::BlueprintResolver => self.resolvers.contains_key(entry_point),
        }
    }

    /// Create a fresh command instance for `record`.
    ///
    /// # Errors
    ///
    /// `NoEntryPoint` if the manifest declares no command entry point,
    /// `InstantiationFailed` if no factory is registered or the factory fails.
    pub fn instantiate(&self, record: &PluginRecord) -> Result<Box<dyn Command>> {
        let entry_point = record
            .manifest
            .command_entry_point
            .as_deref()
            .ok_or_else(|| Error::NoEntryPoint(record.name().to_string()))?;
        let factory = self
            .commands
            .get(entry_point)
            .ok_or_else(|| unregistered(entry_point, Capability::Command, record))?;

        tracing::debug!(command = record.name(), entry_point, "Instantiating command");
        factory().map_err(|e| Error::instantiation_failed(entry_point, e.to_string()))
    }

    /// Create a fresh blueprint resolver for `record`.
    ///
    /// # Errors
    ///
    /// `NoEntryPoint` if the manifest registers no blueprints,
    /// `InstantiationFailed` if no factory is registered or the factory fails.
    pub fn instantiate_blueprint_resolver(
        &self,
        record: &PluginRecord,
    ) -> Result<Box<dyn BlueprintResolver>> {
        let entry_point = record
            .manifest
            .blueprints
            .as_ref()
            .map(|b| b.resolver_entry_point.as_str())
            .ok_or_else(|| Error::NoEntryPoint(record.name().to_string()))?;
        let factory = self
            .resolvers
            .get(entry_point)
            .ok_or_else(|| unregistered(entry_point, Capability::BlueprintResolver, record))?;

        tracing::debug!(plugin = record.name(), entry_point, "Instantiating blueprint resolver");
        factory().map_err(|e| Error::instantiation_failed(entry_point, e.to_string()))
    }
}

fn unregistered(entry_point: &str, capability: Capability, record: &PluginRecord) -> Error {
    Error::instantiation_failed(
        entry_point,
        format!(
            "no {capability} is registered for this entry point (declared by '{}')",
            record.source_package
        ),
    )
}
