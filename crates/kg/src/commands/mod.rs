//! Built-in commands
//!
//! Registered through the same factory table as third-party plugins, so they
//! are discovered, bound and run exactly like any other command.

pub mod config;
pub mod copy;
pub mod create;
pub mod packages;

use kg_core::{Command, PluginFactories};

pub const PACKAGES_ENTRY_POINT: &str = "kg::packages";
pub const CONFIG_ENTRY_POINT: &str = "kg::config";
pub const CREATE_ENTRY_POINT: &str = "kg::create";
/// Resolver entry point plugins may name to get plain template copying
pub const COPY_RESOLVER_ENTRY_POINT: &str = "kg::copy";

/// The factory table of the `kg` binary.
pub fn builtin_factories() -> PluginFactories {
    let mut factories = PluginFactories::new();
    factories
        .register_builtin_command("packages", PACKAGES_ENTRY_POINT, || {
            Ok(Box::new(packages::PackagesCommand::new()?) as Box<dyn Command>)
        })
        .register_builtin_command("config", CONFIG_ENTRY_POINT, || {
            Ok(Box::new(config::ConfigCommand::new()?) as Box<dyn Command>)
        })
        .register_builtin_command("create", CREATE_ENTRY_POINT, || {
            Ok(Box::new(create::CreateCommand::new()?) as Box<dyn Command>)
        })
        .register_blueprint_resolver(COPY_RESOLVER_ENTRY_POINT, || {
            Ok(Box::new(copy::CopyResolver) as Box<dyn kg_core::BlueprintResolver>)
        });
    factories
}

#[cfg(test)]
mod tests {
    use kg_core::Capability;

    use super::*;

    #[test]
    fn test_builtins_are_registered() {
        let factories = builtin_factories();
        let names: Vec<&str> = factories.builtins().iter().map(|r| r.name()).collect();
        assert_eq!(names, ["packages", "config", "create"]);
        assert!(factories.has_entry_point(Capability::BlueprintResolver, COPY_RESOLVER_ENTRY_POINT));
    }

    #[test]
    fn test_builtin_grammars_match_their_names() -> kg_core::Result<()> {
        let factories = builtin_factories();
        for record in factories.builtins() {
            let command = factories.instantiate(record)?;
            assert_eq!(command.grammar().root_token(), record.name());
        }
        Ok(())
    }
}
