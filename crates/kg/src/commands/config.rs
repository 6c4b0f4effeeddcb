//! `kg config <command> [key] [--set=value]` - show or change a command's
//! per-package configuration

use async_trait::async_trait;
use kg_core::{
    persist_configuration, resolve_configuration, Command, CommandGrammar, Error, Result,
    RunContext,
};
use serde_json::{Map, Value};

pub struct ConfigCommand {
    grammar: CommandGrammar,
}

impl ConfigCommand {
    pub fn new() -> Result<Self> {
        Ok(Self {
            grammar: CommandGrammar::parse("config <command> [key] [--set]")?,
        })
    }
}

#[async_trait]
impl Command for ConfigCommand {
    fn grammar(&self) -> &CommandGrammar {
        &self.grammar
    }

    async fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        let target = ctx
            .parameters
            .get("command")
            .ok_or_else(|| Error::MissingRequiredParameter("command".to_string()))?;
        let key = ctx.parameters.get("key");

        let plugins = ctx.dispatcher.discover(ctx.project, Some(target)).await?;
        let record = plugins
            .get(target)
            .ok_or_else(|| Error::CommandNotFound(target.to_string()))?;
        let command = ctx.dispatcher.instantiate(record)?;
        let descriptor = command
            .configuration()
            .ok_or_else(|| Error::ConfigurationMissing(target.to_string()))?;

        if ctx.parameters.contains("set") {
            let raw = ctx
                .parameters
                .get("set")
                .ok_or_else(|| Error::MissingRequiredParameter("set".to_string()))?;
            let key = key.ok_or_else(|| Error::MissingRequiredParameter("key".to_string()))?;
            let package = ctx
                .package
                .ok_or_else(|| Error::PackageRequired("config --set".to_string()))?;

            let mut package = package.clone();
            persist_configuration(&mut package, descriptor, &nest(key, parse_value(raw))).await?;
            println!("{}: set {target}.{key} = {raw}", package.id);
            return Ok(());
        }

        let resolved: Value = resolve_configuration(ctx.package, descriptor)?;
        let shown = match key {
            Some(key) => lookup(&resolved, key)
                .ok_or_else(|| Error::UnknownParameter(key.to_string()))?,
            None => &resolved,
        };

        if let Some(package) = ctx.package {
            println!("# {}", package.id);
        }
        println!("{}", serde_json::to_string_pretty(shown)?);
        Ok(())
    }
}

/// JSON when the text parses as JSON, a plain string otherwise.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Wrap `value` in objects along a dotted key: `a.b` → `{"a":{"b":value}}`.
fn nest(key: &str, value: Value) -> Value {
    key.rsplit('.').fold(value, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}

fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(value, |node, segment| node.get(segment))
}
