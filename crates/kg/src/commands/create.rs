//! `kg create <blueprint> <name> [--into]` - materialise a blueprint
//!
//! The destination is `<root>/<into>/<name>`. Without `--into` the directory
//! comes from the `create` configuration (`{"into": "packages"}` by default).

use async_trait::async_trait;
use kg_core::{
    find_blueprint, BlueprintRequest, Command, CommandGrammar, ConfigurationDescriptor, Error,
    Result, RunContext,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateConfig {
    /// Directory, relative to the workspace root, new packages are created in
    pub into: String,
}

impl Default for CreateConfig {
    fn default() -> Self {
        Self {
            into: "packages".to_string(),
        }
    }
}

pub struct CreateCommand {
    grammar: CommandGrammar,
    configuration: ConfigurationDescriptor,
}

impl CreateCommand {
    pub fn new() -> Result<Self> {
        Ok(Self {
            grammar: CommandGrammar::parse("create <blueprint> <name> [--into|-i]")?,
            configuration: ConfigurationDescriptor::from_default::<CreateConfig>("create")?,
        })
    }
}

#[async_trait]
impl Command for CreateCommand {
    fn grammar(&self) -> &CommandGrammar {
        &self.grammar
    }

    fn configuration(&self) -> Option<&ConfigurationDescriptor> {
        Some(&self.configuration)
    }

    async fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        let blueprint = ctx
            .parameters
            .get("blueprint")
            .ok_or_else(|| Error::MissingRequiredParameter("blueprint".to_string()))?;
        let name = ctx
            .parameters
            .get("name")
            .ok_or_else(|| Error::MissingRequiredParameter("name".to_string()))?;
        let into = match ctx.parameters.get("into") {
            Some(into) => into.to_string(),
            None => ctx.configuration::<CreateConfig>()?.into,
        };

        let plugins = ctx.dispatcher.discover(ctx.project, None).await?;
        let found = find_blueprint(&plugins, blueprint)?;
        let resolver = ctx.dispatcher.instantiate_blueprint_resolver(found.record)?;

        let template_directory = found.template_directory();
        let destination = ctx.project.root_directory().join(&into).join(name);
        if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
            return Err(Error::io_error(format!(
                "Destination already exists: {}",
                destination.display()
            )));
        }

        tracing::debug!(
            blueprint,
            plugin = found.record.name(),
            template = %template_directory.display(),
            "Resolving blueprint"
        );
        resolver
            .resolve(&BlueprintRequest {
                blueprint,
                name,
                template_directory: &template_directory,
                destination: &destination,
                project: ctx.project,
                parameters: ctx.parameters,
            })
            .await?;

        println!("Created {name} from blueprint '{blueprint}' at {}", destination.display());
        Ok(())
    }
}
