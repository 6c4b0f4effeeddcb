//! Command dispatch
//!
//! One invocation runs through these phases, each transition logged at debug
//! level:
//!
//! ```text
//! Idle → Discovering → Matching → Binding → Resolving → Running → Done
//!                                                               ↘ Failed
//! ```
//!
//! Discovery stops at the first manifest named like argv's first token. The
//! matched command is instantiated fresh, bound against its grammar, then run
//! once per target package, sequentially.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::RunFailure;
use crate::grammar::{BoundParameters, PACKAGE};
use crate::manifest::{FsManifestSource, ManifestSource, PluginRecord};
use crate::plugin::{BlueprintResolver, Command, PluginFactories, RunContext};
use crate::project::{find_package, PackageHandle, ProjectHandle};
use crate::registry::{PluginMap, PluginRegistry};
use crate::settings::{load_settings, Settings};
use crate::{Error, Result};

/// Explicit invocation context: where kg was started and with which settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    working_directory: PathBuf,
    settings: Settings,
}

impl Context {
    pub fn new(working_directory: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            working_directory: working_directory.into(),
            settings,
        }
    }

    /// Load layered settings for `working_directory`.
    ///
    /// # Errors
    ///
    /// Returns `Settings` if a settings file or environment override is invalid.
    pub fn load(
        working_directory: impl Into<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let working_directory = working_directory.into();
        let settings = load_settings(&working_directory, env)?;
        Ok(Self::new(working_directory, settings))
    }

    #[must_use]
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

/// Phase of a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Idle,
    Discovering,
    Matching,
    Binding,
    Resolving,
    Running,
    Done,
    Failed,
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct PhaseLog(DispatchPhase);

impl PhaseLog {
    fn enter(&mut self, next: DispatchPhase) {
        tracing::debug!(from = %self.0, to = %next, "Dispatch phase");
        self.0 = next;
    }
}

/// What a successful dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub command: String,
    /// Ids of the packages the command ran against; empty when it ran
    /// without a package context
    pub packages: Vec<String>,
}

/// Locates, instantiates and runs commands.
pub struct Dispatcher {
    context: Context,
    factories: Arc<PluginFactories>,
    source: Option<Arc<dyn ManifestSource>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("context", &self.context)
            .field("factories", &self.factories)
            .field("custom_source", &self.source.is_some())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(context: Context, factories: PluginFactories) -> Self {
        Self {
            context,
            factories: Arc::new(factories),
            source: None,
        }
    }

    /// Read manifests from `source` instead of `node_modules` on disk.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn ManifestSource>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    #[must_use]
    pub fn factories(&self) -> &PluginFactories {
        &self.factories
    }

    /// Locate the project for the working directory.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the working directory does not exist.
    pub async fn project(&self) -> Result<ProjectHandle> {
        ProjectHandle::resolve(
            self.context.working_directory.clone(),
            self.context.settings.clone(),
        )
        .await
    }

    /// Discover the plugins of `project`, built-ins included.
    ///
    /// # Errors
    ///
    /// Returns error if the root package manifest cannot be read.
    pub async fn discover(
        &self,
        project: &ProjectHandle,
        early_exit: Option<&str>,
    ) -> Result<PluginMap> {
        let settings = &self.context.settings;
        let source: Arc<dyn ManifestSource> = match &self.source {
            Some(source) => Arc::clone(source),
            None => Arc::new(FsManifestSource::new(
                project.root_directory(),
                settings.manifest_file.clone(),
            )),
        };
        PluginRegistry::new(source, settings.discovery_concurrency)
            .with_builtins(self.factories.builtins().iter().cloned())
            .discover(project.root_directory(), &settings.package_manifest, early_exit)
            .await
    }

    /// # Errors
    ///
    /// See [`PluginFactories::instantiate`].
    pub fn instantiate(&self, record: &PluginRecord) -> Result<Box<dyn Command>> {
        self.factories.instantiate(record)
    }

    /// # Errors
    ///
    /// See [`PluginFactories::instantiate_blueprint_resolver`].
    pub fn instantiate_blueprint_resolver(
        &self,
        record: &PluginRecord,
    ) -> Result<Box<dyn BlueprintResolver>> {
        self.factories.instantiate_blueprint_resolver(record)
    }

    /// Run the command addressed by `argv`.
    ///
    /// # Errors
    ///
    /// - `CommandNotFound` if argv is empty or no plugin has that name
    /// - `NoEntryPoint` / `InstantiationFailed` from instantiation
    /// - binding errors from the command's grammar
    /// - `PackageNotFound` for an unknown `--package`
    /// - the command's own error when it ran once, `RunFailed` when it ran
    ///   for several packages and some failed, `Aborted` when a run aborted
    pub async fn dispatch<S: AsRef<str> + Sync>(&self, argv: &[S]) -> Result<DispatchReport> {
        let mut phase = PhaseLog(DispatchPhase::Idle);
        let result = self.dispatch_phases(argv, &mut phase).await;
        match &result {
            Ok(_) => phase.enter(DispatchPhase::Done),
            Err(err) => {
                tracing::debug!(failed_in = %phase.0, "Dispatch failed: {err}");
                phase.enter(DispatchPhase::Failed);
            }
        }
        result
    }

    async fn dispatch_phases<S: AsRef<str> + Sync>(
        &self,
        argv: &[S],
        phase: &mut PhaseLog,
    ) -> Result<DispatchReport> {
        let name = argv
            .first()
            .map(AsRef::<str>::as_ref)
            .ok_or_else(|| Error::CommandNotFound(String::new()))?;

        phase.enter(DispatchPhase::Discovering);
        let project = self.project().await?;
        let plugins = self.discover(&project, Some(name)).await?;

        phase.enter(DispatchPhase::Matching);
        let record = plugins
            .get(name)
            .ok_or_else(|| Error::CommandNotFound(name.to_string()))?;

        phase.enter(DispatchPhase::Binding);
        let command = self.instantiate(record)?;
        let parameters = command.grammar().bind(argv)?;

        phase.enter(DispatchPhase::Resolving);
        let packages = project.member_packages(&self.context.settings).await?;
        let targets = select_targets(&packages, &parameters)?;

        phase.enter(DispatchPhase::Running);
        let ran = self
            .run_targets(name, command.as_ref(), &project, &parameters, targets)
            .await?;

        Ok(DispatchReport {
            command: name.to_string(),
            packages: ran,
        })
    }

    async fn run_targets(
        &self,
        name: &str,
        command: &dyn Command,
        project: &ProjectHandle,
        parameters: &BoundParameters,
        targets: Option<Vec<&PackageHandle>>,
    ) -> Result<Vec<String>> {
        let base = RunContext {
            command: name,
            project,
            package: None,
            parameters,
            configuration: command.configuration(),
            dispatcher: self,
        };

        let Some(targets) = targets else {
            command.run(&base).await?;
            return Ok(Vec::new());
        };

        if let [package] = targets.as_slice() {
            let ctx = RunContext {
                package: Some(*package),
                ..base
            };
            command.run(&ctx).await?;
            return Ok(vec![package.id.clone()]);
        }

        if targets.is_empty() {
            tracing::warn!(command = name, "No member packages to run against");
        }

        let mut ran = Vec::with_capacity(targets.len());
        let mut failures = Vec::new();
        for package in targets {
            tracing::debug!(command = name, package = %package.id, "Running command");
            let ctx = RunContext {
                package: Some(package),
                ..base
            };
            match command.run(&ctx).await {
                Ok(()) => ran.push(package.id.clone()),
                Err(err) if err.is_fatal() => {
                    if !failures.is_empty() {
                        tracing::warn!(
                            failed = failures.len(),
                            "Run aborted after earlier failures"
                        );
                    }
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(package = %package.id, "Command failed: {err}");
                    failures.push(RunFailure {
                        package: Some(package.id.clone()),
                        message: err.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(ran)
        } else {
            Err(Error::RunFailed(failures))
        }
    }
}

/// `--all` selects every member and takes precedence over `--package`.
/// Neither means no package context.
fn select_targets<'a>(
    packages: &'a [PackageHandle],
    parameters: &BoundParameters,
) -> Result<Option<Vec<&'a PackageHandle>>> {
    if parameters.all_packages() {
        return Ok(Some(packages.iter().collect()));
    }
    match parameters.package() {
        Some(selector) => Ok(Some(vec![find_package(packages, selector)?])),
        None if parameters.contains(PACKAGE) => Err(Error::PackageNotFound(String::new())),
        None => Ok(None),
    }
}
