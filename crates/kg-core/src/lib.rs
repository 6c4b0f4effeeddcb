//! kg-core - Plugin discovery, command binding and configuration for kg
//!
//! This crate provides:
//! - Manifest reading and concurrent plugin discovery
//! - Command grammars and argv binding
//! - The project model: workspace root, member packages, per-package configuration
//! - The plugin factory table and command dispatcher
//! - Tool settings loading

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod grammar;
pub mod manifest;
pub mod plugin;
pub mod project;
pub mod registry;
pub mod settings;

pub use config::{
    merge_defaults, overlay, persist_configuration, resolve_configuration,
    ConfigurationDescriptor,
};
pub use dispatch::{Context, DispatchPhase, DispatchReport, Dispatcher};
pub use error::{Error, Result, RunFailure};
pub use grammar::{BoundParameters, CommandGrammar, OptionalParameter};
pub use manifest::{BlueprintRegistrations, FsManifestSource, Manifest, ManifestSource, PluginRecord};
pub use plugin::{
    find_blueprint, BlueprintMatch, BlueprintRequest, BlueprintResolver, Capability, Command,
    PluginFactories, RunContext,
};
pub use project::{find_package, find_root, list_member_packages, package_id, PackageHandle, ProjectHandle};
pub use registry::{PluginMap, PluginRegistry};
pub use settings::{RootSearch, Settings, SettingsLayer};
