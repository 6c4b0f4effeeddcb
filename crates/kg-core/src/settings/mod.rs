//! Tool settings loading and management
//!
//! # Hierarchy
//!
//! Settings are loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global settings: ~/.config/kg/config.toml
//! 3. Project settings: .kg/config.toml (relative to the start directory)
//! 4. Environment variables: KG_*
//! 5. CLI flags (applied by the binary)
//!
//! # Example Settings
//!
//! ```toml
//! manifest_file = "kg.json"
//! discovery_concurrency = 32
//! root_search = "inward"
//! ignored_directories = ["node_modules", ".git", "dist"]
//! ```
//!
//! These are settings of the tool itself. Per-package command configuration
//! stored in `package.json` lives in [`crate::config`].

mod load;
mod merge;
mod types;


pub use load::{global_settings_path, load_settings, load_toml_file, project_settings_path};
pub use types::{RootSearch, Settings, SettingsLayer};
