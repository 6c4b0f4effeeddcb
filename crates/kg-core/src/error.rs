//! Error types for kg-core
//!
//! Errors are grouped by who can fix them, which also decides the process
//! exit code reported by the binary:
//!
//! - **Input errors** (exit 1): the command line does not fit a grammar,
//!   the command or package cannot be found
//! - **System errors** (exit 2): I/O, JSON and settings failures
//! - **Plugin errors** (exit 3): manifests, entry points, blueprints, configuration
//! - **Run errors** (exit 4): a command's own `run` failed

use std::fmt;

use thiserror::Error;

/// Core error type for kg operations
#[derive(Debug, Error)]
pub enum Error {
    /// No `kg.json` could be resolved for the package specifier
    #[error("Manifest not found for package '{0}'")]
    ManifestNotFound(String),

    /// A manifest exists but is not the expected JSON shape
    #[error("Invalid manifest for package '{package}': {reason}")]
    ManifestInvalid { package: String, reason: String },

    /// No discovered plugin declares the requested command name
    #[error("Command not found: '{0}'")]
    CommandNotFound(String),

    /// The matched manifest has no entry point for the requested capability
    #[error("Plugin '{0}' does not declare an entry point")]
    NoEntryPoint(String),

    /// The entry point could not be turned into an instance
    #[error("Failed to instantiate '{entry_point}': {reason}")]
    InstantiationFailed { entry_point: String, reason: String },

    /// A declared grammar pattern is malformed or inconsistent
    #[error("Invalid command grammar '{pattern}': {reason}")]
    InvalidGrammar { pattern: String, reason: String },

    #[error("Missing required parameter: <{0}>")]
    MissingRequiredParameter(String),

    #[error("Unknown parameter: '{0}'")]
    UnknownParameter(String),

    /// A required positional slot held a flag, so its value was omitted
    #[error("Expected a value for <{name}> but found flag '{token}'")]
    UnexpectedFlag { name: String, token: String },

    #[error("Package not found: '{0}'")]
    PackageNotFound(String),

    /// An operation writes package state but ran without a package context
    #[error("'{0}' needs a package context: pass --package <id> or --all")]
    PackageRequired(String),

    /// Configuration was requested from a command that declares none
    #[error("Command '{0}' does not declare a configuration")]
    ConfigurationMissing(String),

    /// Stored configuration could not be read as the command's type
    #[error("Invalid configuration '{name}': {reason}")]
    InvalidConfiguration { name: String, reason: String },

    #[error("Blueprint not found: '{0}'")]
    BlueprintNotFound(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Settings error: {0}")]
    Settings(String),

    /// Raised by a command to stop a multi-package run immediately
    #[error("Aborted: {0}")]
    Aborted(String),

    /// One or more per-package runs failed
    #[error("{}", RunFailures(.0))]
    RunFailed(Vec<RunFailure>),
}

/// A failed run of a command against one package (or no package).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    /// Package id, `None` when the command ran without a package context
    pub package: Option<String>,
    pub message: String,
}

struct RunFailures<'a>(&'a [RunFailure]);

impl fmt::Display for RunFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} run(s) failed", self.0.len())?;
        for failure in self.0 {
            match &failure.package {
                Some(id) => write!(f, "\n  {id}: {}", failure.message)?,
                None => write!(f, "\n  {}", failure.message)?,
            }
        }
        Ok(())
    }
}

impl Error {
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn manifest_invalid(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ManifestInvalid {
            package: package.into(),
            reason: reason.into(),
        }
    }

    pub fn instantiation_failed(entry_point: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstantiationFailed {
            entry_point: entry_point.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_grammar(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGrammar {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error stops a multi-package run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// Process exit code for this error category.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::CommandNotFound(_)
            | Self::InvalidGrammar { .. }
            | Self::MissingRequiredParameter(_)
            | Self::UnknownParameter(_)
            | Self::UnexpectedFlag { .. }
            | Self::PackageNotFound(_)
            | Self::PackageRequired(_) => 1,
            Self::Io(_) | Self::Json(_) | Self::Settings(_) => 2,
            Self::ManifestNotFound(_)
            | Self::ManifestInvalid { .. }
            | Self::NoEntryPoint(_)
            | Self::InstantiationFailed { .. }
            | Self::ConfigurationMissing(_)
            | Self::InvalidConfiguration { .. }
            | Self::BlueprintNotFound(_) => 3,
            Self::Aborted(_) | Self::RunFailed(_) => 4,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Settings(format!("Failed to parse settings: {err}"))
    }
}

/// Result type alias for kg-core operations
pub type Result<T> = std::result::Result<T, Error>;
