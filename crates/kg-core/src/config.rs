//! Per-package command configuration
//!
//! Commands may declare a configuration object with defaults. Packages store
//! overrides in their `package.json` under `kg.config[<command>]`:
//!
//! ```json
//! { "name": "@acme/web", "kg": { "config": { "build": { "target": "web" } } } }
//! ```
//!
//! Reading merges the defaults into the stored object without writing
//! anything back. Writing overlays a new value onto the stored object and
//! saves the manifest. Neither direction ever removes a stored key, so a
//! package keeps settings that a newer command version no longer declares.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::project::PackageHandle;
use crate::{Error, Result};

/// A command's configuration key and default object.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationDescriptor {
    name: String,
    defaults: Value,
}

impl ConfigurationDescriptor {
    pub fn new(name: impl Into<String>, defaults: Value) -> Self {
        Self {
            name: name.into(),
            defaults,
        }
    }

    /// Use `T::default()` as the default object.
    ///
    /// # Errors
    ///
    /// Returns `Json` if `T` does not serialize to JSON.
    pub fn from_default<T: Serialize + Default>(name: impl Into<String>) -> Result<Self> {
        Ok(Self::new(name, serde_json::to_value(T::default())?))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn defaults(&self) -> &Value {
        &self.defaults
    }
}

/// Which side keeps its value when both hold a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precedence {
    Target,
    Source,
}

/// Fill the gaps of `stored` from `defaults`. Stored scalars win.
pub fn merge_defaults(stored: &mut Value, defaults: &Value) {
    merge_into(stored, defaults, Precedence::Target, &mut Vec::new());
}

/// Overlay `incoming` onto `stored`. Incoming leaves win.
pub fn overlay(stored: &mut Value, incoming: &Value) {
    merge_into(stored, incoming, Precedence::Source, &mut Vec::new());
}

fn merge_into(target: &mut Value, source: &Value, precedence: Precedence, path: &mut Vec<String>) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                path.push(key.clone());
                match target.get_mut(key) {
                    Some(existing) => merge_into(existing, value, precedence, path),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
                path.pop();
            }
        }
        (target @ Value::Null, source) => *target = source.clone(),
        (target, source) if target.is_object() != source.is_object() => {
            tracing::debug!(
                key = %path.join("."),
                "Configuration shape mismatch, replacing stored value"
            );
            *target = source.clone();
        }
        (target, source) => {
            if precedence == Precedence::Source {
                *target = source.clone();
            }
        }
    }
}

/// Read a package's configuration for `descriptor` as `T`.
///
/// Without a package the defaults alone are used.
///
/// # Errors
///
/// Returns `InvalidConfiguration` if the merged object does not deserialize as `T`.
pub fn resolve_configuration<T: DeserializeOwned>(
    package: Option<&PackageHandle>,
    descriptor: &ConfigurationDescriptor,
) -> Result<T> {
    let mut merged = package
        .and_then(|p| p.stored_configuration(descriptor.name()))
        .cloned()
        .unwrap_or(Value::Null);
    merge_defaults(&mut merged, descriptor.defaults());

    serde_json::from_value(merged).map_err(|e| Error::InvalidConfiguration {
        name: descriptor.name().to_string(),
        reason: e.to_string(),
    })
}

/// Overlay `value` onto the package's stored configuration and save the
/// package manifest.
///
/// # Errors
///
/// Returns `Json` if `value` does not serialize, `Io` if the write fails.
pub async fn persist_configuration<T: Serialize + Sync>(
    package: &mut PackageHandle,
    descriptor: &ConfigurationDescriptor,
    value: &T,
) -> Result<()> {
    let incoming = serde_json::to_value(value)?;
    overlay(package.stored_configuration_mut(descriptor.name()), &incoming);
    package.save().await
}
