//! Binding raw argv tokens against a command grammar

use std::collections::BTreeMap;

use super::{CommandGrammar, ALL, PACKAGE};
use crate::{Error, Result};

/// Parameters bound from a command line.
///
/// A value of `None` means the parameter was given as a bare flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundParameters {
    root_token: String,
    values: BTreeMap<String, Option<String>>,
}

impl BoundParameters {
    #[must_use]
    pub fn root_token(&self) -> &str {
        &self.root_token
    }

    /// The value bound to `name`, if it was bound with one.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Option::as_deref)
    }

    /// Whether `name` was given at all (with or without a value) or defaulted.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The global `--all` selector.
    #[must_use]
    pub fn all_packages(&self) -> bool {
        self.contains(ALL)
    }

    /// The global `--package <id>` selector.
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        self.get(PACKAGE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl CommandGrammar {
    /// Bind `argv` (including the root token) to this grammar.
    ///
    /// # Errors
    ///
    /// - `CommandNotFound` if argv is not addressed to this command
    /// - `MissingRequiredParameter` / `UnexpectedFlag` for required slots
    /// - `UnknownParameter` for stray positionals and undeclared flags
    pub fn bind<S: AsRef<str>>(&self, argv: &[S]) -> Result<BoundParameters> {
        let Some((first, rest)) = argv.split_first() else {
            return Err(Error::CommandNotFound(String::new()));
        };
        if first.as_ref() != self.root_token {
            return Err(Error::CommandNotFound(first.as_ref().to_string()));
        }

        let mut tokens = rest.iter().map(AsRef::<str>::as_ref).peekable();
        let mut values = BTreeMap::new();

        for name in &self.required {
            match tokens.next() {
                None => return Err(Error::MissingRequiredParameter(name.clone())),
                Some(token) if is_flag(token) => {
                    return Err(Error::UnexpectedFlag {
                        name: name.clone(),
                        token: token.to_string(),
                    })
                }
                Some(token) => {
                    values.insert(name.clone(), Some(unquote(token)));
                }
            }
        }

        for param in self.optional.iter().filter(|p| p.positional) {
            if let Some(token) = tokens.next_if(|t| !is_flag(t)) {
                values.insert(param.name.clone(), Some(unquote(token)));
            }
        }

        while let Some(token) = tokens.next() {
            if !is_flag(token) {
                return Err(Error::UnknownParameter(token.to_string()));
            }

            let (flag, inline) = match token.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (token, None),
            };
            let name = self
                .resolve_flag(flag)
                .ok_or_else(|| Error::UnknownParameter(token.to_string()))?;

            let value = match inline {
                Some(value) => Some(unquote(value)),
                None => tokens.next_if(|t| !is_flag(t)).map(unquote),
            };
            values.insert(name.to_string(), value);
        }

        for param in &self.optional {
            if let Some(default) = &param.default_value {
                values
                    .entry(param.name.clone())
                    .or_insert_with(|| Some(default.clone()));
            }
        }

        Ok(BoundParameters {
            root_token: self.root_token.clone(),
            values,
        })
    }
}

fn is_flag(token: &str) -> bool {
    token.starts_with('-')
}

fn unquote(token: &str) -> String {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
        .to_string()
}
