//! Command grammars
//!
//! A command declares the shape of its command line as a pattern string:
//!
//! ```text
//! build <package_name> [output] [--target|-t=node] [--watch]
//! ```
//!
//! - the first word is the root token, which argv's first token must equal
//! - `<name>` is a required positional parameter, bound in declared order
//! - `[name]` is an optional positional parameter
//! - `[--name]` is an optional named parameter (a flag when given no value)
//! - `|-x` registers a one-character short alias for a named parameter
//! - `=value` declares a default applied when the parameter is not given
//!
//! The global parameters `--all|-a` and `--package|-p` are accepted by every
//! grammar and cannot be redeclared.

mod bind;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub use bind::BoundParameters;

use crate::{Error, Result};

/// Name of the global "operate on every member package" parameter.
pub const ALL: &str = "all";
/// Name of the global "operate on one member package" parameter.
pub const PACKAGE: &str = "package";

/// Global parameters layered onto every grammar, as (name, short alias).
pub const GLOBAL_PARAMETERS: [(&str, &str); 2] = [(ALL, "a"), (PACKAGE, "p")];

/// An optional parameter declared by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalParameter {
    pub name: String,
    pub short_alias: Option<String>,
    pub default_value: Option<String>,
    /// Positional optionals may be given bare after the required parameters
    pub positional: bool,
}

impl OptionalParameter {
    /// A named optional parameter without alias or default.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_alias: None,
            default_value: None,
            positional: false,
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.short_alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// The declared parameter shape of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGrammar {
    pattern: String,
    root_token: String,
    required: Vec<String>,
    optional: Vec<OptionalParameter>,
}

impl CommandGrammar {
    /// Parse and validate a grammar pattern.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrammar` when the pattern is malformed, declares a
    /// name or alias twice, redeclares a global parameter, or places a
    /// required parameter after an optional positional one.
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: String| Error::invalid_grammar(pattern, reason);

        let mut words = pattern.split_whitespace();
        let root_token = words
            .next()
            .ok_or_else(|| invalid("pattern is empty".to_string()))?;
        if !is_valid_name(root_token) {
            return Err(invalid(format!("'{root_token}' is not a valid root token")));
        }

        let mut required = Vec::new();
        let mut optional: Vec<OptionalParameter> = Vec::new();

        for word in words {
            if let Some(inner) = strip_delimiters(word, '<', '>') {
                if optional.iter().any(|p| p.positional) {
                    return Err(invalid(format!(
                        "required parameter <{inner}> follows an optional positional parameter"
                    )));
                }
                if !is_valid_name(inner) {
                    return Err(invalid(format!("'{inner}' is not a valid parameter name")));
                }
                required.push(inner.to_string());
            } else if let Some(inner) = strip_delimiters(word, '[', ']') {
                optional.push(parse_optional(inner).map_err(invalid)?);
            } else {
                return Err(invalid(format!(
                    "'{word}' must be wrapped in <...> or [...]"
                )));
            }
        }

        let grammar = Self {
            pattern: pattern.to_string(),
            root_token: root_token.to_string(),
            required,
            optional,
        };
        grammar.check_names().map_err(invalid)?;
        Ok(grammar)
    }

    /// Whether `argv` is addressed to this command.
    pub fn matches<S: AsRef<str>>(&self, argv: &[S]) -> bool {
        argv.first()
            .is_some_and(|token| token.as_ref() == self.root_token)
    }

    #[must_use]
    pub fn root_token(&self) -> &str {
        &self.root_token
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    #[must_use]
    pub fn optional(&self) -> &[OptionalParameter] {
        &self.optional
    }

    /// Look up a declared optional parameter by name.
    #[must_use]
    pub fn optional_parameter(&self, name: &str) -> Option<&OptionalParameter> {
        self.optional.iter().find(|p| p.name == name)
    }

    /// Resolve a flag (`--long` or `-s`) to a parameter name, including the
    /// global parameters. Long names take exactly two dashes and short
    /// aliases exactly one.
    #[must_use]
    pub fn resolve_flag(&self, flag: &str) -> Option<&str> {
        if let Some(long) = flag.strip_prefix("--") {
            self.optional
                .iter()
                .find(|p| p.name == long)
                .map(|p| p.name.as_str())
                .or_else(|| {
                    GLOBAL_PARAMETERS
                        .iter()
                        .find(|(name, _)| *name == long)
                        .map(|(name, _)| *name)
                })
        } else {
            let short = flag.strip_prefix('-')?;
            self.optional
                .iter()
                .find(|p| p.short_alias.as_deref() == Some(short))
                .map(|p| p.name.as_str())
                .or_else(|| {
                    GLOBAL_PARAMETERS
                        .iter()
                        .find(|(_, alias)| *alias == short)
                        .map(|(name, _)| *name)
                })
        }
    }

    fn check_names(&self) -> std::result::Result<(), String> {
        let mut seen: HashSet<&str> = GLOBAL_PARAMETERS
            .iter()
            .flat_map(|(name, alias)| [*name, *alias])
            .collect();

        let names = self
            .required
            .iter()
            .map(String::as_str)
            .chain(self.optional.iter().map(|p| p.name.as_str()));
        let aliases = self.optional.iter().filter_map(|p| p.short_alias.as_deref());

        names.chain(aliases).try_for_each(|name| {
            if seen.insert(name) {
                Ok(())
            } else {
                Err(format!("'{name}' is declared more than once or shadows a global parameter"))
            }
        })
    }
}

impl FromStr for CommandGrammar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CommandGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn parse_optional(inner: &str) -> std::result::Result<OptionalParameter, String> {
    let (spec, default_value) = match inner.split_once('=') {
        Some((spec, default)) => (spec, Some(default.to_string())),
        None => (inner, None),
    };

    let Some(long) = spec.strip_prefix("--") else {
        if spec.contains('|') {
            return Err(format!("positional parameter [{inner}] cannot have an alias"));
        }
        if !is_valid_name(spec) {
            return Err(format!("'{spec}' is not a valid parameter name"));
        }
        return Ok(OptionalParameter {
            name: spec.to_string(),
            short_alias: None,
            default_value,
            positional: true,
        });
    };

    let (name, short_alias) = match long.split_once('|') {
        Some((name, alias)) => {
            let alias = alias
                .strip_prefix('-')
                .filter(|a| a.chars().count() == 1 && is_valid_name(a))
                .ok_or_else(|| format!("alias '{alias}' must look like -x"))?;
            (name, Some(alias.to_string()))
        }
        None => (long, None),
    };

    if !is_valid_name(name) {
        return Err(format!("'{name}' is not a valid parameter name"));
    }

    Ok(OptionalParameter {
        name: name.to_string(),
        short_alias,
        default_value,
        positional: false,
    })
}

fn strip_delimiters(word: &str, open: char, close: char) -> Option<&str> {
    word.strip_prefix(open)?.strip_suffix(close)
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_pattern() -> Result<()> {
        let grammar = CommandGrammar::parse("build <package_name> [output] [--target|-t=node] [--watch]")?;

        assert_eq!(grammar.root_token(), "build");
        assert_eq!(grammar.required(), ["package_name".to_string()]);
        assert_eq!(grammar.optional().len(), 3);

        let output = grammar.optional_parameter("output");
        assert!(output.is_some_and(|p| p.positional));

        let target = grammar.optional_parameter("target");
        assert_eq!(
            target,
            Some(&OptionalParameter::named("target").with_alias("t").with_default("node"))
        );
        Ok(())
    }

    #[test]
    fn test_root_only_pattern() -> Result<()> {
        let grammar: CommandGrammar = "packages".parse()?;
        assert!(grammar.required().is_empty());
        assert!(grammar.optional().is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(
            CommandGrammar::parse("   "),
            Err(Error::InvalidGrammar { .. })
        ));
    }

    #[test]
    fn test_bare_word_rejected() {
        assert!(CommandGrammar::parse("build name").is_err());
    }

    #[test]
    fn test_required_after_optional_positional_rejected() {
        assert!(CommandGrammar::parse("copy [from] <to>").is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        assert!(CommandGrammar::parse("x <name> [--name]").is_err());
        assert!(CommandGrammar::parse("x [--one|-o] [--other|-o]").is_err());
    }

    #[test]
    fn test_globals_cannot_be_redeclared() {
        assert!(CommandGrammar::parse("x [--all]").is_err());
        assert!(CommandGrammar::parse("x [--pretty|-p]").is_err());
    }

    #[test]
    fn test_bad_alias_rejected() {
        assert!(CommandGrammar::parse("x [--target|t]").is_err());
        assert!(CommandGrammar::parse("x [--target|-tt]").is_err());
        assert!(CommandGrammar::parse("x [out|-o]").is_err());
    }

    #[test]
    fn test_matches_is_exact_on_first_token() -> Result<()> {
        let grammar = CommandGrammar::parse("build <name>")?;
        assert!(grammar.matches(&["build"]));
        assert!(!grammar.matches(&["Build"]));
        assert!(!grammar.matches::<&str>(&[]));
        Ok(())
    }

    #[test]
    fn test_resolve_flag_includes_globals() -> Result<()> {
        let grammar = CommandGrammar::parse("build [--target|-t]")?;
        assert_eq!(grammar.resolve_flag("-t"), Some("target"));
        assert_eq!(grammar.resolve_flag("--target"), Some("target"));
        assert_eq!(grammar.resolve_flag("-a"), Some(ALL));
        assert_eq!(grammar.resolve_flag("--package"), Some(PACKAGE));
        assert_eq!(grammar.resolve_flag("--nope"), None);
        assert_eq!(grammar.resolve_flag("target"), None);
        Ok(())
    }
}
