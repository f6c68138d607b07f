//! Parser configuration.
//!
//! [`ParserOptions`] controls the CLI grammar: the short/long option prefixes,
//! whether `--name=value` is accepted, and how suggestions are ranked. It can
//! be loaded from YAML or JSON so applications can ship it next to their
//! binaries.
//!
//! # Example YAML
//!
//! ```yaml
//! prefix_short: "-"
//! prefix_long: "--"
//! allow_inline_values: true
//! suggestions:
//!   max_distance: 2
//!   limit: 5
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ranking limits for the suggestion engine.
///
/// # Examples
///
/// ```
/// # use argtree_core::SuggestionConfig;
/// let config = SuggestionConfig::default();
/// assert_eq!(config.max_distance, 2);
/// assert_eq!(config.limit, Some(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Candidates farther than this edit distance are never suggested.
    pub max_distance: usize,
    /// Maximum number of suggestions attached to one error (`None` = all).
    pub limit: Option<usize>,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            max_distance: 2,
            limit: Some(5),
        }
    }
}

/// Top-level parser configuration.
///
/// # Examples
///
/// ```
/// use argtree_core::ParserOptions;
///
/// let options = ParserOptions::default();
/// assert_eq!(options.prefix_short, "-");
/// assert_eq!(options.prefix_long, "--");
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Prefix prepended to short option names.
    pub prefix_short: String,
    /// Prefix prepended to long option names.
    pub prefix_long: String,
    /// Accept `--name=value` in addition to `--name value`.
    pub allow_inline_values: bool,
    /// Suggestion ranking limits.
    pub suggestions: SuggestionConfig,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            prefix_short: "-".to_string(),
            prefix_long: "--".to_string(),
            allow_inline_values: true,
            suggestions: SuggestionConfig::default(),
        }
    }
}

impl ParserOptions {
    /// Loads options from a YAML file, or JSON when the extension is `.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::Error::IoError) if the file cannot be read,
    /// [`YamlError`](crate::Error::YamlError) / [`JsonError`](crate::Error::JsonError)
    /// if parsing fails, and [`InvalidOptions`](crate::Error::InvalidOptions)
    /// if the loaded values fail [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let options: Self = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };
        options.validate()?;
        Ok(options)
    }

    /// Saves the options as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::Error::IoError) if the file cannot be
    /// written, or [`YamlError`](crate::Error::YamlError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks that both prefixes are non-empty and distinct.
    ///
    /// # Examples
    ///
    /// ```
    /// use argtree_core::ParserOptions;
    ///
    /// let options = ParserOptions {
    ///     prefix_long: "-".into(),
    ///     ..ParserOptions::default()
    /// };
    /// assert!(options.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.prefix_short.is_empty() || self.prefix_long.is_empty() {
            return Err(Error::InvalidOptions(
                "option prefixes cannot be empty".to_string(),
            ));
        }
        if self.prefix_short == self.prefix_long {
            return Err(Error::InvalidOptions(format!(
                "short and long prefix are both `{}`",
                self.prefix_short
            )));
        }
        Ok(())
    }

    /// Builds the short form of `name` (e.g. `v` → `-v`).
    pub fn short_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix_short, name)
    }

    /// Builds the long form of `name` (e.g. `verbose` → `--verbose`).
    pub fn long_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix_long, name)
    }

    /// Strips the long (then short) prefix from an option name.
    pub fn strip_prefix<'a>(&self, name: &'a str) -> &'a str {
        name.strip_prefix(self.prefix_long.as_str())
            .or_else(|| name.strip_prefix(self.prefix_short.as_str()))
            .unwrap_or(name)
    }
}
