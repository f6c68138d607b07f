//! Error types for descriptor finalization, parsing and option loading.
//!
//! Three families live here:
//!
//! - [`ConfigError`]: fatal, construction-time violations reported once by
//!   [`CommandBuilder::build`](crate::CommandBuilder::build).
//! - [`ParseError`]: per-parse problems. They are accumulated into
//!   [`ParseResult::errors`](crate::ParseResult) and never abort a parse.
//! - [`Error`]: ambient failures: loading [`ParserOptions`](crate::ParserOptions),
//!   running execution hooks.

use serde::Serialize;
use thiserror::Error;

use crate::suggest::Suggestion;

/// Descriptor configuration violations detected when a tree is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Command name is empty or whitespace-only.
    #[error("command name cannot be empty (under `{0}`)")]
    EmptyCommandName(String),
    /// An option was declared without calling `name`/`names`.
    #[error("option bound to `{binding}` in `{command}` has no name")]
    MissingOptionName { command: String, binding: String },
    /// Option name contains whitespace or is nothing but its prefix.
    #[error("invalid option name `{name}` in `{command}`")]
    InvalidOptionName { command: String, name: String },
    /// Two options in the same command share a short or long name.
    #[error("duplicate option `{name}` in `{command}`")]
    DuplicateOption { command: String, name: String },
    /// Two options in the same command write into the same binding target.
    #[error("duplicate binding target `{binding}` in `{command}`")]
    DuplicateBinding { command: String, binding: String },
    /// Two sibling commands share a name or alias.
    #[error("duplicate subcommand `{name}` under `{parent}`")]
    DuplicateCommand { parent: String, name: String },
    /// An option name is also the name of a sibling subcommand.
    #[error("`{name}` in `{command}` names both an option and a subcommand")]
    NameCollision { command: String, name: String },
}

/// Failure converting raw token(s) into an option's declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("cannot convert `{token}` for `{option}` into {expected}: {reason}")]
pub struct ResolveError {
    /// The offending token (the option name itself when the value is missing).
    pub token: String,
    /// Long name of the option being resolved.
    pub option: String,
    /// Name of the expected type.
    pub expected: String,
    /// Human readable reason reported by the resolver.
    pub reason: String,
}

/// A problem found while parsing one token vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    /// Token matched neither an option nor a subcommand of the active context.
    #[error("unknown token `{token}` in `{path}`{}", format_suggestions(.suggestions))]
    UnknownToken {
        token: String,
        path: String,
        suggestions: Vec<Suggestion>,
    },
    /// A token could not be converted into the option's type.
    #[error(transparent)]
    ResolveFailure(ResolveError),
    /// Required option absent from input, environment and defaults.
    #[error("missing required option `{option}` in `{path}`")]
    MissingRequiredOption { option: String, path: String },
    /// Required subcommand of a visited command was not invoked.
    #[error("missing required command `{command}` under `{path}`")]
    MissingRequiredCommand { command: String, path: String },
    /// A validator rejected a bound value.
    #[error("`{option}` failed validation `{validator}`: {message}")]
    Validation {
        option: String,
        validator: String,
        message: String,
    },
    /// More than one sibling command matched a token.
    #[error("`{token}` is ambiguous between {}", .candidates.join(", "))]
    AmbiguousCommand {
        token: String,
        candidates: Vec<String>,
    },
}

fn format_suggestions(suggestions: &[Suggestion]) -> String {
    match suggestions.first() {
        Some(best) => format!(", did you mean `{}`?", best.name),
        None => String::new(),
    }
}

/// Ambient errors: option loading and hook execution.
#[derive(Debug, Error)]
pub enum Error {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Parser options violate their own invariants.
    #[error("invalid parser options: {0}")]
    InvalidOptions(String),

    /// Descriptor tree failed finalization.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Hooks were requested for a parse that reported errors.
    #[error("parse failed with {0} error(s)")]
    ParseFailed(usize),

    /// An execution hook returned an error.
    #[error("command `{command}` failed: {message}")]
    Execution { command: String, message: String },
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
