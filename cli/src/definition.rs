//! Declarative command-tree definitions.
//!
//! A definition file (YAML, or JSON with a `.json` extension) describes one
//! root command and is turned into descriptors through the public builder
//! DSL:
//!
//! ```yaml
//! name: deploy
//! options:
//!   - name: verbose
//!     short: v
//!     kind: bool
//!   - name: port
//!     kind: uint
//!     default: 8080
//!     env: DEPLOY_PORT
//!     validators:
//!       - range: { min: 1, max: 65535 }
//! commands:
//!   - name: rollback
//!     aliases: [rb]
//!     options:
//!       - name: tags
//!         multiple: list
//! ```

use std::collections::BTreeSet;
use std::fmt::Display;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use argtree_core::{
    CommandBuilder, CommandDescriptor, ConfigError, Decimal, OptionBuilder, OptionValue,
    ParserOptions, UntypedOptionBuilder, Validator, validators,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Problems loading or building a definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid YAML in '{path}': {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("option `{option}`: default must be a scalar or a list of scalars")]
    InvalidDefault { option: String },

    #[error("option `{option}`: validator `{validator}` does not apply to kind `{kind}`")]
    UnsupportedValidator {
        option: String,
        validator: &'static str,
        kind: &'static str,
    },

    #[error("option `{option}`: {message}")]
    InvalidValidator { option: String, message: String },

    #[error("option `{option}`: kind `{kind}` cannot be collected into a set")]
    UnorderedSet { option: String, kind: &'static str },

    #[error("{}", format_config_errors(.0))]
    Config(Vec<ConfigError>),
}

fn format_config_errors(errors: &[ConfigError]) -> String {
    let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();
    lines.join("\n")
}

/// Value kind of an option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Bool,
    Int,
    Uint,
    Float,
    Decimal,
    #[default]
    String,
    Path,
}

/// Whether an option collects several values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiple {
    #[default]
    None,
    List,
    Set,
}

/// A validator attached to an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorDef {
    Range { min: f64, max: f64 },
    OneOf(Vec<String>),
    Pattern(String),
    NonEmpty,
}

impl ValidatorDef {
    fn name(&self) -> &'static str {
        match self {
            ValidatorDef::Range { .. } => "range",
            ValidatorDef::OneOf(_) => "one_of",
            ValidatorDef::Pattern(_) => "pattern",
            ValidatorDef::NonEmpty => "non_empty",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionDef {
    /// Sets both names unless `short`/`long` override one of them.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short: Option<String>,
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub kind: Kind,
    #[serde(default)]
    pub multiple: Multiple,
    #[serde(default)]
    pub required: bool,
    /// A scalar or a list of scalars, converted like input tokens.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub bind_to: Option<String>,
    #[serde(default)]
    pub validators: Vec<ValidatorDef>,
}

impl OptionDef {
    fn label(&self) -> String {
        self.long
            .clone()
            .or_else(|| self.name.clone())
            .or_else(|| self.short.clone())
            .unwrap_or_else(|| "<unnamed>".to_string())
    }

    fn default_literals(&self) -> Result<Option<Vec<String>>, DefinitionError> {
        use serde_json::Value;

        fn scalar(value: &Value) -> Option<String> {
            match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            }
        }

        let invalid = || DefinitionError::InvalidDefault {
            option: self.label(),
        };
        match &self.default {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| scalar(item).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(value) => scalar(value).map(|s| Some(vec![s])).ok_or_else(invalid),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandDef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub auto_execute: bool,
    #[serde(default)]
    pub options: Vec<OptionDef>,
    #[serde(default)]
    pub commands: Vec<CommandDef>,
}

impl CommandDef {
    /// Loads a definition from YAML, or JSON when the extension is `.json`.
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let file = std::fs::File::open(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_reader(reader).map_err(|source| DefinitionError::Json {
                path: path.to_path_buf(),
                source,
            })
        } else {
            serde_yaml::from_reader(reader).map_err(|source| DefinitionError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    /// Builds the descriptor tree, reporting every configuration violation.
    pub fn build(&self, parser: &ParserOptions) -> Result<CommandDescriptor, DefinitionError> {
        let mut problems = Vec::new();
        let builder = self.configure(CommandBuilder::new(&self.name, parser), &mut problems);
        if !problems.is_empty() {
            return Err(problems.swap_remove(0));
        }
        builder.try_build().map_err(DefinitionError::Config)
    }

    fn configure(
        &self,
        mut builder: CommandBuilder,
        problems: &mut Vec<DefinitionError>,
    ) -> CommandBuilder {
        for alias in &self.aliases {
            builder = builder.alias(alias);
        }
        if let Some(description) = &self.description {
            builder = builder.description(description);
        }
        builder = builder.required(self.required).auto_execute(self.auto_execute);
        if self.auto_execute {
            builder = builder.on_execute(|command| {
                info!(
                    command = %command.path.join(" "),
                    values = command.values.len(),
                    "Command executed"
                );
                Ok(())
            });
        }

        for option in &self.options {
            builder = match declare(builder, option) {
                Ok(builder) => builder,
                Err((builder, err)) => {
                    problems.push(err);
                    builder
                }
            };
        }

        for child in &self.commands {
            builder = builder.command(&child.name, |c| child.configure(c, problems));
        }
        builder
    }
}

type Check<T> = Box<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

fn boxed<T: 'static>(validator: impl Validator<T> + 'static) -> Check<T> {
    Box::new(move |value: &T| validator.validate(value))
}

/// Element types a definition can declare, with the validators each accepts.
trait Element: OptionValue {
    const KIND: &'static str;

    /// `None` when the validator does not apply to this kind.
    fn check(_validator: &ValidatorDef) -> Option<Result<Check<Self>, String>> {
        None
    }
}

fn parsed_one_of<T: Element + Display>(values: &[String]) -> Result<Check<T>, String> {
    let allowed = values
        .iter()
        .map(|v| T::from_token(v).ok_or_else(|| format!("`{v}` is not a valid {}", T::KIND)))
        .collect::<Result<Vec<T>, String>>()?;
    Ok(boxed(validators::one_of(allowed)))
}

fn whole_bounds(min: f64, max: f64) -> Result<(f64, f64), String> {
    if min.fract() != 0.0 || max.fract() != 0.0 {
        return Err("range bounds must be whole numbers".to_string());
    }
    Ok((min, max))
}

impl Element for bool {
    const KIND: &'static str = "bool";
}

impl Element for i64 {
    const KIND: &'static str = "int";

    fn check(validator: &ValidatorDef) -> Option<Result<Check<Self>, String>> {
        match validator {
            ValidatorDef::Range { min, max } => Some(
                whole_bounds(*min, *max)
                    .map(|(min, max)| boxed(validators::range(min as i64, max as i64))),
            ),
            ValidatorDef::OneOf(values) => Some(parsed_one_of(values)),
            _ => None,
        }
    }
}

impl Element for u64 {
    const KIND: &'static str = "uint";

    fn check(validator: &ValidatorDef) -> Option<Result<Check<Self>, String>> {
        match validator {
            ValidatorDef::Range { min, max } => Some(whole_bounds(*min, *max).and_then(|(min, max)| {
                if min < 0.0 {
                    Err("range bounds of an unsigned option cannot be negative".to_string())
                } else {
                    Ok(boxed(validators::range(min as u64, max as u64)))
                }
            })),
            ValidatorDef::OneOf(values) => Some(parsed_one_of(values)),
            _ => None,
        }
    }
}

impl Element for f64 {
    const KIND: &'static str = "float";

    fn check(validator: &ValidatorDef) -> Option<Result<Check<Self>, String>> {
        match validator {
            ValidatorDef::Range { min, max } => Some(Ok(boxed(validators::range(*min, *max)))),
            _ => None,
        }
    }
}

impl Element for Decimal {
    const KIND: &'static str = "decimal";

    fn check(validator: &ValidatorDef) -> Option<Result<Check<Self>, String>> {
        match validator {
            ValidatorDef::Range { min, max } => Some(
                Decimal::try_from(*min)
                    .and_then(|min| Ok((min, Decimal::try_from(*max)?)))
                    .map(|(min, max)| boxed(validators::range(min, max)))
                    .map_err(|err| format!("invalid range bound: {err}")),
            ),
            ValidatorDef::OneOf(values) => Some(parsed_one_of(values)),
            _ => None,
        }
    }
}

impl Element for String {
    const KIND: &'static str = "string";

    fn check(validator: &ValidatorDef) -> Option<Result<Check<Self>, String>> {
        Some(match validator {
            ValidatorDef::OneOf(values) => Ok(boxed(validators::one_of(values.clone()))),
            ValidatorDef::Pattern(pattern) => validators::pattern(pattern)
                .map(|validator| boxed(validator))
                .map_err(|err| format!("invalid pattern: {err}")),
            ValidatorDef::NonEmpty => Ok(boxed(validators::non_empty())),
            ValidatorDef::Range { .. } => return None,
        })
    }
}

impl Element for PathBuf {
    const KIND: &'static str = "path";

    fn check(validator: &ValidatorDef) -> Option<Result<Check<Self>, String>> {
        match validator {
            ValidatorDef::NonEmpty => Some(Ok(Box::new(|path: &PathBuf| {
                if path.as_os_str().is_empty() {
                    Err("path cannot be empty".to_string())
                } else {
                    Ok(())
                }
            }))),
            _ => None,
        }
    }
}

type Declared = Result<CommandBuilder, (CommandBuilder, DefinitionError)>;

/// Declares `def` on `builder`; on failure the builder comes back untouched.
fn declare(builder: CommandBuilder, def: &OptionDef) -> Declared {
    match def.kind {
        Kind::Bool => declare_ordered::<bool>(builder, def),
        Kind::Int => declare_ordered::<i64>(builder, def),
        Kind::Uint => declare_ordered::<u64>(builder, def),
        Kind::Float => declare_unordered::<f64>(builder, def),
        Kind::Decimal => declare_ordered::<Decimal>(builder, def),
        Kind::String => declare_ordered::<String>(builder, def),
        Kind::Path => declare_ordered::<PathBuf>(builder, def),
    }
}

fn declare_ordered<T: Element + Ord>(builder: CommandBuilder, def: &OptionDef) -> Declared {
    if def.multiple != Multiple::Set {
        return declare_unordered::<T>(builder, def);
    }
    let (checks, defaults) = match prepare::<T>(def) {
        Ok(prepared) => prepared,
        Err(err) => return Err((builder, err)),
    };
    let checks = checks
        .into_iter()
        .map(|(name, check)| {
            let check: Check<BTreeSet<T>> =
                Box::new(move |values: &BTreeSet<T>| values.iter().try_for_each(&check));
            (name, check)
        })
        .collect();
    Ok(declare_as::<BTreeSet<T>>(builder, def, defaults, checks))
}

fn declare_unordered<T: Element>(builder: CommandBuilder, def: &OptionDef) -> Declared {
    let (checks, defaults) = match prepare::<T>(def) {
        Ok(prepared) => prepared,
        Err(err) => return Err((builder, err)),
    };
    match def.multiple {
        Multiple::None => Ok(declare_as::<T>(builder, def, defaults, checks)),
        Multiple::List => {
            let checks = checks
                .into_iter()
                .map(|(name, check)| (name, boxed(validators::each(check))))
                .collect();
            Ok(declare_as::<Vec<T>>(builder, def, defaults, checks))
        }
        Multiple::Set => Err((
            builder,
            DefinitionError::UnorderedSet {
                option: def.label(),
                kind: T::KIND,
            },
        )),
    }
}

type Prepared<T> = (Vec<(&'static str, Check<T>)>, Option<Vec<String>>);

fn prepare<T: Element>(def: &OptionDef) -> Result<Prepared<T>, DefinitionError> {
    let mut checks = Vec::with_capacity(def.validators.len());
    for validator in &def.validators {
        let check = T::check(validator)
            .ok_or_else(|| DefinitionError::UnsupportedValidator {
                option: def.label(),
                validator: validator.name(),
                kind: T::KIND,
            })?
            .map_err(|message| DefinitionError::InvalidValidator {
                option: def.label(),
                message,
            })?;
        checks.push((validator.name(), check));
    }
    Ok((checks, def.default_literals()?))
}

fn declare_as<V: OptionValue>(
    builder: CommandBuilder,
    def: &OptionDef,
    defaults: Option<Vec<String>>,
    checks: Vec<(&'static str, Check<V>)>,
) -> CommandBuilder {
    builder.untyped_option::<V>(|option| {
        let option = common(option, def, defaults);
        match option.typed::<V>() {
            Ok(typed) => with_checks(typed, checks).untyped(),
            Err(untyped) => untyped,
        }
    })
}

fn with_checks<V: OptionValue>(
    option: OptionBuilder<V>,
    checks: Vec<(&'static str, Check<V>)>,
) -> OptionBuilder<V> {
    checks
        .into_iter()
        .fold(option, |option, (name, check)| option.validate(name, check))
}

fn common(
    mut option: UntypedOptionBuilder,
    def: &OptionDef,
    defaults: Option<Vec<String>>,
) -> UntypedOptionBuilder {
    if let Some(name) = &def.name {
        option = option.name(name);
    }
    if def.short.is_some() || def.long.is_some() {
        let fallback = def.name.as_deref().unwrap_or_default();
        option = option.names(
            def.short.as_deref().unwrap_or(fallback),
            def.long.as_deref().unwrap_or(fallback),
        );
    }
    if let Some(description) = &def.description {
        option = option.description(description);
    }
    option = option.required(def.required);
    if let Some(tokens) = &defaults {
        option = option.default_literals(tokens.iter().map(String::as_str));
    }
    if let Some(order) = def.order {
        option = option.order(order);
    }
    if let Some(env) = &def.env {
        option = option.env(env);
    }
    if let Some(key) = &def.bind_to {
        option = option.bind_to(key);
    }
    option
}
