//! Serializable parse reports and tree outlines.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use argtree_core::{
    CommandDescriptor, Decimal, ParseError, ParseResult, ParsedCommand, ParsedValue, UsagePrinter,
};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Json,
    Yaml,
}

#[derive(Debug, Serialize)]
pub struct ParseReport {
    pub success: bool,
    pub command: CommandReport,
    pub errors: Vec<ErrorReport>,
    pub scheduled: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CommandReport {
    pub name: String,
    pub path: Vec<String>,
    pub values: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcommand: Option<Box<CommandReport>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(flatten)]
    pub detail: ParseError,
}

/// One line of a batch input.
#[derive(Debug, Serialize)]
pub struct BatchEntry {
    pub line: usize,
    pub tokens: Vec<String>,
    #[serde(flatten)]
    pub report: ParseReport,
}

impl ParseReport {
    pub fn new(result: &ParseResult) -> Self {
        Self {
            success: result.success(),
            command: CommandReport::new(&result.command),
            errors: result
                .errors
                .iter()
                .map(|err| ErrorReport {
                    message: err.to_string(),
                    detail: err.clone(),
                })
                .collect(),
            scheduled: result.scheduled.clone(),
            executed: None,
        }
    }
}

impl CommandReport {
    fn new(command: &ParsedCommand) -> Self {
        Self {
            name: command.name.clone(),
            path: command.path.clone(),
            values: command
                .values
                .iter()
                .map(|(key, value)| (key.clone(), value_json(value)))
                .collect(),
            subcommand: command.subcommand().map(|child| Box::new(Self::new(child))),
        }
    }
}

macro_rules! try_render {
    ($value:expr, $render:expr; $($ty:ty),* $(,)?) => {
        $(
            if let Some(v) = $value.downcast_ref::<$ty>() {
                return $render(v);
            }
            if let Some(v) = $value.downcast_ref::<Vec<$ty>>() {
                return Value::Array(v.iter().map($render).collect());
            }
        )*
    };
}

macro_rules! try_render_set {
    ($value:expr, $render:expr; $($ty:ty),* $(,)?) => {
        $(
            if let Some(v) = $value.downcast_ref::<BTreeSet<$ty>>() {
                return Value::Array(v.iter().map($render).collect());
            }
        )*
    };
}

/// Renders a bound value for the kinds a definition can declare.
pub fn value_json(value: &ParsedValue) -> Value {
    try_render!(value, |v| json!(v); bool, i64, u64, f64, String);
    try_render!(value, |v: &Decimal| Value::String(v.to_string()); Decimal);
    try_render!(value, |v: &PathBuf| Value::String(v.display().to_string()); PathBuf);
    try_render_set!(value, |v| json!(v); bool, i64, u64, String);
    try_render_set!(value, |v: &Decimal| Value::String(v.to_string()); Decimal);
    try_render_set!(value, |v: &PathBuf| Value::String(v.display().to_string()); PathBuf);
    Value::String(format!("{value:?}"))
}

pub fn render<T: Serialize>(report: &T, format: ReportFormat) -> Result<String, String> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        ReportFormat::Yaml => {
            serde_yaml::to_string(report).map_err(|e| format!("YAML serialization failed: {e}"))
        }
    }
}

/// Indented outline of a command tree.
pub struct OutlinePrinter;

impl OutlinePrinter {
    fn print_level(
        &self,
        command: &CommandDescriptor,
        depth: usize,
        out: &mut dyn fmt::Write,
    ) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(out, "{indent}{}", command.name())?;
        if !command.aliases().is_empty() {
            write!(out, " ({})", command.aliases().join(", "))?;
        }
        if command.is_required() {
            write!(out, " [required]")?;
        }
        if let Some(description) = command.description() {
            write!(out, " - {description}")?;
        }
        writeln!(out)?;

        for option in command.options() {
            write!(
                out,
                "{indent}  {}, {} <{}>",
                option.short_name(),
                option.long_name(),
                option.value_type().name
            )?;
            if option.is_required() {
                write!(out, " [required]")?;
            }
            if let Some(env) = option.env() {
                write!(out, " [env: {env}]")?;
            }
            if let Some(description) = option.description() {
                write!(out, " - {description}")?;
            }
            writeln!(out)?;
        }

        for child in command.children() {
            self.print_level(child, depth + 1, out)?;
        }
        Ok(())
    }
}

impl UsagePrinter for OutlinePrinter {
    fn print(&self, command: &CommandDescriptor, out: &mut dyn fmt::Write) -> fmt::Result {
        self.print_level(command, 0, out)
    }
}
