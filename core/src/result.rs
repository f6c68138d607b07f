//! Parse outcomes.

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::value::{OptionValue, ParsedValue};

/// Values bound for one visited command, plus the routed subcommand.
///
/// # Examples
///
/// ```
/// use argtree_core::*;
///
/// let root = CommandBuilder::new("app", &ParserOptions::default())
///     .option::<bool>(|o| o.names("v", "verbose"))
///     .command("run", |c| c.option::<u32>(|o| o.name("jobs")))
///     .build()
///     .unwrap();
///
/// let result = ArgumentManager::default().parse(&["-v", "run", "--jobs", "4"], &root);
/// assert!(result.success());
/// assert!(result.command.flag("verbose"));
///
/// let run = result.command.find(&["run"]).unwrap();
/// assert_eq!(run.get::<u32>("jobs"), Some(&4));
/// assert_eq!(result.active().path, vec!["app", "run"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCommand {
    /// Command name.
    pub name: String,
    /// Full path from the root, root included.
    pub path: Vec<String>,
    /// Bound values keyed by binding target.
    pub values: BTreeMap<String, ParsedValue>,
    /// Child command the input routed into.
    pub subcommand: Option<Box<ParsedCommand>>,
}

impl ParsedCommand {
    /// Returns the erased value bound under `binding`.
    pub fn value(&self, binding: &str) -> Option<&ParsedValue> {
        self.values.get(binding)
    }

    /// Returns the value bound under `binding` if it is a `T`.
    pub fn get<T: OptionValue>(&self, binding: &str) -> Option<&T> {
        self.values.get(binding).and_then(ParsedValue::downcast_ref::<T>)
    }

    /// Returns `true` if a value is bound under `binding`.
    pub fn contains(&self, binding: &str) -> bool {
        self.values.contains_key(binding)
    }

    /// Returns `true` if `binding` holds the boolean `true`.
    pub fn flag(&self, binding: &str) -> bool {
        self.get::<bool>(binding).copied().unwrap_or(false)
    }

    /// Routed subcommand.
    pub fn subcommand(&self) -> Option<&ParsedCommand> {
        self.subcommand.as_deref()
    }

    /// Deepest routed command, `self` when nothing was routed.
    pub fn deepest(&self) -> &ParsedCommand {
        let mut current = self;
        while let Some(child) = current.subcommand() {
            current = child;
        }
        current
    }

    /// Follows `path` (names relative to this command) through the routed chain.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&ParsedCommand> {
        path.iter().try_fold(self, |command, segment| {
            command
                .subcommand()
                .filter(|child| child.name == segment.as_ref())
        })
    }

    /// Iterates the routed chain, root first.
    pub fn chain(&self) -> impl Iterator<Item = &ParsedCommand> {
        std::iter::successors(Some(self), |command| command.subcommand())
    }
}

/// Everything one parse produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
    /// Bound root command and the routed chain below it.
    pub command: ParsedCommand,
    /// Every problem found, in discovery order.
    pub errors: Vec<ParseError>,
    /// Paths of auto-execute commands reached, root first.
    pub scheduled: Vec<Vec<String>>,
}

impl ParseResult {
    /// `true` when no error was recorded.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Deepest routed command.
    pub fn active(&self) -> &ParsedCommand {
        self.command.deepest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ParsedCommand {
        let leaf = ParsedCommand {
            name: "release".into(),
            path: vec!["cargo".into(), "build".into(), "release".into()],
            values: BTreeMap::from([("x".to_string(), ParsedValue::new(1_i32))]),
            subcommand: None,
        };
        let middle = ParsedCommand {
            name: "build".into(),
            path: vec!["cargo".into(), "build".into()],
            values: BTreeMap::new(),
            subcommand: Some(Box::new(leaf)),
        };
        ParsedCommand {
            name: "cargo".into(),
            path: vec!["cargo".into()],
            values: BTreeMap::from([("quiet".to_string(), ParsedValue::new(true))]),
            subcommand: Some(Box::new(middle)),
        }
    }

    #[test]
    fn test_lookup_helpers() {
        let root = chain();
        assert!(root.flag("quiet"));
        assert!(!root.flag("missing"));
        assert_eq!(root.get::<i32>("quiet"), None);
        assert_eq!(root.deepest().get::<i32>("x"), Some(&1));
        assert_eq!(root.find(&["build", "release"]).unwrap().name, "release");
        assert!(root.find(&["release"]).is_none());
        let names: Vec<_> = root.chain().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["cargo", "build", "release"]);
    }

    #[test]
    fn test_success_tracks_errors() {
        let mut result = ParseResult::default();
        assert!(result.success());
        result.errors.push(ParseError::MissingRequiredOption {
            option: "--x".into(),
            path: "cargo".into(),
        });
        assert!(!result.success());
    }
}
