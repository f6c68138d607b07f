//! Descriptor type definitions for command tree modeling.
//!
//! Descriptors are produced by [`CommandBuilder`](crate::CommandBuilder) and
//! are immutable afterwards: every parse reads them, none writes them. They
//! are `Send + Sync` and can be shared between concurrent parses.

use std::fmt;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::resolver::{Arity, ResolverRegistry};
use crate::validator::NamedValidator;
use crate::value::{OptionValue, ParsedValue, TypeKey, ValueShape};
use crate::ParsedCommand;

/// Boxed error returned by execution hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Hook run for an auto-execute command once a parse succeeded.
pub type ExecuteHook = Arc<dyn Fn(&ParsedCommand) -> Result<(), BoxError> + Send + Sync>;

pub(crate) type Transform = Arc<dyn Fn(ParsedValue) -> ParsedValue + Send + Sync>;

/// One raw token as seen by a resolver.
///
/// `key` is the option name that matched, `value` the token following it (if
/// any). For collection elements `key` is the option name and `value` the
/// element token.
///
/// # Examples
///
/// ```
/// use argtree_core::ArgumentModel;
///
/// let model = ArgumentModel::new("--port", Some("8080"));
/// assert_eq!(model.key, "--port");
/// assert_eq!(model.value.as_deref(), Some("8080"));
/// assert!(model.path.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentModel {
    /// Option name the token was matched against.
    pub key: String,
    /// Value token, if one was available.
    pub value: Option<String>,
    /// Command path active when the token was seen.
    pub path: Vec<String>,
}

impl ArgumentModel {
    /// Creates a model outside of any command path.
    pub fn new(key: &str, value: Option<&str>) -> Self {
        Self {
            key: key.to_string(),
            value: value.map(String::from),
            path: Vec::new(),
        }
    }

    /// Sets the command path.
    pub fn with_path(mut self, path: &[String]) -> Self {
        self.path = path.to_vec();
        self
    }

    /// Returns the value token, or the key when the value is absent.
    pub fn token(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.key)
    }
}

/// Default value of an option.
#[derive(Clone, PartialEq)]
pub enum DefaultValue {
    /// Typed value stored as given.
    Value(ParsedValue),
    /// Raw tokens converted by the option's resolver when applied.
    Literal(Vec<String>),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Literal(tokens) => f.debug_tuple("Literal").field(tokens).finish(),
        }
    }
}

/// Monomorphized entry points captured when an option is declared with `T`.
#[derive(Clone, Copy)]
pub(crate) struct ValueOps {
    pub(crate) arity: fn(&ResolverRegistry, &ArgumentModel) -> Arity,
    pub(crate) resolve:
        fn(&ResolverRegistry, &str, &[ArgumentModel]) -> Result<ParsedValue, Vec<ResolveError>>,
}

impl ValueOps {
    pub(crate) fn of<T: OptionValue>() -> Self {
        Self {
            arity: ResolverRegistry::arity::<T>,
            resolve: ResolverRegistry::resolve_occurrences::<T>,
        }
    }
}

/// Descriptor of one bindable option.
///
/// Built through [`OptionBuilder`](crate::OptionBuilder) inside a
/// [`CommandBuilder`](crate::CommandBuilder).
///
/// # Examples
///
/// ```
/// use argtree_core::{CommandBuilder, ParserOptions};
///
/// let root = CommandBuilder::new("app", &ParserOptions::default())
///     .option::<u16>(|o| o.names("p", "port").required(true))
///     .build()
///     .unwrap();
///
/// let port = root.find_option("--port").unwrap();
/// assert_eq!(port.short_name(), "-p");
/// assert_eq!(port.binding(), "port");
/// assert!(port.is_required());
/// assert!(!port.allows_multiple_values());
/// ```
#[derive(Clone)]
pub struct OptionDescriptor {
    pub(crate) short_name: String,
    pub(crate) long_name: String,
    pub(crate) description: Option<String>,
    pub(crate) required: bool,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) value_type: TypeKey,
    pub(crate) shape: ValueShape,
    pub(crate) order: Option<i32>,
    pub(crate) declaration: usize,
    pub(crate) transform: Option<Transform>,
    pub(crate) binding: String,
    pub(crate) env: Option<String>,
    pub(crate) validators: Vec<NamedValidator>,
    pub(crate) ops: ValueOps,
}

impl OptionDescriptor {
    /// Short form including its prefix (e.g. `-p`).
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Long form including its prefix (e.g. `--port`).
    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    /// Help text.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether a missing value is reported.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Default value applied when the option is absent.
    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Declared value type.
    pub fn value_type(&self) -> TypeKey {
        self.value_type
    }

    /// Shape of the declared value type.
    pub fn shape(&self) -> ValueShape {
        self.shape
    }

    /// `true` for array, list and set shaped options.
    pub fn allows_multiple_values(&self) -> bool {
        self.shape.is_collection()
    }

    /// Explicit resolution order, if one was set.
    pub fn order(&self) -> Option<i32> {
        self.order
    }

    /// Key the resolved value is bound under.
    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// Environment variable consulted when the option is absent.
    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }

    /// Names of the attached validators, in attachment order.
    pub fn validator_names(&self) -> impl Iterator<Item = &str> {
        self.validators.iter().map(|v| v.name())
    }

    /// Checks if `name` is this option's short or long form.
    pub fn matches(&self, name: &str) -> bool {
        self.short_name == name || self.long_name == name
    }

    pub(crate) fn apply_transform(&self, value: ParsedValue) -> ParsedValue {
        match &self.transform {
            Some(transform) => transform(value),
            None => value,
        }
    }

    /// Sort key: explicit orders first (ascending), then declaration order.
    pub(crate) fn resolution_key(&self) -> (bool, i32, usize) {
        match self.order {
            Some(order) => (false, order, self.declaration),
            None => (true, 0, self.declaration),
        }
    }
}

impl fmt::Debug for OptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("short_name", &self.short_name)
            .field("long_name", &self.long_name)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("value_type", &self.value_type.name)
            .field("shape", &self.shape)
            .field("order", &self.order)
            .field("binding", &self.binding)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

/// A node of the command tree.
///
/// # Examples
///
/// ```
/// use argtree_core::{CommandBuilder, ParserOptions};
///
/// let root = CommandBuilder::new("cargo", &ParserOptions::default())
///     .command("build", |c| c.alias("b").command("release", |c| c))
///     .build()
///     .unwrap();
///
/// let release = root.find_descendant(&["build", "release"]).unwrap();
/// assert_eq!(release.path(), vec!["cargo", "build", "release"]);
/// assert_eq!(release.parent_path(), ["cargo", "build"]);
/// assert_eq!(root.matching_children("b").len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct CommandDescriptor {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) description: Option<String>,
    pub(crate) required: bool,
    pub(crate) auto_execute: bool,
    pub(crate) parent_path: Vec<String>,
    pub(crate) children: Vec<CommandDescriptor>,
    pub(crate) options: Vec<OptionDescriptor>,
    pub(crate) hook: Option<ExecuteHook>,
}

impl CommandDescriptor {
    /// Command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternative names.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Help text.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the parent reports this command missing when it is not invoked.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the execution hook is scheduled as soon as the command is reached.
    pub fn is_auto_execute(&self) -> bool {
        self.auto_execute
    }

    /// Execution hook, if one was attached.
    pub fn hook(&self) -> Option<&ExecuteHook> {
        self.hook.as_ref()
    }

    /// Names of the ancestors, root first.
    pub fn parent_path(&self) -> &[String] {
        &self.parent_path
    }

    /// Full path from the root to this command.
    pub fn path(&self) -> Vec<String> {
        let mut path = self.parent_path.clone();
        path.push(self.name.clone());
        path
    }

    /// Full path joined with spaces (e.g. `cargo build`).
    pub fn display_path(&self) -> String {
        self.path().join(" ")
    }

    /// Child commands in declaration order.
    pub fn children(&self) -> &[CommandDescriptor] {
        &self.children
    }

    /// Options in resolution order.
    pub fn options(&self) -> &[OptionDescriptor] {
        &self.options
    }

    /// Checks if `token` is this command's name or one of its aliases.
    pub fn matches(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|a| a == token)
    }

    /// All children whose name or alias equals `token`.
    pub fn matching_children(&self, token: &str) -> Vec<&CommandDescriptor> {
        self.children.iter().filter(|c| c.matches(token)).collect()
    }

    /// Finds a direct child by name or alias.
    pub fn find_child(&self, token: &str) -> Option<&CommandDescriptor> {
        self.children.iter().find(|c| c.matches(token))
    }

    /// Walks `path` (names relative to this command) down the tree.
    pub fn find_descendant<S: AsRef<str>>(&self, path: &[S]) -> Option<&CommandDescriptor> {
        path.iter()
            .try_fold(self, |command, segment| command.find_child(segment.as_ref()))
    }

    /// Finds an option by short or long form, in resolution order.
    pub fn find_option(&self, name: &str) -> Option<&OptionDescriptor> {
        self.options.iter().find(|o| o.matches(name))
    }

    pub(crate) fn option_index(&self, name: &str) -> Option<usize> {
        self.options.iter().position(|o| o.matches(name))
    }

    /// Checks if `token` names an option or a child command of this command.
    pub fn is_known_name(&self, token: &str) -> bool {
        self.find_option(token).is_some() || self.find_child(token).is_some()
    }

    /// Option names and child command names/aliases, used for suggestions.
    pub fn candidate_names(&self) -> Vec<&str> {
        let options = self
            .options
            .iter()
            .flat_map(|o| [o.short_name.as_str(), o.long_name.as_str()]);
        let commands = self
            .children
            .iter()
            .flat_map(|c| std::iter::once(c.name.as_str()).chain(c.aliases.iter().map(String::as_str)));
        options.chain(commands).collect()
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("required", &self.required)
            .field("auto_execute", &self.auto_execute)
            .field("parent_path", &self.parent_path)
            .field("options", &self.options)
            .field("children", &self.children)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{CommandBuilder, ParserOptions};

    fn sample_tree() -> crate::CommandDescriptor {
        CommandBuilder::new("git", &ParserOptions::default())
            .option::<bool>(|o| o.names("v", "verbose"))
            .command("remote", |c| {
                c.command("add", |c| c.option::<String>(|o| o.name("url")))
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_find_option_by_either_form() {
        let tree = sample_tree();
        assert!(tree.find_option("-v").is_some());
        assert!(tree.find_option("--verbose").is_some());
        assert!(tree.find_option("--debug").is_none());
    }

    #[test]
    fn test_parent_path_is_recorded_per_level() {
        let tree = sample_tree();
        let add = tree.find_descendant(&["remote", "add"]).unwrap();
        assert_eq!(add.parent_path(), ["git", "remote"]);
        assert_eq!(add.display_path(), "git remote add");
    }

    #[test]
    fn test_candidate_names_cover_options_and_children() {
        let tree = sample_tree();
        assert_eq!(tree.candidate_names(), vec!["-v", "--verbose", "remote"]);
        assert!(tree.is_known_name("remote"));
        assert!(!tree.is_known_name("add"));
    }
}
