//! Fluent builders for option and command descriptors.
//!
//! Every builder method sets one attribute and hands the builder back. No
//! checks run while building; [`CommandBuilder::build`] finalizes the whole
//! tree once and reports the first configuration violation.
//!
//! Options come in two views over the same draft: the typed
//! [`OptionBuilder<T>`] (typed defaults, transforms and validators) and the
//! [`UntypedOptionBuilder`] (untyped literal defaults), converted explicitly
//! with [`OptionBuilder::untyped`] and [`UntypedOptionBuilder::typed`].
//!
//! # Example
//!
//! ```
//! use argtree_core::*;
//!
//! let options = ParserOptions::default();
//! let root = CommandBuilder::new("deploy", &options)
//!     .option::<bool>(|o| o.names("v", "verbose").description("Chatty output"))
//!     .option::<Vec<String>>(|o| o.name("tags"))
//!     .untyped_option::<u16>(|o| o.names("p", "port").default_literal("8080"))
//!     .command("rollback", |c| {
//!         c.option::<u32>(|o| o.name("steps").required(true).order(0))
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(root.options().len(), 3);
//! assert!(root.find_option("--tags").unwrap().allows_multiple_values());
//! assert!(root.find_child("rollback").is_some());
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::options::ParserOptions;
use crate::types::{
    BoxError, CommandDescriptor, DefaultValue, OptionDescriptor, Transform, ValueOps,
};
use crate::validate::validate_tree;
use crate::validator::{NamedValidator, Validator};
use crate::value::{OptionValue, ParsedValue, TypeKey, ValueShape};
use crate::ParsedCommand;

/// Option state shared by the typed and untyped views.
#[derive(Clone)]
struct OptionDraft {
    parser: Arc<ParserOptions>,
    short_name: Option<String>,
    long_name: Option<String>,
    description: Option<String>,
    required: bool,
    default: Option<DefaultValue>,
    value_type: TypeKey,
    shape: ValueShape,
    order: Option<i32>,
    transform: Option<Transform>,
    binding: Option<String>,
    env: Option<String>,
    validators: Vec<NamedValidator>,
    ops: ValueOps,
}

impl OptionDraft {
    fn new<T: OptionValue>(parser: Arc<ParserOptions>) -> Self {
        Self {
            parser,
            short_name: None,
            long_name: None,
            description: None,
            required: false,
            default: None,
            value_type: TypeKey::of::<T>(),
            shape: T::SHAPE,
            order: None,
            transform: None,
            binding: None,
            env: None,
            validators: Vec::new(),
            ops: ValueOps::of::<T>(),
        }
    }

    fn set_names(&mut self, short: &str, long: &str) {
        self.short_name = Some(self.parser.short_name(short));
        self.long_name = Some(self.parser.long_name(long));
    }

    fn into_descriptor(self, declaration: usize) -> OptionDescriptor {
        let long_name = self.long_name.unwrap_or_default();
        let binding = self
            .binding
            .unwrap_or_else(|| self.parser.strip_prefix(&long_name).to_string());
        OptionDescriptor {
            short_name: self.short_name.unwrap_or_default(),
            long_name,
            description: self.description,
            required: self.required,
            default: self.default,
            value_type: self.value_type,
            shape: self.shape,
            order: self.order,
            declaration,
            transform: self.transform,
            binding,
            env: self.env,
            validators: self.validators,
            ops: self.ops,
        }
    }
}

/// Typed view of an option under construction.
pub struct OptionBuilder<T> {
    draft: OptionDraft,
    _marker: PhantomData<fn() -> T>,
}

impl<T: OptionValue> OptionBuilder<T> {
    /// Starts an option using the prefixes of `parser`.
    pub fn new(parser: &ParserOptions) -> Self {
        Self::from_draft(OptionDraft::new::<T>(Arc::new(parser.clone())))
    }

    fn from_draft(draft: OptionDraft) -> Self {
        Self {
            draft,
            _marker: PhantomData,
        }
    }

    /// Sets both names from one text: `-name` and `--name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use argtree_core::{OptionBuilder, ParserOptions};
    ///
    /// let option = OptionBuilder::<bool>::new(&ParserOptions::default())
    ///     .name("force")
    ///     .into_descriptor();
    /// assert_eq!(option.short_name(), "-force");
    /// assert_eq!(option.long_name(), "--force");
    /// ```
    pub fn name(mut self, name: &str) -> Self {
        self.draft.set_names(name, name);
        self
    }

    /// Sets the short and long names independently.
    pub fn names(mut self, short: &str, long: &str) -> Self {
        self.draft.set_names(short, long);
        self
    }

    /// Sets the help text.
    pub fn description(mut self, description: &str) -> Self {
        self.draft.description = Some(description.to_string());
        self
    }

    /// Toggles the required check.
    pub fn required(mut self, required: bool) -> Self {
        self.draft.required = required;
        self
    }

    /// Stores a typed default value, applied when the option is absent.
    pub fn default(mut self, value: T) -> Self {
        self.draft.default = Some(DefaultValue::Value(ParsedValue::new(value)));
        self
    }

    /// Sets the explicit resolution order.
    pub fn order(mut self, order: i32) -> Self {
        self.draft.order = Some(order);
        self
    }

    /// Applies `transform` to every resolved value (defaults included) before
    /// it is bound.
    pub fn transform(mut self, transform: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        let erased: Transform = Arc::new(move |value: ParsedValue| {
            match value.downcast_ref::<T>() {
                Some(typed) => ParsedValue::new(transform(typed.clone())),
                None => value,
            }
        });
        self.draft.transform = Some(erased);
        self
    }

    /// Attaches a named validator.
    pub fn validate(mut self, name: &str, validator: impl Validator<T> + 'static) -> Self {
        self.draft.validators.push(NamedValidator::new::<T>(name, validator));
        self
    }

    /// Names the environment variable consulted when the option is absent.
    pub fn env(mut self, variable: &str) -> Self {
        self.draft.env = Some(variable.to_string());
        self
    }

    /// Overrides the binding target (defaults to the long name without prefix).
    pub fn bind_to(mut self, key: &str) -> Self {
        self.draft.binding = Some(key.to_string());
        self
    }

    /// Switches to the untyped view.
    pub fn untyped(self) -> UntypedOptionBuilder {
        UntypedOptionBuilder { draft: self.draft }
    }

    /// Finishes a standalone option (declaration index 0).
    pub fn into_descriptor(self) -> OptionDescriptor {
        self.draft.into_descriptor(0)
    }
}

/// Untyped view of an option under construction.
pub struct UntypedOptionBuilder {
    draft: OptionDraft,
}

impl UntypedOptionBuilder {
    /// See [`OptionBuilder::name`].
    pub fn name(mut self, name: &str) -> Self {
        self.draft.set_names(name, name);
        self
    }

    /// See [`OptionBuilder::names`].
    pub fn names(mut self, short: &str, long: &str) -> Self {
        self.draft.set_names(short, long);
        self
    }

    /// Sets the help text.
    pub fn description(mut self, description: &str) -> Self {
        self.draft.description = Some(description.to_string());
        self
    }

    /// Toggles the required check.
    pub fn required(mut self, required: bool) -> Self {
        self.draft.required = required;
        self
    }

    /// Stores an unconverted default token; it goes through the option's
    /// resolver when applied.
    pub fn default_literal(self, token: &str) -> Self {
        self.default_literals([token])
    }

    /// Stores several unconverted default tokens, for collection options.
    pub fn default_literals<'a>(mut self, tokens: impl IntoIterator<Item = &'a str>) -> Self {
        self.draft.default = Some(DefaultValue::Literal(
            tokens.into_iter().map(String::from).collect(),
        ));
        self
    }

    /// Sets the explicit resolution order.
    pub fn order(mut self, order: i32) -> Self {
        self.draft.order = Some(order);
        self
    }

    /// Names the environment variable consulted when the option is absent.
    pub fn env(mut self, variable: &str) -> Self {
        self.draft.env = Some(variable.to_string());
        self
    }

    /// Overrides the binding target.
    pub fn bind_to(mut self, key: &str) -> Self {
        self.draft.binding = Some(key.to_string());
        self
    }

    /// Declared value type of the option.
    pub fn value_type(&self) -> TypeKey {
        self.draft.value_type
    }

    /// Returns to the typed view when `T` is the declared type.
    ///
    /// # Errors
    ///
    /// Hands the builder back unchanged when `T` does not match.
    pub fn typed<T: OptionValue>(self) -> Result<OptionBuilder<T>, Self> {
        if self.draft.value_type == TypeKey::of::<T>() {
            Ok(OptionBuilder::from_draft(self.draft))
        } else {
            Err(self)
        }
    }
}

/// Builder for one command and, recursively, its subcommands.
pub struct CommandBuilder {
    parser: Arc<ParserOptions>,
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    required: bool,
    auto_execute: bool,
    hook: Option<crate::types::ExecuteHook>,
    options: Vec<OptionDraft>,
    children: Vec<CommandBuilder>,
}

impl CommandBuilder {
    /// Starts a root command whose options use the prefixes of `parser`.
    pub fn new(name: &str, parser: &ParserOptions) -> Self {
        Self::with_parser(name, Arc::new(parser.clone()))
    }

    fn with_parser(name: &str, parser: Arc<ParserOptions>) -> Self {
        Self {
            parser,
            name: name.to_string(),
            aliases: Vec::new(),
            description: None,
            required: false,
            auto_execute: false,
            hook: None,
            options: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Sets the help text.
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Adds an alternative name.
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Marks the command as required under its parent.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Schedules the execution hook whenever the command is reached.
    pub fn auto_execute(mut self, auto_execute: bool) -> Self {
        self.auto_execute = auto_execute;
        self
    }

    /// Sets the execution hook.
    pub fn on_execute(
        mut self,
        hook: impl Fn(&ParsedCommand) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Declares an option of type `T` configured through the typed view.
    pub fn option<T: OptionValue>(
        mut self,
        configure: impl FnOnce(OptionBuilder<T>) -> OptionBuilder<T>,
    ) -> Self {
        let builder = OptionBuilder::from_draft(OptionDraft::new::<T>(Arc::clone(&self.parser)));
        self.options.push(configure(builder).draft);
        self
    }

    /// Declares an option of type `T` configured through the untyped view.
    pub fn untyped_option<T: OptionValue>(
        mut self,
        configure: impl FnOnce(UntypedOptionBuilder) -> UntypedOptionBuilder,
    ) -> Self {
        let builder = OptionBuilder::<T>::from_draft(OptionDraft::new::<T>(Arc::clone(&self.parser)));
        self.options.push(configure(builder.untyped()).draft);
        self
    }

    /// Declares a subcommand.
    pub fn command(
        mut self,
        name: &str,
        configure: impl FnOnce(CommandBuilder) -> CommandBuilder,
    ) -> Self {
        let child = CommandBuilder::with_parser(name, Arc::clone(&self.parser));
        self.children.push(configure(child));
        self
    }

    /// Finalizes the tree.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found by
    /// [`validate_tree`](crate::validate_tree).
    pub fn build(self) -> Result<CommandDescriptor, ConfigError> {
        self.try_build().map_err(|mut errors| errors.swap_remove(0))
    }

    /// Finalizes the tree, reporting every violation instead of the first.
    ///
    /// # Errors
    ///
    /// Returns all [`ConfigError`]s in depth-first order; the list is never
    /// empty.
    pub fn try_build(self) -> Result<CommandDescriptor, Vec<ConfigError>> {
        let parser = Arc::clone(&self.parser);
        let root = self.build_unchecked();
        let errors = validate_tree(&root, &parser);
        if errors.is_empty() { Ok(root) } else { Err(errors) }
    }

    pub(crate) fn build_unchecked(self) -> CommandDescriptor {
        self.assemble(Vec::new())
    }

    fn assemble(self, parent_path: Vec<String>) -> CommandDescriptor {
        let mut options: Vec<OptionDescriptor> = self
            .options
            .into_iter()
            .enumerate()
            .map(|(index, draft)| draft.into_descriptor(index))
            .collect();
        options.sort_by_key(OptionDescriptor::resolution_key);

        let mut child_path = parent_path.clone();
        child_path.push(self.name.clone());
        let children = self
            .children
            .into_iter()
            .map(|child| child.assemble(child_path.clone()))
            .collect();

        CommandDescriptor {
            name: self.name,
            aliases: self.aliases,
            description: self.description,
            required: self.required,
            auto_execute: self.auto_execute,
            parent_path,
            children,
            options,
            hook: self.hook,
        }
    }
}
