//! Typed command-line resolution engine.
//!
//! This crate turns a vector of raw tokens into strongly-typed option values
//! routed through a tree of subcommands:
//!
//! - [`CommandBuilder`] / [`OptionBuilder`]: fluent DSL declaring commands
//!   and typed options; [`CommandBuilder::build`] finalizes the tree into an
//!   immutable [`CommandDescriptor`].
//! - [`ResolverRegistry`]: converts tokens into values: an exact
//!   [`TokenResolver`] first, then the collection shape of the type, then the
//!   type's own [`OptionValue::from_token`] fallback.
//! - [`ArgumentManager`]: routes tokens to the deepest matching subcommand,
//!   matches options, applies environment values and defaults, transforms,
//!   validates and binds. Every problem is accumulated in the
//!   [`ParseResult`]; nothing aborts a parse.
//! - [`SuggestionEngine`]: ranks near matches for unknown tokens by
//!   Damerau–Levenshtein distance.
//! - [`ValidatorPipeline`]: runs every validator attached to an option.
//!
//! Finalization ([`validate_tree`]) catches configuration mistakes such as
//! duplicate option names, unnamed options and name collisions.
//!
//! # Example
//!
//! ```
//! use argtree_core::*;
//!
//! let options = ParserOptions::default();
//! let root = CommandBuilder::new("cargo", &options)
//!     .option::<bool>(|o| o.names("v", "verbose"))
//!     .command("build", |c| {
//!         c.option::<Vec<String>>(|o| o.name("features"))
//!             .command("release", |c| {
//!                 c.option::<u8>(|o| o.names("x", "opt-level").default(3))
//!             })
//!     })
//!     .build()
//!     .unwrap();
//!
//! let manager = ArgumentManager::new(ResolverRegistry::with_defaults(), options);
//! let result = manager.parse(&["-v", "build", "release", "-x", "1"], &root);
//!
//! assert!(result.success());
//! assert!(result.command.flag("verbose"));
//! assert_eq!(result.active().path, vec!["cargo", "build", "release"]);
//! assert_eq!(result.active().get::<u8>("opt-level"), Some(&1));
//! ```

mod builder;
mod env;
mod error;
mod manager;
mod options;
mod resolver;
mod result;
mod suggest;
mod types;
mod usage;
mod validate;
mod validator;
mod value;

pub use builder::{CommandBuilder, OptionBuilder, UntypedOptionBuilder};
pub use env::{EnvironmentVariables, MapEnvironment, ProcessEnvironment};
pub use error::{ConfigError, Error, ParseError, ResolveError, Result};
pub use manager::ArgumentManager;
pub use options::{ParserOptions, SuggestionConfig};
pub use resolver::{
    Arity, BoolResolver, DecimalResolver, FloatResolver, IntegerResolver, ResolverRegistry,
    StringResolver, TokenResolver,
};
pub use result::{ParseResult, ParsedCommand};
pub use suggest::{Suggestion, SuggestionEngine};
pub use types::*;
pub use usage::UsagePrinter;
pub use validate::validate_tree;
pub use validator::{NamedValidator, ValidationFailure, Validator, ValidatorPipeline, validators};
pub use value::{AnyValue, OptionValue, ParsedValue, TypeKey, ValueShape};

pub use rust_decimal::Decimal;
