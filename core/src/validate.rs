//! Descriptor tree finalization checks.
//!
//! Runs once, when [`CommandBuilder::build`](crate::CommandBuilder::build)
//! finalizes a tree, and catches configuration mistakes such as unnamed
//! options, duplicate option names, duplicate subcommands and option names
//! shadowing subcommands. A tree that passes is safe to parse with.
//!
//! # Examples
//!
//! ```
//! use argtree_core::*;
//!
//! let options = ParserOptions::default();
//! let err = CommandBuilder::new("git", &options)
//!     .option::<bool>(|o| o.names("v", "verbose"))
//!     .option::<bool>(|o| o.names("v", "version"))
//!     .build()
//!     .unwrap_err();
//! assert_eq!(
//!     err,
//!     ConfigError::DuplicateOption { command: "git".into(), name: "-v".into() }
//! );
//! ```

use std::collections::HashSet;

use tracing::debug;

use crate::error::ConfigError;
use crate::options::ParserOptions;
use crate::types::{CommandDescriptor, OptionDescriptor};

/// Validates a whole descriptor tree and returns every violation found, in
/// depth-first order.
pub fn validate_tree(root: &CommandDescriptor, options: &ParserOptions) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    validate_command(root, options, &mut errors);
    if !errors.is_empty() {
        debug!(command = %root.name(), errors = errors.len(), "Descriptor tree rejected");
    }
    errors
}

fn validate_command(
    command: &CommandDescriptor,
    options: &ParserOptions,
    errors: &mut Vec<ConfigError>,
) {
    let path = command.display_path();

    if command.name.trim().is_empty() {
        errors.push(ConfigError::EmptyCommandName(
            command.parent_path.join(" "),
        ));
    }

    validate_options(&path, &command.options, options, errors);

    let mut seen: HashSet<&str> = HashSet::new();
    for child in &command.children {
        for name in std::iter::once(&child.name).chain(child.aliases.iter()) {
            if !seen.insert(name.as_str()) {
                errors.push(ConfigError::DuplicateCommand {
                    parent: path.clone(),
                    name: name.clone(),
                });
            }
            if command.find_option(name).is_some() {
                errors.push(ConfigError::NameCollision {
                    command: path.clone(),
                    name: name.clone(),
                });
            }
        }
        validate_command(child, options, errors);
    }
}

fn validate_options(
    path: &str,
    command_options: &[OptionDescriptor],
    options: &ParserOptions,
    errors: &mut Vec<ConfigError>,
) {
    let mut names = HashSet::new();
    let mut bindings = HashSet::new();

    for option in command_options {
        if option.short_name.is_empty() || option.long_name.is_empty() {
            errors.push(ConfigError::MissingOptionName {
                command: path.to_string(),
                binding: option.binding.clone(),
            });
            continue;
        }

        for name in [&option.short_name, &option.long_name] {
            if !is_valid_name(name, options) {
                errors.push(ConfigError::InvalidOptionName {
                    command: path.to_string(),
                    name: name.clone(),
                });
            } else if !names.insert(name.as_str()) {
                errors.push(ConfigError::DuplicateOption {
                    command: path.to_string(),
                    name: name.clone(),
                });
            }
        }

        if !bindings.insert(option.binding.as_str()) {
            errors.push(ConfigError::DuplicateBinding {
                command: path.to_string(),
                binding: option.binding.clone(),
            });
        }
    }
}

fn is_valid_name(name: &str, options: &ParserOptions) -> bool {
    let has_prefix = name.starts_with(options.prefix_short.as_str())
        || name.starts_with(options.prefix_long.as_str());
    has_prefix
        && name != options.prefix_short
        && name != options.prefix_long
        && !name.chars().any(char::is_whitespace)
}
