//! Token routing, option matching and value resolution.
//!
//! [`ArgumentManager::parse`] works in two passes over one token vector:
//!
//! 1. **Matching.** Tokens are read left to right against the active command.
//!    A child name or alias routes into that child; an option name captures
//!    its value tokens according to the option's [`Arity`]; anything else is
//!    reported as [`ParseError::UnknownToken`] with suggestions.
//! 2. **Resolution.** Every visited command, root first, resolves its options
//!    in resolution order: captured tokens, else the environment, else the
//!    default, else a missing-required report. Resolved values are
//!    transformed, validated and bound.
//!
//! Errors never stop a parse; all of them end up in [`ParseResult::errors`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::ParsedCommand;
use crate::env::{EnvironmentVariables, ProcessEnvironment};
use crate::error::{Error, ParseError, Result};
use crate::options::ParserOptions;
use crate::resolver::{Arity, ResolverRegistry};
use crate::result::ParseResult;
use crate::suggest::SuggestionEngine;
use crate::types::{ArgumentModel, CommandDescriptor, DefaultValue, OptionDescriptor};
use crate::validator::ValidatorPipeline;
use crate::value::ParsedValue;

/// Entry point tying the registry, parser options and environment together.
///
/// The manager holds no per-parse state; one instance can serve concurrent
/// parses over shared descriptor trees.
///
/// # Examples
///
/// ```
/// use argtree_core::*;
///
/// let options = ParserOptions::default();
/// let root = CommandBuilder::new("app", &options)
///     .option::<bool>(|o| o.name("help"))
///     .build()
///     .unwrap();
///
/// let manager = ArgumentManager::new(ResolverRegistry::with_defaults(), options);
/// let result = manager.parse(&["--hepl"], &root);
///
/// assert!(!result.success());
/// match &result.errors[0] {
///     ParseError::UnknownToken { suggestions, .. } => {
///         assert_eq!(suggestions[0].name, "--help");
///     }
///     other => panic!("unexpected error: {other}"),
/// }
/// ```
#[derive(Clone)]
pub struct ArgumentManager {
    registry: Arc<ResolverRegistry>,
    options: ParserOptions,
    suggestions: SuggestionEngine,
    environment: Arc<dyn EnvironmentVariables>,
}

impl ArgumentManager {
    /// Creates a manager reading the process environment.
    pub fn new(registry: ResolverRegistry, options: ParserOptions) -> Self {
        Self::with_shared_registry(Arc::new(registry), options)
    }

    /// Creates a manager over a registry shared with other managers.
    pub fn with_shared_registry(registry: Arc<ResolverRegistry>, options: ParserOptions) -> Self {
        let suggestions = SuggestionEngine::from_config(&options.suggestions);
        Self {
            registry,
            options,
            suggestions,
            environment: Arc::new(ProcessEnvironment),
        }
    }

    /// Replaces the environment source.
    pub fn with_environment(mut self, environment: impl EnvironmentVariables + 'static) -> Self {
        self.environment = Arc::new(environment);
        self
    }

    /// Resolver registry used for conversions.
    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Parser options in effect.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parses `tokens` against the tree rooted at `root`.
    pub fn parse<S: AsRef<str>>(&self, tokens: &[S], root: &CommandDescriptor) -> ParseResult {
        let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
        let mut errors = Vec::new();
        let frames = self.match_tokens(&tokens, root, &mut errors);

        let mut bound = Vec::with_capacity(frames.len());
        let mut scheduled = Vec::new();
        for (depth, frame) in frames.iter().enumerate() {
            let routed = frames.get(depth + 1).map(|next| next.command);
            self.check_required_children(frame.command, routed, &mut errors);
            bound.push(self.resolve_frame(frame, &mut errors));
            if frame.command.is_auto_execute() {
                scheduled.push(frame.command.path());
            }
        }

        let command = bound
            .into_iter()
            .rev()
            .fold(None, |child: Option<ParsedCommand>, mut parent| {
                parent.subcommand = child.map(Box::new);
                Some(parent)
            })
            .unwrap_or_default();

        debug!(
            command = %root.name(),
            active = %command.deepest().path.join(" "),
            errors = errors.len(),
            scheduled = scheduled.len(),
            "Parse finished"
        );

        ParseResult {
            command,
            errors,
            scheduled,
        }
    }

    /// Runs the hooks of every scheduled command, root first, and returns how
    /// many ran.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseFailed`] without running anything when `result`
    /// carries parse errors, and [`Error::Execution`] for the first hook that
    /// fails (later hooks are skipped).
    pub fn execute(&self, result: &ParseResult, root: &CommandDescriptor) -> Result<usize> {
        if !result.success() {
            return Err(Error::ParseFailed(result.errors.len()));
        }

        let mut executed = 0;
        for path in &result.scheduled {
            let relative = path.get(1..).unwrap_or_default();
            let (Some(descriptor), Some(parsed)) = (
                root.find_descendant(relative),
                result.command.find(relative),
            ) else {
                warn!(path = %path.join(" "), "Scheduled command not found in tree");
                continue;
            };
            let Some(hook) = descriptor.hook() else {
                continue;
            };

            debug!(command = %descriptor.display_path(), "Executing command");
            (hook.as_ref())(parsed).map_err(|err| Error::Execution {
                command: descriptor.display_path(),
                message: err.to_string(),
            })?;
            executed += 1;
        }
        Ok(executed)
    }

    fn match_tokens<'t>(
        &self,
        tokens: &[&str],
        root: &'t CommandDescriptor,
        errors: &mut Vec<ParseError>,
    ) -> Vec<Frame<'t>> {
        let mut frames = vec![Frame::new(root)];
        let mut index = 0;

        while index < tokens.len() {
            let token = tokens[index];
            index += 1;
            let Some(frame) = frames.last_mut() else {
                break;
            };
            let command = frame.command;

            let children = command.matching_children(token);
            if let Some(&child) = children.first() {
                if children.len() > 1 {
                    errors.push(ParseError::AmbiguousCommand {
                        token: token.to_string(),
                        candidates: children.iter().map(|c| c.name().to_string()).collect(),
                    });
                }
                debug!(token, command = %child.display_path(), "Routed into subcommand");
                frames.push(Frame::new(child));
                continue;
            }

            if let Some(slot) = command.option_index(token) {
                let option = &command.options()[slot];
                index += self.capture(frame, slot, option, token, &tokens[index..]);
                continue;
            }

            let inline = self
                .split_inline(token)
                .and_then(|(name, value)| Some((command.option_index(name)?, name, value)));
            if let Some((slot, name, value)) = inline {
                let model = ArgumentModel::new(name, Some(value)).with_path(&frame.path);
                frame.seen_mut(slot).push(model);
                continue;
            }

            let lookup = self.split_inline(token).map_or(token, |(name, _)| name);
            let suggestions = self.suggestions.suggest(lookup, command.candidate_names());
            debug!(token, path = %command.display_path(), suggestions = suggestions.len(), "Unknown token");
            errors.push(ParseError::UnknownToken {
                token: token.to_string(),
                path: command.display_path(),
                suggestions,
            });
        }

        frames
    }

    /// Records one occurrence of `option` and returns how many of `rest` it
    /// consumed.
    fn capture(
        &self,
        frame: &mut Frame<'_>,
        slot: usize,
        option: &OptionDescriptor,
        name: &str,
        rest: &[&str],
    ) -> usize {
        let command = frame.command;
        let next = rest
            .first()
            .copied()
            .filter(|token| !self.is_boundary(command, token));
        let probe = ArgumentModel::new(name, next);

        match (option.ops.arity)(self.registry.as_ref(), &probe) {
            Arity::Flag => {
                let model = ArgumentModel::new(name, None).with_path(&frame.path);
                frame.seen_mut(slot).push(model);
                0
            }
            Arity::Single => {
                let model = probe.with_path(&frame.path);
                frame.seen_mut(slot).push(model);
                usize::from(next.is_some())
            }
            Arity::Greedy => {
                let elements: Vec<ArgumentModel> = rest
                    .iter()
                    .take_while(|token| !self.is_boundary(command, token))
                    .map(|token| ArgumentModel::new(name, Some(*token)).with_path(&frame.path))
                    .collect();
                let consumed = elements.len();
                frame.seen_mut(slot).extend(elements);
                consumed
            }
        }
    }

    /// Tokens that end a value run: names known to the active command, in
    /// either the plain or the inline form.
    fn is_boundary(&self, command: &CommandDescriptor, token: &str) -> bool {
        command.is_known_name(token)
            || self
                .split_inline(token)
                .is_some_and(|(name, _)| command.find_option(name).is_some())
    }

    fn split_inline<'a>(&self, token: &'a str) -> Option<(&'a str, &'a str)> {
        if !self.options.allow_inline_values {
            return None;
        }
        token.split_once('=').filter(|(name, _)| !name.is_empty())
    }

    fn check_required_children(
        &self,
        command: &CommandDescriptor,
        routed: Option<&CommandDescriptor>,
        errors: &mut Vec<ParseError>,
    ) {
        if routed.is_some() {
            return;
        }
        for child in command.children().iter().filter(|c| c.is_required()) {
            errors.push(ParseError::MissingRequiredCommand {
                command: child.name().to_string(),
                path: command.display_path(),
            });
        }
    }

    fn resolve_frame(&self, frame: &Frame<'_>, errors: &mut Vec<ParseError>) -> ParsedCommand {
        let command = frame.command;
        let mut values = BTreeMap::new();

        for (slot, option) in command.options().iter().enumerate() {
            let resolved = match self.source(frame, slot, option) {
                Source::Tokens(models) => {
                    (option.ops.resolve)(self.registry.as_ref(), option.long_name(), &models)
                }
                Source::Value(value) => Ok(value),
                Source::Missing => {
                    if option.is_required() {
                        debug!(option = %option.long_name(), path = %command.display_path(), "Missing required option");
                        errors.push(ParseError::MissingRequiredOption {
                            option: option.long_name().to_string(),
                            path: command.display_path(),
                        });
                    }
                    continue;
                }
            };

            match resolved {
                Ok(value) => {
                    let value = option.apply_transform(value);
                    for failure in ValidatorPipeline::for_option(option).run(&value) {
                        errors.push(ParseError::Validation {
                            option: option.long_name().to_string(),
                            validator: failure.validator,
                            message: failure.message,
                        });
                    }
                    values.insert(option.binding().to_string(), value);
                }
                Err(failures) => {
                    for failure in failures {
                        debug!(option = %failure.option, token = %failure.token, reason = %failure.reason, "Resolution failed");
                        errors.push(ParseError::ResolveFailure(failure));
                    }
                }
            }
        }

        ParsedCommand {
            name: command.name().to_string(),
            path: frame.path.clone(),
            values,
            subcommand: None,
        }
    }

    /// Picks where an option's value comes from: input, environment, default.
    fn source(&self, frame: &Frame<'_>, slot: usize, option: &OptionDescriptor) -> Source {
        let literal = |token: &str| {
            ArgumentModel::new(option.long_name(), Some(token)).with_path(&frame.path)
        };

        if let Some(models) = &frame.seen[slot] {
            return Source::Tokens(models.clone());
        }

        if let Some(raw) = option.env().and_then(|var| self.environment.lookup(var)) {
            let models = if option.allows_multiple_values() {
                raw.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(literal)
                    .collect()
            } else {
                vec![literal(&raw)]
            };
            return Source::Tokens(models);
        }

        match option.default_value() {
            Some(DefaultValue::Value(value)) => Source::Value(value.clone()),
            Some(DefaultValue::Literal(tokens)) => {
                Source::Tokens(tokens.iter().map(|t| literal(t)).collect())
            }
            None => Source::Missing,
        }
    }
}

impl Default for ArgumentManager {
    /// Built-in resolvers, default parser options, process environment.
    fn default() -> Self {
        Self::new(ResolverRegistry::with_defaults(), ParserOptions::default())
    }
}

impl std::fmt::Debug for ArgumentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentManager")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .field("suggestions", &self.suggestions)
            .finish_non_exhaustive()
    }
}

/// Matching state of one visited command.
struct Frame<'t> {
    command: &'t CommandDescriptor,
    path: Vec<String>,
    seen: Vec<Option<Vec<ArgumentModel>>>,
}

impl<'t> Frame<'t> {
    fn new(command: &'t CommandDescriptor) -> Self {
        Self {
            command,
            path: command.path(),
            seen: vec![None; command.options().len()],
        }
    }

    fn seen_mut(&mut self, slot: usize) -> &mut Vec<ArgumentModel> {
        self.seen[slot].get_or_insert_with(Vec::new)
    }
}

enum Source {
    Tokens(Vec<ArgumentModel>),
    Value(ParsedValue),
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommandBuilder, MapEnvironment, validators};

    fn manager() -> ArgumentManager {
        ArgumentManager::default().with_environment(MapEnvironment::new())
    }

    fn options() -> ParserOptions {
        ParserOptions::default()
    }

    #[test]
    fn test_flag_does_not_consume_subcommand() {
        let root = CommandBuilder::new("app", &options())
            .option::<bool>(|o| o.names("v", "verbose"))
            .command("run", |c| c)
            .build()
            .unwrap();
        let result = manager().parse(&["--verbose", "run"], &root);
        assert!(result.success(), "{:?}", result.errors);
        assert!(result.command.flag("verbose"));
        assert_eq!(result.active().name, "run");
    }

    #[test]
    fn test_shared_alias_is_reported_and_routes_to_first() {
        let root = CommandBuilder::new("app", &options())
            .command("build", |c| c.alias("b").option::<u8>(|o| o.name("jobs")))
            .command("bench", |c| c.alias("b"))
            .build_unchecked();
        let result = manager().parse(&["b", "--jobs", "4"], &root);

        assert_eq!(
            result.errors,
            vec![ParseError::AmbiguousCommand {
                token: "b".to_string(),
                candidates: vec!["build".to_string(), "bench".to_string()],
            }]
        );
        assert_eq!(result.active().name, "build");
        assert_eq!(result.active().get::<u8>("jobs"), Some(&4));
    }

    #[test]
    fn test_bool_literal_is_consumed() {
        let root = CommandBuilder::new("app", &options())
            .option::<bool>(|o| o.name("color"))
            .build()
            .unwrap();
        let result = manager().parse(&["--color", "off"], &root);
        assert!(result.success());
        assert_eq!(result.command.get::<bool>("color"), Some(&false));
    }

    #[test]
    fn test_inline_value() {
        let root = CommandBuilder::new("app", &options())
            .option::<u16>(|o| o.names("p", "port"))
            .build()
            .unwrap();
        let result = manager().parse(&["--port=8080"], &root);
        assert!(result.success());
        assert_eq!(result.command.get::<u16>("port"), Some(&8080));

        let strict = ParserOptions {
            allow_inline_values: false,
            ..options()
        };
        let result = ArgumentManager::new(ResolverRegistry::with_defaults(), strict)
            .parse(&["--port=8080"], &root);
        assert!(matches!(result.errors[0], ParseError::UnknownToken { .. }));
    }

    #[test]
    fn test_scalar_stops_at_known_name() {
        let root = CommandBuilder::new("app", &options())
            .option::<String>(|o| o.name("name"))
            .option::<bool>(|o| o.name("dry"))
            .build()
            .unwrap();
        let result = manager().parse(&["--name", "--dry"], &root);
        assert!(result.command.flag("dry"));
        assert_eq!(result.errors.len(), 1);
        let ParseError::ResolveFailure(failure) = &result.errors[0] else {
            panic!("expected a resolve failure, got {:?}", result.errors[0]);
        };
        assert_eq!(failure.reason, "missing value");
    }

    #[test]
    fn test_unconvertible_value_is_consumed() {
        let root = CommandBuilder::new("app", &options())
            .option::<u32>(|o| o.name("count"))
            .build()
            .unwrap();
        let result = manager().parse(&["--count", "many"], &root);
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(&result.errors[0], ParseError::ResolveFailure(e) if e.token == "many"));
    }

    #[test]
    fn test_repeated_collection_accumulates() {
        let root = CommandBuilder::new("app", &options())
            .option::<Vec<String>>(|o| o.name("tag"))
            .option::<u8>(|o| o.name("level"))
            .build()
            .unwrap();
        let result = manager().parse(&["--tag", "a", "--level", "1", "--tag", "b", "--level", "3"], &root);
        assert!(result.success());
        assert_eq!(
            result.command.get::<Vec<String>>("tag"),
            Some(&vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(result.command.get::<u8>("level"), Some(&3));
    }

    #[test]
    fn test_environment_then_default() {
        let root = CommandBuilder::new("app", &options())
            .option::<u16>(|o| o.name("port").env("APP_PORT").default(80))
            .option::<Vec<u8>>(|o| o.name("ids").env("APP_IDS"))
            .untyped_option::<u32>(|o| o.name("retries").default_literal("3"))
            .build()
            .unwrap();

        let env = MapEnvironment::new().with("APP_PORT", "9000").with("APP_IDS", "1, 2,3");
        let result = manager().with_environment(env).parse::<&str>(&[], &root);
        assert!(result.success(), "{:?}", result.errors);
        assert_eq!(result.command.get::<u16>("port"), Some(&9000));
        assert_eq!(result.command.get::<Vec<u8>>("ids"), Some(&vec![1, 2, 3]));
        assert_eq!(result.command.get::<u32>("retries"), Some(&3));

        let result = manager().parse::<&str>(&[], &root);
        assert_eq!(result.command.get::<u16>("port"), Some(&80));
        assert!(!result.command.contains("ids"));
    }

    #[test]
    fn test_validation_failures_are_all_reported() {
        let root = CommandBuilder::new("app", &options())
            .option::<i64>(|o| {
                o.name("n")
                    .validate("range", validators::range(0, 10))
                    .validate("even", |v: &i64| {
                        if v % 2 == 0 { Ok(()) } else { Err("odd".to_string()) }
                    })
            })
            .build()
            .unwrap();
        let result = manager().parse(&["--n", "11"], &root);
        let validators: Vec<_> = result
            .errors
            .iter()
            .filter_map(|e| match e {
                ParseError::Validation { validator, .. } => Some(validator.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(validators, vec!["range", "even"]);
        assert_eq!(result.command.get::<i64>("n"), Some(&11));
    }

    #[test]
    fn test_required_child_command() {
        let root = CommandBuilder::new("app", &options())
            .command("run", |c| c.required(true))
            .build()
            .unwrap();
        let result = manager().parse::<&str>(&[], &root);
        assert_eq!(
            result.errors,
            vec![ParseError::MissingRequiredCommand {
                command: "run".to_string(),
                path: "app".to_string()
            }]
        );
        assert!(manager().parse(&["run"], &root).success());
    }

    #[test]
    fn test_parent_options_are_not_matched_in_child() {
        let root = CommandBuilder::new("app", &options())
            .option::<bool>(|o| o.name("verbose"))
            .command("run", |c| c)
            .build()
            .unwrap();
        let result = manager().parse(&["run", "--verbose"], &root);
        assert!(matches!(
            &result.errors[0],
            ParseError::UnknownToken { path, .. } if path == "app run"
        ));
    }

    #[test]
    fn test_execute_requires_success() {
        let root = CommandBuilder::new("app", &options())
            .option::<u8>(|o| o.name("n").required(true))
            .auto_execute(true)
            .on_execute(|_| Ok(()))
            .build()
            .unwrap();
        let result = manager().parse::<&str>(&[], &root);
        assert_eq!(result.scheduled, vec![vec!["app".to_string()]]);
        assert!(matches!(
            manager().execute(&result, &root),
            Err(Error::ParseFailed(1))
        ));
    }
}
