use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use argtree_core::*;
use rayon::prelude::*;

fn options() -> ParserOptions {
    ParserOptions::default()
}

fn manager() -> ArgumentManager {
    ArgumentManager::default().with_environment(MapEnvironment::new())
}

fn cargo_tree() -> CommandDescriptor {
    CommandBuilder::new("cargo", &options())
        .option::<bool>(|o| o.names("v", "verbose"))
        .option::<bool>(|o| o.names("h", "help"))
        .command("build", |c| {
            c.alias("b")
                .option::<Vec<String>>(|o| o.names("t", "tags"))
                .option::<bool>(|o| o.name("verbose"))
                .command("release", |c| c.option::<i32>(|o| o.name("x")))
        })
        .command("test", |c| c.option::<String>(|o| o.name("filter")))
        .build()
        .unwrap()
}

#[test]
fn test_builtin_scalars_roundtrip() {
    let root = CommandBuilder::new("app", &options())
        .option::<i8>(|o| o.name("a"))
        .option::<u64>(|o| o.name("b"))
        .option::<f64>(|o| o.name("c"))
        .option::<Decimal>(|o| o.name("d"))
        .option::<String>(|o| o.name("e"))
        .option::<char>(|o| o.name("f"))
        .option::<PathBuf>(|o| o.name("g"))
        .option::<IpAddr>(|o| o.name("h"))
        .build()
        .unwrap();

    let result = manager().parse(
        &[
            "--a", "-42", "--b", "42", "--c", "4.25", "--d", "19.99", "--e", "42", "--f", "z",
            "--g", "/var/log", "--h", "127.0.0.1",
        ],
        &root,
    );
    assert!(result.success(), "{:?}", result.errors);

    let values = &result.command;
    assert_eq!(values.get::<i8>("a"), Some(&-42));
    assert_eq!(values.get::<u64>("b"), Some(&42));
    assert_eq!(values.get::<f64>("c"), Some(&4.25));
    assert_eq!(values.get::<Decimal>("d").map(ToString::to_string).as_deref(), Some("19.99"));
    assert_eq!(values.get::<String>("e").map(String::as_str), Some("42"));
    assert_eq!(values.get::<char>("f"), Some(&'z'));
    assert_eq!(values.get::<PathBuf>("g"), Some(&PathBuf::from("/var/log")));
    assert_eq!(values.get::<IpAddr>("h"), Some(&"127.0.0.1".parse::<IpAddr>().unwrap()));
}

#[test]
fn test_missing_required_option_reported_once() {
    let root = CommandBuilder::new("app", &options())
        .option::<u16>(|o| o.names("p", "port").required(true))
        .build()
        .unwrap();

    let result = manager().parse::<&str>(&[], &root);
    assert_eq!(
        result.errors,
        vec![ParseError::MissingRequiredOption {
            option: "--port".to_string(),
            path: "app".to_string()
        }]
    );
    assert!(!result.command.contains("port"));
}

#[test]
fn test_required_option_with_default_uses_transformed_default() {
    let root = CommandBuilder::new("app", &options())
        .option::<String>(|o| {
            o.name("mode")
                .required(true)
                .default("fast".to_string())
                .transform(|s| s.to_uppercase())
        })
        .untyped_option::<u32>(|o| o.name("retries").required(true).default_literal("2"))
        .build()
        .unwrap();

    let result = manager().parse::<&str>(&[], &root);
    assert!(result.success(), "{:?}", result.errors);
    assert_eq!(result.command.get::<String>("mode").map(String::as_str), Some("FAST"));
    assert_eq!(result.command.get::<u32>("retries"), Some(&2));
}

#[test]
fn test_collection_consumes_until_known_name() {
    let root = cargo_tree();
    let result = manager().parse(&["build", "--tags", "a", "b", "c", "--verbose"], &root);

    assert!(result.success(), "{:?}", result.errors);
    let build = result.command.find(&["build"]).unwrap();
    assert_eq!(
        build.get::<Vec<String>>("tags"),
        Some(&vec!["a".to_string(), "b".to_string(), "c".to_string()])
    );
    assert!(build.flag("verbose"));
    assert!(!result.command.contains("verbose"));
}

#[test]
fn test_collection_stops_at_child_command() {
    let root = CommandBuilder::new("app", &options())
        .option::<BTreeSet<u8>>(|o| o.name("ids"))
        .command("run", |c| c)
        .build()
        .unwrap();

    let result = manager().parse(&["--ids", "3", "1", "3", "run"], &root);
    assert!(result.success(), "{:?}", result.errors);
    assert_eq!(result.command.get::<BTreeSet<u8>>("ids"), Some(&BTreeSet::from([1, 3])));
    assert_eq!(result.active().name, "run");
}

#[test]
fn test_unknown_token_suggests_closest_name() {
    let root = cargo_tree();
    let result = manager().parse(&["--hepl"], &root);

    let [ParseError::UnknownToken { token, path, suggestions }] = result.errors.as_slice() else {
        panic!("expected one unknown token, got {:?}", result.errors);
    };
    assert_eq!(token, "--hepl");
    assert_eq!(path, "cargo");
    assert_eq!(suggestions[0].name, "--help");
    assert_eq!(suggestions[0].distance, 1);
}

#[test]
fn test_unknown_subcommand_suggests_alias_and_names() {
    let root = cargo_tree();
    let result = manager().parse(&["biuld"], &root);
    let ParseError::UnknownToken { suggestions, .. } = &result.errors[0] else {
        panic!("expected an unknown token");
    };
    assert_eq!(suggestions[0].name, "build");
}

#[test]
fn test_deepest_subcommand_wins() {
    let root = cargo_tree();
    let result = manager().parse(&["build", "release", "-x", "1"], &root);

    assert!(result.success(), "{:?}", result.errors);
    let active = result.active();
    assert_eq!(active.path, vec!["cargo", "build", "release"]);
    assert_eq!(active.get::<i32>("x"), Some(&1));
}

#[test]
fn test_alias_routes_like_name() {
    let root = cargo_tree();
    let result = manager().parse(&["b", "release"], &root);
    assert!(result.success());
    assert_eq!(result.active().path, vec!["cargo", "build", "release"]);
}

#[test]
fn test_parsing_is_repeatable() {
    let root = cargo_tree();
    let tokens = ["-v", "build", "--tags", "x", "y", "--nope", "release", "-x", "oops"];
    let first = manager().parse(&tokens, &root);
    let second = manager().parse(&tokens, &root);
    assert_eq!(first, second);
}

#[test]
fn test_missing_required_and_bad_token_both_reported() {
    let root = CommandBuilder::new("app", &options())
        .option::<String>(|o| o.name("name").required(true))
        .option::<u32>(|o| o.name("count"))
        .build()
        .unwrap();

    let result = manager().parse(&["--count", "abc"], &root);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().any(|e| matches!(
        e,
        ParseError::ResolveFailure(ResolveError { token, option, .. })
            if token == "abc" && option == "--count"
    )));
    assert!(result.errors.iter().any(|e| matches!(
        e,
        ParseError::MissingRequiredOption { option, .. } if option == "--name"
    )));
}

#[test]
fn test_explicit_order_controls_resolution() {
    let root = CommandBuilder::new("app", &options())
        .option::<u8>(|o| o.name("late").required(true))
        .option::<u8>(|o| o.name("early").required(true).order(-10))
        .build()
        .unwrap();

    let result = manager().parse::<&str>(&[], &root);
    let order: Vec<_> = result
        .errors
        .iter()
        .map(|e| match e {
            ParseError::MissingRequiredOption { option, .. } => option.as_str(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(order, vec!["--early", "--late"]);
}

#[test]
fn test_custom_resolver_beats_fallback() {
    #[derive(Debug, Clone, PartialEq)]
    struct Duration(u64);

    impl OptionValue for Duration {
        fn from_token(token: &str) -> Option<Self> {
            token.parse().ok().map(Duration)
        }
    }

    struct Suffixed;

    impl TokenResolver<Duration> for Suffixed {
        fn can_resolve(&self, model: &ArgumentModel) -> bool {
            model.value.as_deref().is_some_and(|v| v.ends_with('s'))
        }

        fn resolve(&self, model: &ArgumentModel) -> std::result::Result<Duration, String> {
            let raw = model.value.as_deref().unwrap_or_default();
            raw.trim_end_matches('s')
                .parse()
                .map(Duration)
                .map_err(|e| e.to_string())
        }
    }

    let root = CommandBuilder::new("app", &options())
        .option::<Duration>(|o| o.name("timeout"))
        .option::<Vec<Duration>>(|o| o.name("backoff"))
        .build()
        .unwrap();

    let fallback = manager().parse(&["--timeout", "30", "--backoff", "1", "2"], &root);
    assert!(fallback.success());
    assert_eq!(fallback.command.get::<Duration>("timeout"), Some(&Duration(30)));

    let mut registry = ResolverRegistry::with_defaults();
    registry.register::<Duration>(Suffixed);
    let custom = ArgumentManager::new(registry, options()).with_environment(MapEnvironment::new());

    let result = custom.parse(&["--timeout", "30s", "--backoff", "1s", "2s"], &root);
    assert!(result.success(), "{:?}", result.errors);
    assert_eq!(result.command.get::<Duration>("timeout"), Some(&Duration(30)));
    assert_eq!(
        result.command.get::<Vec<Duration>>("backoff"),
        Some(&vec![Duration(1), Duration(2)])
    );
    assert!(!custom.parse(&["--timeout", "30"], &root).success());
}

#[test]
fn test_custom_prefixes() {
    let slash = ParserOptions {
        prefix_short: "/".to_string(),
        prefix_long: "//".to_string(),
        ..options()
    };
    let root = CommandBuilder::new("tool", &slash)
        .option::<bool>(|o| o.names("q", "quiet"))
        .build()
        .unwrap();

    let manager = ArgumentManager::new(ResolverRegistry::with_defaults(), slash);
    assert!(manager.parse(&["/q"], &root).command.flag("quiet"));
    assert!(manager.parse(&["//quiet"], &root).command.flag("quiet"));
    assert!(!manager.parse(&["--quiet"], &root).success());
}

#[test]
fn test_bool_without_builtin_resolver_needs_literal() {
    let root = CommandBuilder::new("app", &options())
        .option::<bool>(|o| o.name("force"))
        .build()
        .unwrap();

    let manager = ArgumentManager::new(ResolverRegistry::empty(), options());
    assert_eq!(manager.parse(&["--force", "true"], &root).command.get::<bool>("force"), Some(&true));
    assert!(!manager.parse(&["--force"], &root).success());
}

#[test]
fn test_auto_execute_runs_hooks_root_first() {
    let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
    let root_calls = Arc::clone(&calls);
    let child_calls = Arc::clone(&calls);

    let root = CommandBuilder::new("app", &options())
        .auto_execute(true)
        .on_execute(move |cmd| {
            root_calls.lock().unwrap().push(cmd.name.clone());
            Ok(())
        })
        .command("sync", |c| {
            c.auto_execute(true)
                .option::<u8>(|o| o.name("depth").default(1))
                .on_execute(move |cmd| {
                    let depth = cmd.get::<u8>("depth").copied().unwrap_or_default();
                    child_calls.lock().unwrap().push(format!("{}:{depth}", cmd.name));
                    Ok(())
                })
        })
        .command("idle", |c| c.on_execute(|_| Err("never scheduled".into())))
        .build()
        .unwrap();

    let manager = manager();
    let result = manager.parse(&["sync", "--depth", "4"], &root);
    assert_eq!(
        result.scheduled,
        vec![vec!["app".to_string()], vec!["app".to_string(), "sync".to_string()]]
    );
    assert_eq!(manager.execute(&result, &root).unwrap(), 2);
    assert_eq!(*calls.lock().unwrap(), vec!["app".to_string(), "sync:4".to_string()]);

    let idle = manager.parse(&["idle"], &root);
    assert_eq!(idle.scheduled, vec![vec!["app".to_string()]]);
}

#[test]
fn test_hook_failure_is_reported() {
    let root = CommandBuilder::new("app", &options())
        .auto_execute(true)
        .on_execute(|_| Err("disk full".into()))
        .build()
        .unwrap();

    let manager = manager();
    let result = manager.parse::<&str>(&[], &root);
    let err = manager.execute(&result, &root).unwrap_err();
    assert_eq!(err.to_string(), "command `app` failed: disk full");
}

#[test]
fn test_concurrent_parses_share_tree_and_registry() {
    let root = Arc::new(cargo_tree());
    let manager = Arc::new(manager());
    let successes = AtomicUsize::new(0);

    let results: Vec<ParseResult> = (0..64)
        .into_par_iter()
        .map(|i| {
            let x = i.to_string();
            let tokens = ["build", "release", "-x", x.as_str()];
            let result = manager.parse(&tokens, &root);
            if result.success() {
                successes.fetch_add(1, Ordering::Relaxed);
            }
            result
        })
        .collect();

    assert_eq!(successes.load(Ordering::Relaxed), 64);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.active().get::<i32>("x"), Some(&(i as i32)));
    }
}
