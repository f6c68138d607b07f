mod definition;
mod report;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use argtree_core::{ArgumentManager, CommandDescriptor, ParserOptions, ResolverRegistry, UsagePrinter};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use definition::CommandDef;
use report::{BatchEntry, OutlinePrinter, ParseReport, ReportFormat, render};

#[derive(Debug, Parser)]
#[command(name = "argtree")]
#[command(about = "Parse token vectors against declarative command trees")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse one token vector and print the bound values and errors.
    Check(CheckArgs),
    /// Parse one whitespace-separated invocation per input line, in parallel.
    Batch(BatchArgs),
    /// Build a tree definition and print its outline.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct TreeArgs {
    /// Command tree definition (YAML, or JSON with a .json extension).
    #[arg(long)]
    tree: PathBuf,
    /// Parser options file (YAML, or JSON with a .json extension).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    tree: TreeArgs,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: ReportFormat,
    /// Run the hooks of auto-execute commands when the parse succeeds.
    #[arg(long)]
    execute: bool,
    /// Tokens to parse, after `--`.
    #[arg(last = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

#[derive(Debug, Args)]
struct BatchArgs {
    #[command(flatten)]
    tree: TreeArgs,
    /// File with one invocation per line; blank lines and `#` comments are skipped.
    #[arg(long)]
    input: PathBuf,
    /// Number of parallel parse jobs (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: ReportFormat,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[command(flatten)]
    tree: TreeArgs,
}

/// How a command ended.
enum Outcome {
    Success,
    ParseFailed,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Batch(args) => run_batch(args),
        Command::Validate(args) => run_validate(args),
    };

    match result {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::ParseFailed) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_tree(args: &TreeArgs) -> Result<(ParserOptions, CommandDescriptor), String> {
    let options = match &args.config {
        Some(path) => ParserOptions::load(path)
            .map_err(|err| format!("Failed to load parser options '{}': {err}", path.display()))?,
        None => ParserOptions::default(),
    };
    let root = CommandDef::load(&args.tree)
        .and_then(|def| def.build(&options))
        .map_err(|err| err.to_string())?;
    debug!(tree = %args.tree.display(), command = %root.name(), "Loaded command tree");
    Ok((options, root))
}

fn run_check(args: CheckArgs) -> Result<Outcome, String> {
    let (options, root) = load_tree(&args.tree)?;
    let manager = ArgumentManager::new(ResolverRegistry::with_defaults(), options);

    let result = manager.parse(args.tokens.as_slice(), &root);
    let mut report = ParseReport::new(&result);
    if args.execute && result.success() {
        let executed = manager
            .execute(&result, &root)
            .map_err(|err| err.to_string())?;
        report.executed = Some(executed);
    }

    println!("{}", render(&report, args.format)?);
    Ok(if result.success() {
        Outcome::Success
    } else {
        Outcome::ParseFailed
    })
}

fn run_batch(args: BatchArgs) -> Result<Outcome, String> {
    use rayon::prelude::*;

    let (options, root) = load_tree(&args.tree)?;
    let lines = read_invocations(&args.input)?;
    let manager = ArgumentManager::new(ResolverRegistry::with_defaults(), options);

    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = args.jobs {
        pool = pool.num_threads(jobs);
    }
    let pool = pool
        .build()
        .map_err(|e| format!("Failed to create thread pool: {e}"))?;

    let entries: Vec<BatchEntry> = pool.install(|| {
        lines
            .into_par_iter()
            .map(|(line, tokens)| {
                let result = manager.parse(tokens.as_slice(), &root);
                BatchEntry {
                    line,
                    report: ParseReport::new(&result),
                    tokens,
                }
            })
            .collect()
    });

    let failures = entries.iter().filter(|e| !e.report.success).count();
    println!("{}", render(&entries, args.format)?);
    if failures > 0 {
        eprintln!("{failures} of {} invocation(s) failed to parse.", entries.len());
        Ok(Outcome::ParseFailed)
    } else {
        Ok(Outcome::Success)
    }
}

fn run_validate(args: ValidateArgs) -> Result<Outcome, String> {
    let (_, root) = load_tree(&args.tree)?;
    let outline = OutlinePrinter
        .render(&root)
        .map_err(|err| format!("Failed to render outline: {err}"))?;
    print!("{outline}");
    println!(
        "Validated tree '{}': {} command(s), {} option(s).",
        root.name(),
        count_commands(&root),
        count_options(&root)
    );
    Ok(Outcome::Success)
}

/// Reads `(line number, tokens)` pairs, skipping blank lines and `#` comments.
fn read_invocations(path: &Path) -> Result<Vec<(usize, Vec<String>)>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    Ok(split_invocations(&raw))
}

fn split_invocations(raw: &str) -> Vec<(usize, Vec<String>)> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(index, line)| {
            (
                index + 1,
                line.split_whitespace().map(ToOwned::to_owned).collect(),
            )
        })
        .collect()
}

fn count_commands(command: &CommandDescriptor) -> usize {
    1 + command.children().iter().map(count_commands).sum::<usize>()
}

fn count_options(command: &CommandDescriptor) -> usize {
    command.options().len() + command.children().iter().map(count_options).sum::<usize>()
}
