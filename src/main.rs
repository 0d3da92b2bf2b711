//! trove - batched copy, move, rename and delete with conflict resolution.
//!
//! Usage:
//!   trove copy SRC... DEST        Copy into a directory
//!   trove move SRC... DEST        Move into a directory
//!   trove delete PATH...          Delete permanently (or --trash)
//!   trove rename PATH... RULE     Bulk rename (see `trove rename --help`)
//!   trove --help                  Show help

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use trove_core::OpsConfig;
use trove_ops::{
    AutoRenameResolver, BatchOutcome, ConflictDecision, ConflictResolver, FileOperation,
    FixedResolver, OperationEvent, OperationExecutor, RenameRule, preview,
};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "TROVE_LOG";

/// Failures listed after the summary line.
const FAILURES_SHOWN: usize = 10;

#[derive(Parser)]
#[command(
    name = "trove",
    version,
    about = "Batched copy, move, rename and delete with conflict resolution"
)]
struct Cli {
    /// Load operation settings from a JSON file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy files and directories into a destination directory
    Copy {
        /// Sources followed by the destination directory
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,

        /// What to do when a target already exists
        #[arg(long, default_value = "abort")]
        on_conflict: OnConflict,
    },

    /// Move files and directories into a destination directory
    Move {
        /// Sources followed by the destination directory
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,

        /// What to do when a target already exists
        #[arg(long, default_value = "abort")]
        on_conflict: OnConflict,
    },

    /// Delete files and directories
    Delete {
        /// Paths to delete
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Move to the trash instead of deleting permanently
        #[arg(long)]
        trash: bool,
    },

    /// Rename files in place according to one rule
    Rename {
        /// Paths to rename, numbered in this order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        rule: RuleArgs,

        /// Show the new names without renaming anything
        #[arg(long)]
        preview: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnConflict {
    Overwrite,
    Skip,
    Abort,
    AutoRename,
}

impl OnConflict {
    fn resolver(self) -> Box<dyn ConflictResolver + Send> {
        match self {
            Self::Overwrite => Box::new(FixedResolver(ConflictDecision::Overwrite)),
            Self::Skip => Box::new(FixedResolver(ConflictDecision::Skip)),
            Self::Abort => Box::new(FixedResolver(ConflictDecision::Abort)),
            Self::AutoRename => Box::new(AutoRenameResolver),
        }
    }
}

#[derive(Args)]
struct RuleArgs {
    /// Prepend text to every name
    #[arg(long)]
    prefix: Option<String>,

    /// Append text before the extension
    #[arg(long)]
    suffix: Option<String>,

    /// Text to find (use with --replace)
    #[arg(long, requires = "replace")]
    find: Option<String>,

    /// Replacement for --find
    #[arg(long, requires = "find")]
    replace: Option<String>,

    /// Remove every occurrence of this text
    #[arg(long)]
    remove: Option<String>,

    /// Replace names with a counter starting here
    #[arg(long)]
    number: Option<u64>,

    /// Zero-pad the counter to this width
    #[arg(long, requires = "number")]
    pad: Option<usize>,

    /// Build names from {name}, {ext} and {n}
    #[arg(long)]
    template: Option<String>,
}

impl RuleArgs {
    fn into_rule(self) -> Result<RenameRule> {
        let mut rules = Vec::new();
        if let Some(prefix) = self.prefix {
            rules.push(RenameRule::AddPrefix(prefix));
        }
        if let Some(suffix) = self.suffix {
            rules.push(RenameRule::AddSuffix(suffix));
        }
        if let (Some(find), Some(replace)) = (self.find, self.replace) {
            rules.push(RenameRule::FindReplace { find, replace });
        }
        if let Some(pattern) = self.remove {
            rules.push(RenameRule::RemovePattern(pattern));
        }
        if let Some(start) = self.number {
            rules.push(RenameRule::Numbering {
                start,
                pad_width: self.pad.unwrap_or(1),
            });
        }
        if let Some(template) = self.template {
            rules.push(RenameRule::Template(template));
        }

        match rules.len() {
            0 => bail!("Give one rule: --prefix, --suffix, --find/--replace, --remove, --number or --template"),
            1 => Ok(rules.remove(0)),
            _ => bail!("Only one rename rule can be applied at a time"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    let (operation, resolver) = match cli.command {
        Command::Copy {
            mut paths,
            on_conflict,
        } => {
            let (sources, destination) = split_destination(&mut paths)?;
            (FileOperation::copy(sources, destination), on_conflict.resolver())
        }
        Command::Move {
            mut paths,
            on_conflict,
        } => {
            let (sources, destination) = split_destination(&mut paths)?;
            (FileOperation::move_to(sources, destination), on_conflict.resolver())
        }
        Command::Delete { paths, trash } => (
            FileOperation::delete(paths, trash),
            OnConflict::Abort.resolver(),
        ),
        Command::Rename {
            paths,
            rule,
            preview: preview_only,
        } => {
            let rule = rule.into_rule()?;
            if preview_only {
                print_preview(&paths, &rule, cli.json)?;
                return Ok(ExitCode::SUCCESS);
            }
            (FileOperation::rename(paths, rule), OnConflict::Abort.resolver())
        }
    };

    let outcome = run(operation, resolver, config).await?;
    report(&outcome, cli.json)?;

    let ok = outcome.result().is_some_and(|result| result.is_success());
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Install the stderr log subscriber.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<OpsConfig> {
    let Some(path) = path else {
        return Ok(OpsConfig::default());
    };

    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
    let loaded: OpsConfig = serde_json::from_str(&text).context("Invalid config file")?;

    // Run the file through the builder so its limits are checked.
    OpsConfig::builder()
        .preserve_metadata(loaded.preserve_metadata)
        .batch_scope(loaded.batch_scope)
        .clipboard_history(loaded.clipboard_history)
        .follow_symlinks(loaded.follow_symlinks)
        .max_rename_attempts(loaded.max_rename_attempts)
        .build()
        .context("Invalid config file")
}

/// Split `SRC... DEST` into sources and the destination.
fn split_destination(paths: &mut Vec<PathBuf>) -> Result<(Vec<PathBuf>, PathBuf)> {
    let Some(destination) = paths.pop() else {
        bail!("Missing destination directory");
    };
    if paths.is_empty() {
        bail!("Missing source paths");
    }
    Ok((std::mem::take(paths), destination))
}

/// Run the operation in the background; Ctrl-C cancels between items.
async fn run(
    operation: FileOperation,
    resolver: Box<dyn ConflictResolver + Send>,
    config: OpsConfig,
) -> Result<BatchOutcome> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(target: "executor", "interrupted; stopping after the current item");
            on_interrupt.cancel();
        }
    });

    let executor = OperationExecutor::new(config);
    let mut events = executor.start(operation, resolver, cancel);

    let mut outcome = None;
    while let Some(event) = events.recv().await {
        match event {
            OperationEvent::Progress(progress) => {
                if let Some(path) = &progress.current_path {
                    tracing::debug!(
                        target: "executor",
                        "[{}/{}] {}",
                        progress.items_completed,
                        progress.items_total,
                        path.display()
                    );
                }
            }
            OperationEvent::Complete(done) => outcome = Some(done),
        }
    }

    match outcome {
        Some(outcome) => Ok(outcome),
        None => bail!("Operation ended without a result"),
    }
}

fn report(outcome: &BatchOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    println!("{}", outcome.summary());
    if let Some(result) = outcome.result() {
        if result.bytes_processed > 0 {
            println!("  {} processed", format_size(result.bytes_processed));
        }
        for failure in result.first_failures(FAILURES_SHOWN) {
            println!("  {failure}");
        }
        let hidden = result.failed().saturating_sub(FAILURES_SHOWN);
        if hidden > 0 {
            println!("  ... and {hidden} more");
        }
    }
    Ok(())
}

fn print_preview(paths: &[PathBuf], rule: &RenameRule, json: bool) -> Result<()> {
    let previews = preview(paths, rule);
    if json {
        println!("{}", serde_json::to_string_pretty(&previews)?);
        return Ok(());
    }

    let width = previews
        .iter()
        .map(|p| p.old_name.chars().count())
        .max()
        .unwrap_or(0);
    for item in &previews {
        let marker = if item.is_unchanged() { " (unchanged)" } else { "" };
        println!("{:<width$}  ->  {}{marker}", item.old_name, item.new_name);
    }
    Ok(())
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_split_destination() {
        let mut paths = vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("dest")];
        let (sources, destination) = split_destination(&mut paths).unwrap();
        assert_eq!(sources, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(destination, PathBuf::from("dest"));
    }

    #[test]
    fn test_rule_args_single_rule() {
        let cli = Cli::parse_from(["trove", "rename", "a.txt", "--number", "5", "--pad", "3"]);
        let Command::Rename { rule, .. } = cli.command else {
            panic!("expected rename");
        };
        assert_eq!(
            rule.into_rule().unwrap(),
            RenameRule::Numbering {
                start: 5,
                pad_width: 3
            }
        );
    }

    #[test]
    fn test_rule_args_rejects_two_rules() {
        let cli = Cli::parse_from(["trove", "rename", "a.txt", "--prefix", "x", "--suffix", "y"]);
        let Command::Rename { rule, .. } = cli.command else {
            panic!("expected rename");
        };
        assert!(rule.into_rule().is_err());
    }

    #[test]
    fn test_on_conflict_value_names() {
        let cli = Cli::parse_from(["trove", "copy", "a", "dest", "--on-conflict", "auto-rename"]);
        assert!(matches!(
            cli.command,
            Command::Copy {
                on_conflict: OnConflict::AutoRename,
                ..
            }
        ));
    }
}
