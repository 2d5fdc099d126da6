use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::Value;
use shapecheck::{CompareOptions, ComparisonMode, Direction, ShapeOps, load_document};
use std::io::Write;
use std::path::Path;

use crate::report::print_report;

#[derive(Parser)]
#[command(name = "shapecheck")]
#[command(about = "Structural JSON comparison and body assertions", long_about = None)]
pub struct Cli {
    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to optional config JSON to override descriptor field names and the default mode
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare an actual document against an expected shape
    Compare {
        /// JSON or YAML file holding the expected shape
        #[arg(long)]
        expected: String,
        /// JSON or YAML file holding the actual document
        #[arg(long)]
        actual: String,
        /// inclusive, bounded-above or bounded-below (config default when omitted)
        #[arg(long)]
        mode: Option<String>,
        /// Path into the actual document to compare instead of its root
        #[arg(long)]
        subkey: Option<String>,
        /// Compare key structure only, ignoring literal values
        #[arg(long)]
        keys_only: bool,
    },
    /// Resolve a dotted/bracketed path inside a document
    Resolve {
        #[arg(long)]
        document: String,
        #[arg(long)]
        path: String,
    },
    /// Check key entries against a document
    CheckKeys {
        #[arg(long)]
        document: String,
        /// File holding a list of key entries
        #[arg(long)]
        entries: String,
        #[arg(long, default_value = "response")]
        direction: String,
    },
    /// Run comparison case files
    Run {
        /// Case files or directories (can be specified multiple times)
        #[arg(long, action = clap::ArgAction::Append, required = true)]
        path: Vec<String>,
    },
}

/// Run the CLI application
///
/// # Errors
///
/// Returns an error if command execution fails
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Execute CLI commands with a parsed Cli struct.
/// Returns `Ok(false)` when the command ran but its checks failed.
///
/// # Errors
///
/// Returns an error if:
/// - An input document cannot be read or parsed
/// - The expected shape is malformed
/// - A mode or direction argument is unknown
/// - Writing the result fails
pub fn run_with_cli(cli: Cli) -> Result<bool> {
    // WARNING (no -v), INFO (-v), DEBUG (-vv)
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    // Only initialize logging if not already initialized (for testing)
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    run_command(cli)
}

fn read_document(path: &str) -> Result<Value> {
    load_document(Path::new(path)).with_context(|| format!("cannot load document '{path}'"))
}

/// Execute a command with the given CLI configuration
fn run_command(cli: Cli) -> Result<bool> {
    let ops = ShapeOps::new(cli.config.as_deref());

    match cli.command {
        Commands::Compare {
            expected,
            actual,
            mode,
            subkey,
            keys_only,
        } => {
            let mode = mode
                .map(|m| m.parse::<ComparisonMode>())
                .transpose()
                .map_err(|e| anyhow!(e))?;
            let expected = read_document(&expected)?;
            let actual = read_document(&actual)?;
            let options = CompareOptions {
                with_values: !keys_only,
            };
            let result = ops.compare(&expected, &actual, mode, options, subkey.as_deref());
            print_result(&result)?;
            if !result.error.is_empty() {
                return Err(anyhow!(result.error));
            }
            Ok(result.ok)
        }
        Commands::Resolve { document, path } => {
            let document = read_document(&document)?;
            let result = ShapeOps::resolve(document, &path);
            print_result(&result)?;
            Ok(result.resolved)
        }
        Commands::CheckKeys {
            document,
            entries,
            direction,
        } => {
            let direction = direction.parse::<Direction>().map_err(|e| anyhow!(e))?;
            let body = std::fs::read_to_string(&document)
                .with_context(|| format!("cannot read document '{document}'"))?;
            let entries = read_document(&entries)?;
            let report = ops.check_keys(body, &entries, direction);
            print_report(&report);
            print_result(&report)?;
            Ok(report.is_success())
        }
        Commands::Run { path } => {
            let result = ops.run_cases(&path);
            for error in &result.errors {
                tracing::warn!("{error}");
            }
            print_report(&result.report);
            print_result(&result)?;
            Ok(result.ok)
        }
    }
}

fn print_result<T: serde::Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    writeln!(handle)?;
    Ok(())
}
