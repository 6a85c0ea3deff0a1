//! Bounded batch runner.
//!
//! Runs the configured interpreter over every entry of a directory, one item
//! at a time, killing any item that exceeds its timeout.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use batch_runner::batch::{ProcessExecutor, run_batch};
use batch_runner::core::duration::parse_duration;
use batch_runner::core::template::CommandTemplate;
use batch_runner::exit_codes;
use batch_runner::io::config::{ConfigOverrides, RunnerConfig, load_config};
use batch_runner::io::console::Console;
use batch_runner::io::interrupt;
use batch_runner::logging;
use clap::Parser;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "runner",
    version,
    about = "Run an interpreter over every file in a directory with a per-item timeout"
)]
struct Cli {
    /// Directory whose entries are the work items.
    directory: PathBuf,

    /// Per-item timeout, e.g. `10s`, `500ms`, `2m` [default: 10s].
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Interpreter command; `{}` marks the item path, otherwise it is appended
    /// [default: "python3 ssm_interpreter.py"].
    #[arg(long, value_parser = CommandTemplate::parse)]
    command: Option<CommandTemplate>,

    /// Time between SIGTERM and SIGKILL for a timed-out item [default: 2s].
    #[arg(long, value_parser = parse_duration)]
    grace: Option<Duration>,

    /// Only run entries with this extension (without the dot).
    #[arg(long)]
    ext: Option<String>,

    /// TOML config file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            timeout: self.timeout,
            grace_period: self.grace,
            command: self.command.clone(),
            extension: self.ext.clone(),
        }
    }
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;
    debug!(?cfg, "resolved config");

    let executor = ProcessExecutor::from_config(&cfg)?;
    interrupt::install()?;
    let console = Console::new(io::stdout(), io::stderr());
    run_batch(&cli.directory, &cfg, &executor, &console)
        .with_context(|| format!("run batch over {}", cli.directory.display()))?;
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<RunnerConfig> {
    let base = match &cli.config {
        Some(path) => load_config(path)?,
        None => RunnerConfig::default(),
    };
    base.with_overrides(&cli.overrides())
        .context("invalid runner configuration")
}
