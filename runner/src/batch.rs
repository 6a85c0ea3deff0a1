//! Batch orchestration: enumerate items, run each under its own timeout, report.
//!
//! Items run strictly one after another. Per-item problems become
//! [`RunResult`] values; only [`BatchError`]s stop the batch.

use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, error, info, instrument, warn};

use crate::core::template::CommandTemplate;
use crate::core::types::{ItemReport, ItemState, RunResult, WorkItem};
use crate::error::BatchError;
use crate::io::config::RunnerConfig;
use crate::io::console::Console;
use crate::io::discover::discover_items;
use crate::io::process::{Limits, OutputSink, ProcessError, run_with_timeout};

/// Runs one work item to a terminal result.
///
/// Tests swap in scripted executors that never spawn processes.
pub trait ItemExecutor {
    fn execute(&self, item: &WorkItem, sink: &dyn OutputSink) -> Result<RunResult, ProcessError>;
}

/// Executor that launches the configured interpreter for each item.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    template: CommandTemplate,
    limits: Limits,
}

impl ProcessExecutor {
    pub fn new(template: CommandTemplate, limits: Limits) -> Self {
        Self { template, limits }
    }

    pub fn from_config(cfg: &RunnerConfig) -> Result<Self> {
        Ok(Self::new(
            cfg.template()?,
            Limits {
                timeout: cfg.timeout,
                grace_period: cfg.grace_period,
            },
        ))
    }
}

impl ItemExecutor for ProcessExecutor {
    fn execute(&self, item: &WorkItem, sink: &dyn OutputSink) -> Result<RunResult, ProcessError> {
        let mut cmd = Command::new(self.template.program());
        cmd.args(self.template.args_for(item.path()));

        match run_with_timeout(cmd, self.limits, sink) {
            Ok(outcome) if outcome.timed_out => Ok(RunResult::TimedOut),
            Ok(outcome) => Ok(RunResult::Completed {
                exit_code: outcome.status.code(),
            }),
            Err(ProcessError::Spawn { source, .. }) => Ok(RunResult::LaunchFailure {
                reason: format!("{}: {source}", self.template.display_for(item.path())),
            }),
            Err(err) => Err(err),
        }
    }
}

/// Counts per terminal result, logged at the end of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub completed: usize,
    pub timed_out: usize,
    pub launch_failures: usize,
}

impl Tally {
    pub fn of(reports: &[ItemReport]) -> Self {
        let mut tally = Self::default();
        for report in reports {
            match report.result {
                RunResult::Completed { .. } => tally.completed += 1,
                RunResult::TimedOut => tally.timed_out += 1,
                RunResult::LaunchFailure { .. } => tally.launch_failures += 1,
            }
        }
        tally
    }
}

/// Run every item of `dir` in sorted order and write the report to `console`.
///
/// The directory is listed before any output, so a missing directory produces
/// no item lines.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn run_batch<X, O, E>(
    dir: &Path,
    cfg: &RunnerConfig,
    executor: &X,
    console: &Console<O, E>,
) -> Result<Vec<ItemReport>, BatchError>
where
    X: ItemExecutor,
    O: Write + Send,
    E: Write + Send,
{
    let items = discover_items(dir, cfg.extension.as_deref())?;
    info!(count = items.len(), timeout_ms = cfg.timeout.as_millis(), "batch started");

    let mut reports = Vec::with_capacity(items.len());
    for item in items {
        let report = run_item(item, cfg.timeout, executor, console)?;
        reports.push(report);
    }

    let tally = Tally::of(&reports);
    info!(
        completed = tally.completed,
        timed_out = tally.timed_out,
        launch_failures = tally.launch_failures,
        "batch finished"
    );
    Ok(reports)
}

fn run_item<X, O, E>(
    item: WorkItem,
    timeout: Duration,
    executor: &X,
    console: &Console<O, E>,
) -> Result<ItemReport, BatchError>
where
    X: ItemExecutor,
    O: Write + Send,
    E: Write + Send,
{
    let mut state = ItemState::Pending;
    console.label(&item)?;

    advance(&mut state, ItemState::Running, &item);
    let started = Instant::now();
    let result = executor
        .execute(&item, console)
        .map_err(|source| BatchError::Supervise {
            item: item.name().to_string(),
            source,
        })?;
    let elapsed = started.elapsed();
    advance(&mut state, result.state(), &item);

    match &result {
        RunResult::Completed { exit_code } => {
            info!(item = item.name(), exit_code = ?exit_code, elapsed_ms = elapsed.as_millis(), "item completed");
        }
        RunResult::TimedOut => {
            warn!(item = item.name(), elapsed_ms = elapsed.as_millis(), "item timed out");
            console.timeout_notice(timeout)?;
        }
        RunResult::LaunchFailure { reason } => {
            error!(item = item.name(), reason, "item failed to launch");
            console.launch_failure(reason)?;
        }
    }
    console.separator()?;

    Ok(ItemReport {
        item,
        result,
        elapsed,
    })
}

fn advance(state: &mut ItemState, next: ItemState, item: &WorkItem) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal item transition {state:?} -> {next:?}"
    );
    debug!(item = item.name(), from = ?state, to = ?next, "item state");
    *state = next;
}
