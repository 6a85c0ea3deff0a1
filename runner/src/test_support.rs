//! Test-only helpers: fixture directories, captured consoles and scripted executors.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use crate::batch::ItemExecutor;
use crate::core::types::{RunResult, WorkItem};
use crate::io::config::RunnerConfig;
use crate::io::console::Console;
use crate::io::process::{OutputSink, ProcessError, Stream};

/// Create a temp directory holding `(name, contents)` files.
pub fn fixture_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).expect("write fixture");
    }
    dir
}

/// Console writing into in-memory buffers.
pub fn capture_console() -> Console<Vec<u8>, Vec<u8>> {
    Console::new(Vec::new(), Vec::new())
}

/// Config running each item with `sh <item>`.
pub fn shell_config(timeout: Duration) -> RunnerConfig {
    RunnerConfig {
        timeout,
        grace_period: Duration::from_millis(500),
        command: vec!["sh".to_string()],
        extension: None,
    }
}

/// One canned item run: stdout text to emit, then a result.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    pub stdout: String,
    pub result: RunResult,
}

impl ScriptedRun {
    pub fn completed(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            result: RunResult::Completed { exit_code: Some(0) },
        }
    }

    pub fn timed_out(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            result: RunResult::TimedOut,
        }
    }

    pub fn launch_failure(reason: &str) -> Self {
        Self {
            stdout: String::new(),
            result: RunResult::LaunchFailure {
                reason: reason.to_string(),
            },
        }
    }
}

/// Executor replaying queued runs in order and recording which items it saw.
pub struct ScriptedExecutor {
    runs: RefCell<VecDeque<ScriptedRun>>,
    seen: RefCell<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(runs: Vec<ScriptedRun>) -> Self {
        Self {
            runs: RefCell::new(runs.into()),
            seen: RefCell::new(Vec::new()),
        }
    }

    /// Item names in execution order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.borrow().clone()
    }
}

impl ItemExecutor for ScriptedExecutor {
    fn execute(&self, item: &WorkItem, sink: &dyn OutputSink) -> Result<RunResult, ProcessError> {
        self.seen.borrow_mut().push(item.name().to_string());
        let run = self
            .runs
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted run left for {}", item.name()));
        if !run.stdout.is_empty() {
            sink.passthrough(Stream::Stdout, run.stdout.as_bytes())
                .expect("scripted passthrough");
        }
        Ok(run.result)
    }
}
