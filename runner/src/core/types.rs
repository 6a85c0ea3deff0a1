//! Shared deterministic types for batch runs.
//!
//! These types define stable contracts between enumeration, execution and
//! reporting. They do not depend on external state or I/O.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// One unit of batch work: a single entry of the input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    name: String,
    path: PathBuf,
}

impl WorkItem {
    /// Build an item from an entry path. The display name is the final path component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    /// Name shown in the item's label line.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path handed to the external command.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Terminal result of running a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    /// The child exited within the timeout. The exit code is informational only.
    Completed { exit_code: Option<i32> },
    /// The timeout elapsed and the child's process group was terminated.
    TimedOut,
    /// The external command could not be spawned.
    LaunchFailure { reason: String },
}

impl RunResult {
    pub fn state(&self) -> ItemState {
        match self {
            RunResult::Completed { .. } => ItemState::Completed,
            RunResult::TimedOut => ItemState::TimedOut,
            RunResult::LaunchFailure { .. } => ItemState::LaunchFailure,
        }
    }
}

/// Per-item lifecycle: `Pending -> Running -> {Completed | TimedOut | LaunchFailure}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Running,
    Completed,
    TimedOut,
    LaunchFailure,
}

impl ItemState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ItemState::Completed | ItemState::TimedOut | ItemState::LaunchFailure
        )
    }

    /// Whether `self -> next` is a legal lifecycle step.
    pub fn can_transition_to(self, next: ItemState) -> bool {
        match self {
            ItemState::Pending => next == ItemState::Running,
            ItemState::Running => next.is_terminal(),
            _ => false,
        }
    }
}

/// What the batch learned about one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub item: WorkItem,
    pub result: RunResult,
    pub elapsed: Duration,
}
