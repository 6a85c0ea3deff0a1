//! SIGINT/SIGTERM handling for the runner process.
//!
//! Items run in their own process group, so a Ctrl-C or a `kill` aimed at the
//! runner never reaches them. The handler kills the running item's group
//! before the runner exits.

use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result};
use tracing::warn;

use crate::exit_codes;

/// Process group id of the item currently running; 0 when idle.
static ACTIVE_GROUP: AtomicU32 = AtomicU32::new(0);

/// Marks a process group as the running item until dropped.
#[must_use]
pub struct ActiveGroup(());

/// Record `pgid` as the group to kill on interrupt.
pub fn track(pgid: u32) -> ActiveGroup {
    ACTIVE_GROUP.store(pgid, Ordering::SeqCst);
    ActiveGroup(())
}

impl Drop for ActiveGroup {
    fn drop(&mut self) {
        ACTIVE_GROUP.store(0, Ordering::SeqCst);
    }
}

/// The group that an interrupt would kill, if any.
pub fn active_group() -> Option<u32> {
    match ACTIVE_GROUP.load(Ordering::SeqCst) {
        0 => None,
        pgid => Some(pgid),
    }
}

/// Install the handler: kill the active group, then exit with
/// [`exit_codes::INTERRUPTED`].
pub fn install() -> Result<()> {
    ctrlc::set_handler(|| {
        if let Some(pgid) = active_group() {
            warn!(pgid, "interrupted, killing running item");
            kill_group(pgid);
        } else {
            warn!("interrupted");
        }
        std::process::exit(exit_codes::INTERRUPTED);
    })
    .context("install interrupt handler")
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(errno) => warn!(pgid, err = %errno, "failed to kill running item"),
    }
}

// Without process groups the item cannot be reached from the handler thread.
#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}
