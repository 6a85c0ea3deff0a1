//! Helpers for running one child process with a timeout and live output passthrough.
//!
//! On Unix each child leads its own process group. A timeout sends `SIGTERM`
//! to the group, waits for the grace period, then sends `SIGKILL`. Every run
//! ends with a `SIGKILL` sweep of the group so no descendant outlives its item.
//! Output still held open by a process outside the group is abandoned shortly
//! after the item ends.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::interrupt;

/// Which child stream a passthrough chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Destination for child output while it runs.
///
/// Called from a forwarding thread, one line at a time.
pub trait OutputSink: Sync {
    fn passthrough(&self, stream: Stream, line: &[u8]) -> io::Result<()>;
}

/// Time bounds for one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub timeout: Duration,
    pub grace_period: Duration,
}

#[derive(Debug)]
pub struct ProcessOutcome {
    pub status: ExitStatus,
    pub timed_out: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be started (missing binary, permissions, ...).
    #[error("spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    /// A started child could not be waited on or signalled.
    #[error("{action}")]
    Supervise {
        action: &'static str,
        #[source]
        source: io::Error,
    },
}

fn supervise_err(action: &'static str) -> impl FnOnce(io::Error) -> ProcessError {
    move |source| ProcessError::Supervise { action, source }
}

/// How long output may stay silent after the item ends before the drain is
/// abandoned. Only a descendant that escaped the process group can keep the
/// pipes open that long.
const DRAIN_IDLE: Duration = Duration::from_millis(250);

/// Upper bound on draining once the item has ended.
const DRAIN_LIMIT: Duration = Duration::from_secs(2);

enum Event {
    Line(Stream, Vec<u8>),
    Closed(Stream, io::Result<u64>),
    /// The item is over; finish draining within the drain bounds.
    Finished,
}

/// Run `cmd` to completion or until `limits.timeout` elapses, forwarding its
/// stdout/stderr to `sink` line by line.
///
/// Stdin is closed. The child's exit code is reported but not interpreted.
#[instrument(skip_all, fields(program = ?cmd.get_program(), timeout_ms = limits.timeout.as_millis()))]
pub fn run_with_timeout(
    mut cmd: Command,
    limits: Limits,
    sink: &dyn OutputSink,
) -> Result<ProcessOutcome, ProcessError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    debug!("spawning child process");
    let started = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            error!(err = %source, "failed to spawn command");
            return Err(ProcessError::Spawn {
                program: cmd.get_program().to_string_lossy().into_owned(),
                source,
            });
        }
    };
    let _active = interrupt::track(child.id());
    let group = ProcessGroup::of(&child);

    // Readers are detached: a descendant outside the group may hold the pipes
    // open indefinitely, and the item must not wait for it.
    let (tx, rx) = mpsc::channel();
    let mut open = 0usize;
    if let Some(pipe) = child.stdout.take() {
        spawn_reader(pipe, Stream::Stdout, tx.clone());
        open += 1;
    }
    if let Some(pipe) = child.stderr.take() {
        spawn_reader(pipe, Stream::Stderr, tx.clone());
        open += 1;
    }

    thread::scope(|scope| {
        let forwarder = scope.spawn(move || forward_events(rx, open, sink));

        let waited = wait_or_terminate(&mut child, &group, limits);
        if waited.is_err()
            && let Err(err) = child.kill()
        {
            warn!(err = %err, "failed to kill child after supervision error");
        }
        if let Err(err) = group.kill() {
            warn!(err = %err, "failed to sweep process group");
        }
        // The forwarder outlives `tx` only through the detached readers.
        let _ = tx.send(Event::Finished);
        drop(tx);

        if forwarder.join().is_err() {
            return Err(ProcessError::Supervise {
                action: "join output forwarder",
                source: io::Error::other("output forwarder thread panicked"),
            });
        }

        let (status, timed_out) = waited?;
        let elapsed = started.elapsed();
        debug!(exit_code = ?status.code(), timed_out, elapsed_ms = elapsed.as_millis(), "command finished");
        Ok(ProcessOutcome {
            status,
            timed_out,
            elapsed,
        })
    })
}

fn spawn_reader<R: Read + Send + 'static>(pipe: R, stream: Stream, tx: Sender<Event>) {
    thread::spawn(move || {
        let result = read_lines(pipe, stream, &tx);
        let _ = tx.send(Event::Closed(stream, result));
    });
}

/// Read `pipe` line by line into the channel. Stops early once nobody listens.
fn read_lines<R: Read>(pipe: R, stream: Stream, tx: &Sender<Event>) -> io::Result<u64> {
    let mut reader = BufReader::new(pipe);
    let mut read = 0u64;

    loop {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        read += n as u64;
        if tx.send(Event::Line(stream, line)).is_err() {
            break;
        }
    }

    Ok(read)
}

/// Pass reader events to `sink` until both streams close, or until the item is
/// over and the pipes go quiet.
fn forward_events(rx: Receiver<Event>, mut open: usize, sink: &dyn OutputSink) {
    let mut finished_at: Option<Instant> = None;
    let mut sink_failed = false;

    while open > 0 {
        let event = match finished_at {
            None => match rx.recv() {
                Ok(event) => event,
                Err(_) => break,
            },
            Some(finished) => {
                let remaining = DRAIN_LIMIT.saturating_sub(finished.elapsed());
                match rx.recv_timeout(remaining.min(DRAIN_IDLE)) {
                    Ok(event) if !remaining.is_zero() => event,
                    Ok(_) | Err(RecvTimeoutError::Timeout) => {
                        warn!(
                            open,
                            "child output still open after the item ended, abandoning drain"
                        );
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        };

        match event {
            Event::Line(stream, line) => {
                // Keep consuming after a sink failure so the child never blocks on a full pipe.
                if !sink_failed && let Err(err) = sink.passthrough(stream, &line) {
                    warn!(?stream, err = %err, "failed to forward child output");
                    sink_failed = true;
                }
            }
            Event::Closed(stream, Ok(bytes)) => {
                debug!(?stream, bytes, "output reader finished");
                open -= 1;
            }
            Event::Closed(stream, Err(err)) => {
                warn!(?stream, err = %err, "output reader failed");
                open -= 1;
            }
            Event::Finished => finished_at = Some(Instant::now()),
        }
    }
}

/// Returns the exit status and whether the timeout fired.
fn wait_or_terminate(
    child: &mut Child,
    group: &ProcessGroup,
    limits: Limits,
) -> Result<(ExitStatus, bool), ProcessError> {
    if let Some(status) = child
        .wait_timeout(limits.timeout)
        .map_err(supervise_err("wait for child"))?
    {
        return Ok((status, false));
    }

    warn!(
        timeout_ms = limits.timeout.as_millis(),
        "command timed out, terminating process group"
    );
    group
        .terminate(child)
        .map_err(supervise_err("terminate process group"))?;
    if let Some(status) = child
        .wait_timeout(limits.grace_period)
        .map_err(supervise_err("wait for child after terminate"))?
    {
        debug!("child exited within grace period");
        return Ok((status, true));
    }

    warn!(
        grace_ms = limits.grace_period.as_millis(),
        "child ignored terminate, killing process group"
    );
    group
        .kill_now(child)
        .map_err(supervise_err("kill process group"))?;
    let status = child
        .wait()
        .map_err(supervise_err("wait for child after kill"))?;
    Ok((status, true))
}

#[cfg(unix)]
struct ProcessGroup {
    pgid: nix::unistd::Pid,
}

#[cfg(unix)]
impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self {
            pgid: nix::unistd::Pid::from_raw(child.id() as i32),
        }
    }

    fn terminate(&self, _child: &mut Child) -> io::Result<()> {
        self.signal(nix::sys::signal::Signal::SIGTERM)
    }

    fn kill_now(&self, _child: &mut Child) -> io::Result<()> {
        self.signal(nix::sys::signal::Signal::SIGKILL)
    }

    /// Final sweep once the leader is gone.
    fn kill(&self) -> io::Result<()> {
        self.signal(nix::sys::signal::Signal::SIGKILL)
    }

    fn signal(&self, signal: nix::sys::signal::Signal) -> io::Result<()> {
        use nix::errno::Errno;

        match nix::sys::signal::killpg(self.pgid, signal) {
            // The group is already empty.
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }
}

/// Without process groups only the direct child can be stopped.
#[cfg(not(unix))]
struct ProcessGroup;

#[cfg(not(unix))]
impl ProcessGroup {
    fn of(_child: &Child) -> Self {
        Self
    }

    fn terminate(&self, child: &mut Child) -> io::Result<()> {
        child.kill()
    }

    fn kill_now(&self, child: &mut Child) -> io::Result<()> {
        child.kill()
    }

    fn kill(&self) -> io::Result<()> {
        Ok(())
    }
}
