//! Line-oriented batch report.
//!
//! ```text
//! [<item-name>]
//! <passthrough child output, if any>
//! Program execution killed after running for <timeout>
//! <blank line>
//! ```

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::core::duration::format_duration;
use crate::core::types::WorkItem;
use crate::io::process::{OutputSink, Stream};

/// Writer that remembers whether the last byte written ended a line.
struct Tracked<W> {
    inner: W,
    at_line_start: bool,
}

impl<W: Write> Tracked<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            at_line_start: true,
        }
    }

    fn write_chunk(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.inner.write_all(bytes)?;
        self.at_line_start = bytes.ends_with(b"\n");
        self.inner.flush()
    }

    /// Report lines always start on a fresh line, even after unterminated child output.
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        if !self.at_line_start {
            self.inner.write_all(b"\n")?;
        }
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\n")?;
        self.at_line_start = true;
        self.inner.flush()
    }
}

/// Report writer shared by the batch loop and the child output readers.
///
/// Report lines and child stdout go to `stdout`; child stderr goes to `stderr`.
pub struct Console<O, E> {
    stdout: Mutex<Tracked<O>>,
    stderr: Mutex<Tracked<E>>,
}

impl<O: Write + Send, E: Write + Send> Console<O, E> {
    pub fn new(stdout: O, stderr: E) -> Self {
        Self {
            stdout: Mutex::new(Tracked::new(stdout)),
            stderr: Mutex::new(Tracked::new(stderr)),
        }
    }

    pub fn label(&self, item: &WorkItem) -> io::Result<()> {
        self.out().write_line(&format!("[{}]", item.name()))
    }

    pub fn timeout_notice(&self, timeout: Duration) -> io::Result<()> {
        self.out().write_line(&format!(
            "Program execution killed after running for {}",
            format_duration(timeout)
        ))
    }

    pub fn launch_failure(&self, reason: &str) -> io::Result<()> {
        self.out()
            .write_line(&format!("Program launch failed: {reason}"))
    }

    pub fn separator(&self) -> io::Result<()> {
        self.out().write_line("")
    }

    pub fn into_inner(self) -> (O, E) {
        let stdout = self
            .stdout
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let stderr = self
            .stderr
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        (stdout.inner, stderr.inner)
    }

    fn out(&self) -> MutexGuard<'_, Tracked<O>> {
        self.stdout.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<O: Write + Send, E: Write + Send> OutputSink for Console<O, E> {
    fn passthrough(&self, stream: Stream, line: &[u8]) -> io::Result<()> {
        match stream {
            Stream::Stdout => self.out().write_chunk(line),
            Stream::Stderr => self
                .stderr
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write_chunk(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).expect("utf8")
    }

    #[test]
    fn writes_label_notice_and_separator() {
        let console = Console::new(Vec::new(), Vec::new());
        console
            .label(&WorkItem::from_path("dir/slow.prog"))
            .expect("label");
        console
            .passthrough(Stream::Stdout, b"partial\n")
            .expect("passthrough");
        console
            .timeout_notice(Duration::from_secs(1))
            .expect("notice");
        console.separator().expect("separator");

        let (stdout, stderr) = console.into_inner();
        assert_eq!(
            text(stdout),
            "[slow.prog]\npartial\nProgram execution killed after running for 1s\n\n"
        );
        assert!(stderr.is_empty());
    }

    #[test]
    fn unterminated_output_gets_newline_before_report_lines() {
        let console = Console::new(Vec::new(), Vec::new());
        console.label(&WorkItem::from_path("a")).expect("label");
        console
            .passthrough(Stream::Stdout, b"42")
            .expect("passthrough");
        console.separator().expect("separator");

        let (stdout, _) = console.into_inner();
        assert_eq!(text(stdout), "[a]\n42\n\n");
    }

    #[test]
    fn stderr_passthrough_is_kept_apart() {
        let console = Console::new(Vec::new(), Vec::new());
        console.label(&WorkItem::from_path("a")).expect("label");
        console
            .passthrough(Stream::Stderr, b"Traceback\n")
            .expect("passthrough");
        console
            .launch_failure("python3 a: not found")
            .expect("failure");

        let (stdout, stderr) = console.into_inner();
        assert_eq!(text(stdout), "[a]\nProgram launch failed: python3 a: not found\n");
        assert_eq!(text(stderr), "Traceback\n");
    }
}
