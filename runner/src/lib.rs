//! Bounded batch runner.
//!
//! Runs an external interpreter once per entry of a directory, each under its
//! own wall-clock timeout, and reports per-item status on stdout.
//!
//! - **[`core`]**: Pure, deterministic logic (item types, durations, command templates).
//! - **[`io`]**: Side-effecting operations (config files, directory listing,
//!   child processes, console output).
//!
//! [`batch`] coordinates the two to implement the `runner` binary.

pub mod batch;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
