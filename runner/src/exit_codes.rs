//! Stable exit codes for the runner CLI.

/// Every item was visited, whatever the individual results.
pub const OK: i32 = 0;
/// The directory could not be read, or configuration was invalid.
pub const INVALID: i32 = 1;
/// The runner was stopped by SIGINT/SIGTERM (128 + SIGINT, as shells report it).
pub const INTERRUPTED: i32 = 130;
