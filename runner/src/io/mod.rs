//! I/O helpers for batch runs.

pub mod config;
pub mod console;
pub mod discover;
pub mod interrupt;
pub mod process;
