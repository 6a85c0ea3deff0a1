//! Error taxonomy for batch runs.
//!
//! Only these errors abort a batch. Per-item problems (launch failures,
//! timeouts, non-zero exits) are recorded as [`RunResult`](crate::core::types::RunResult)
//! values instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::io::process::ProcessError;

#[derive(Debug, Error)]
pub enum BatchError {
    /// The input directory does not exist or cannot be listed.
    #[error("directory not found or unreadable: {}", path.display())]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The report itself could not be written.
    #[error("write batch report")]
    Output(#[from] io::Error),

    /// The OS failed while waiting on or signalling a running child, so its
    /// termination can no longer be guaranteed.
    #[error("lost control of child process for {item}")]
    Supervise {
        item: String,
        #[source]
        source: ProcessError,
    },
}
