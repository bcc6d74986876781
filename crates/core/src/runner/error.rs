//! Error types for the runner module.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::probe::ProbeError;
use crate::progress::ProgressError;

/// Errors that can end a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The source could not be probed; nothing was launched.
    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    /// The progress stream contained a value that failed to parse.
    #[error("Progress stream error: {0}")]
    Progress(#[from] ProgressError),

    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFmpeg exited with a non-zero status.
    #[error("FFmpeg exited with code: {code:?}")]
    ProcessFailed {
        code: Option<i32>,
        stderr: Option<String>,
    },

    /// FFmpeg exited successfully but never wrote `progress=end`.
    #[error("FFmpeg exited without a terminal progress record")]
    NoTerminalRecord,

    /// The run was cancelled by the caller.
    #[error("Run cancelled")]
    Cancelled,

    /// The run exceeded its deadline.
    #[error("Run timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The scratch file could not be created or removed.
    #[error("Scratch file error at {path}: {source}")]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while supervising the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// Creates a process failed error with the captured stderr tail.
    pub fn process_failed(code: Option<i32>, stderr: Option<String>) -> Self {
        Self::ProcessFailed { code, stderr }
    }

    pub(crate) fn resource(path: &Path, source: std::io::Error) -> Self {
        Self::Resource {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_) | Self::Resource { .. })
    }
}
