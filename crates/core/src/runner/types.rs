//! Types for the runner module.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::events::EventRegistry;
use crate::probe::MediaTiming;
use crate::progress::StatisticsSnapshot;

use super::command::FfmpegArgs;

/// What to transcode and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    /// Input media file.
    pub source: PathBuf,
    /// Output media file; overwritten if present.
    pub output: PathBuf,
    /// Options placed between the input and the output.
    pub args: FfmpegArgs,
}

impl TranscodeJob {
    /// Creates a job with no extra options.
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            args: FfmpegArgs::new(),
        }
    }

    /// Adds a `-key value` option.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args = self.args.arg(key, value);
        self
    }

    /// Adds a bare `-key` flag.
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.args = self.args.flag(key);
        self
    }

    /// Replaces all options with `args`, in iteration order.
    pub fn with_args<I, K, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.args = args.into_iter().collect();
        self
    }
}

/// State owned by one run, from preparation until both activities finish.
#[derive(Debug)]
pub struct RunContext {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Options as supplied by the caller.
    pub args: FfmpegArgs,
    /// The built command line, without the progress redirection.
    pub command: Vec<String>,
    /// Frame rate and duration, resolved once before launch.
    pub timing: MediaTiming,
    /// Wall-clock launch time.
    pub started_at: DateTime<Utc>,
    /// Monotonic launch time, used for elapsed/remaining.
    pub started: Instant,
    pub events: EventRegistry,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub source: PathBuf,
    pub output: PathBuf,
    /// The command line ffmpeg ran with, without the progress redirection.
    pub command: Vec<String>,
    /// Frames reported by the terminal record.
    pub frames: u64,
    /// Wall-clock time from launch to the terminal record.
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    /// The terminal snapshot.
    pub last_snapshot: StatisticsSnapshot,
}
