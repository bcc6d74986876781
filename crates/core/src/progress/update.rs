//! Derived progress metrics.

use std::time::Duration;

use crate::probe::MediaTiming;

use super::statistics::StatisticsSnapshot;

/// Progress derived from a snapshot and the source media timing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Completed fraction, rounded to two decimals. Not clamped: metadata
    /// mismatches can push it past `1.0`.
    pub fraction: f64,
    /// Wall-clock time since the process was launched.
    pub elapsed: Duration,
    /// Estimated time left; zero outside `0 < fraction < 1`.
    pub remaining: Duration,
    /// Frames encoded so far.
    pub frame: u64,
    /// Whether the snapshot was the terminal record.
    pub is_finished: bool,
    /// Output bitrate in kbits/s.
    pub bitrate_kbps: f64,
}

impl ProgressUpdate {
    /// Computes the update for `snapshot` at `elapsed` into the run.
    pub fn compute(snapshot: &StatisticsSnapshot, timing: &MediaTiming, elapsed: Duration) -> Self {
        let fraction = completed_fraction(snapshot.frame, timing);
        let remaining = if fraction > 0.0 && fraction < 1.0 {
            Duration::from_secs_f64(elapsed.as_secs_f64() / fraction).saturating_sub(elapsed)
        } else {
            Duration::ZERO
        };

        Self {
            fraction,
            elapsed,
            remaining,
            frame: snapshot.frame,
            is_finished: snapshot.is_terminal(),
            bitrate_kbps: snapshot.bitrate_kbps,
        }
    }

    /// Fraction as a percentage, for display.
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }
}

fn completed_fraction(frame: u64, timing: &MediaTiming) -> f64 {
    let total_frames = timing.total_frames();
    if !total_frames.is_finite() || total_frames <= 0.0 {
        return 0.0;
    }
    (frame as f64 / total_frames * 100.0).round() / 100.0
}
