//! Types for the probe module.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::progress::clock_to_seconds;

use super::error::ProbeError;

/// Metadata key holding the `HH:MM:SS.fff` duration.
pub const DURATION_KEY: &str = "Duration";

/// One stream of a probed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Stream index within the container.
    pub index: u32,
    /// `video`, `audio`, `subtitle`, ...
    pub codec_type: String,
    /// Codec short name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec_name: Option<String>,
    /// Frames per second; zero for streams without frames.
    pub frame_rate: f64,
}

/// Result of probing a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub path: PathBuf,
    pub streams: Vec<StreamDescriptor>,
    /// Container metadata. Always carries [`DURATION_KEY`] when known.
    pub metadata: HashMap<String, String>,
}

impl ProbeReport {
    /// Frame rate of the first video stream, or of stream 0 if there is none.
    pub fn frame_rate(&self) -> Option<f64> {
        self.streams
            .iter()
            .find(|s| s.codec_type == "video")
            .or_else(|| self.streams.first())
            .map(|s| s.frame_rate)
    }

    /// Raw duration metadata.
    pub fn duration(&self) -> Option<&str> {
        self.metadata.get(DURATION_KEY).map(String::as_str)
    }
}

/// Frame rate and duration resolved once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaTiming {
    pub frame_rate: f64,
    pub duration_secs: f64,
}

impl MediaTiming {
    /// Resolves the timing from a probe report.
    ///
    /// Missing or unparseable duration metadata resolves to zero seconds.
    pub fn from_report(report: &ProbeReport) -> Result<Self, ProbeError> {
        let frame_rate = report.frame_rate().ok_or_else(|| ProbeError::NoStreams {
            path: report.path.clone(),
        })?;
        let duration_secs = report.duration().map(clock_to_seconds).unwrap_or(0.0);

        Ok(Self {
            frame_rate,
            duration_secs,
        })
    }

    /// Expected number of frames in the source.
    pub fn total_frames(&self) -> f64 {
        self.frame_rate * self.duration_secs
    }
}
