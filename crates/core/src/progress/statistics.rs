//! Parsing of a single ffmpeg progress record block into a snapshot.

use chrono::TimeDelta;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashMap;

use super::error::ProgressError;
use super::units::{parse_byte_size, parse_duration};

/// Minimum number of recognized keys for a block to count as a record.
pub const MIN_RECOGNIZED_FIELDS: usize = 4;

/// Value ffmpeg writes for fields it cannot report yet.
const NOT_AVAILABLE: &str = "N/A";

/// Value of the `progress` key while ffmpeg is still encoding.
const CONTINUE_MARKER: &str = "continue";

// `size` also matches `total_size` and `time` matches `out_time`, while
// `out_time_ms`/`out_time_us` and `dup_frames` are not matched at all.
static FIELD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(frame|fps|size|time|bitrate|speed|progress)\s*=\s*(\S+)")
        .expect("field pattern is valid")
});

/// One parsed progress record.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsSnapshot {
    /// Frames encoded so far.
    pub frame: u64,
    /// Current encoding rate in frames per second.
    pub fps: f64,
    /// Bytes written to the output so far.
    pub size_bytes: u64,
    /// Position in the encoded content. Can be negative in the first block.
    pub out_time: TimeDelta,
    /// Output bitrate in kbits/s.
    pub bitrate_kbps: f64,
    /// Encoding speed as a multiple of realtime.
    pub speed: f64,
    /// `true` while ffmpeg is still producing records.
    pub continuing: bool,
}

impl Default for StatisticsSnapshot {
    fn default() -> Self {
        Self {
            frame: 0,
            fps: 0.0,
            size_bytes: 0,
            out_time: TimeDelta::zero(),
            bitrate_kbps: 0.0,
            speed: 0.0,
            continuing: false,
        }
    }
}

impl StatisticsSnapshot {
    /// Whether this snapshot is the final record of the run.
    pub fn is_terminal(&self) -> bool {
        !self.continuing
    }
}

/// Parses the space-joined lines of one record block.
///
/// Returns `Ok(None)` when fewer than [`MIN_RECOGNIZED_FIELDS`] distinct keys
/// are present; that is a partial write and the caller keeps reading.
/// Fields valued `N/A` keep their default. Any other unparseable value is
/// an error.
pub fn parse_block(text: &str) -> Result<Option<StatisticsSnapshot>, ProgressError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for caps in FIELD_PATTERN.captures_iter(text) {
        if let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) {
            // Last write wins.
            fields.insert(key.as_str(), value.as_str());
        }
    }

    if fields.len() < MIN_RECOGNIZED_FIELDS {
        return Ok(None);
    }

    let mut snapshot = StatisticsSnapshot::default();
    for (key, value) in fields {
        if value == NOT_AVAILABLE {
            continue;
        }
        match key {
            "frame" => {
                snapshot.frame = value
                    .parse()
                    .map_err(|_| ProgressError::malformed_number("frame", value))?;
            }
            "fps" => snapshot.fps = parse_real("fps", value, "")?,
            "size" => snapshot.size_bytes = parse_byte_size(value)?,
            "time" => snapshot.out_time = parse_duration(value)?,
            "bitrate" => snapshot.bitrate_kbps = parse_real("bitrate", value, "kbits/s")?,
            "speed" => snapshot.speed = parse_real("speed", value, "x")?,
            "progress" => snapshot.continuing = value == CONTINUE_MARKER,
            _ => {}
        }
    }

    Ok(Some(snapshot))
}

fn parse_real(field: &'static str, value: &str, unit: &str) -> Result<f64, ProgressError> {
    value
        .strip_suffix(unit)
        .unwrap_or(value)
        .trim()
        .parse::<f64>()
        .map_err(|_| ProgressError::malformed_number(field, value))
}
