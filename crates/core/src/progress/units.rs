//! Scalar parsers for the tokens ffmpeg writes into its progress stream.

use chrono::TimeDelta;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::error::ProgressError;

/// Kilobyte multiplier; ffmpeg reports sizes in 1024-byte units.
const KIB: u64 = 1024;

static PROGRESS_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-)?(\d+):(\d+):(\d+)\.(\d+)$").expect("progress time pattern is valid")
});

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d+):(\d+\.\d+)").expect("clock pattern is valid"));

/// Parses a size token such as `1024kB`, `1024KiB` or a bare `1024` into bytes.
///
/// All three spellings are kilobyte counts. Any other suffix is rejected.
pub fn parse_byte_size(token: &str) -> Result<u64, ProgressError> {
    let malformed = || ProgressError::MalformedSize {
        token: token.to_string(),
    };

    let digits = token
        .strip_suffix("KiB") // FFmpeg 7.0 and later
        .or_else(|| token.strip_suffix("kB")) // FFmpeg 6.x and prior
        .unwrap_or(token);

    digits
        .parse::<u64>()
        .map_err(|_| malformed())?
        .checked_mul(KIB)
        .ok_or_else(malformed)
}

/// Parses a signed `[-]HH:MM:SS.ff` timestamp.
///
/// The sign applies to the whole value, so `-00:00:05.00` is minus five
/// seconds. The fractional part is read as a decimal fraction of a second.
pub fn parse_duration(token: &str) -> Result<TimeDelta, ProgressError> {
    let malformed = || ProgressError::MalformedTime {
        token: token.to_string(),
    };

    let caps = PROGRESS_TIME.captures(token).ok_or_else(malformed)?;
    let field = |i: usize| -> Result<i64, ProgressError> {
        caps[i].parse::<i64>().map_err(|_| malformed())
    };

    let hours = field(2)?;
    let minutes = field(3)?;
    let seconds = field(4)?;
    let nanos = fraction_to_nanos(&caps[5]);

    let whole = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|s| s.checked_add(seconds))
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(malformed)?;
    let total = whole + TimeDelta::nanoseconds(nanos);

    Ok(if caps.get(1).is_some() { -total } else { total })
}

/// Converts a media duration like `01:02:03.000` to seconds.
///
/// Unparseable input yields `0.0`: unknown duration metadata is not fatal.
pub fn clock_to_seconds(token: &str) -> f64 {
    let Some(caps) = CLOCK_TIME.captures(token.trim()) else {
        return 0.0;
    };

    let parts: Option<Vec<f64>> = (1..=3).map(|i| caps[i].parse::<f64>().ok()).collect();
    match parts.as_deref() {
        Some([hours, minutes, seconds]) => hours * 3600.0 + minutes * 60.0 + seconds,
        _ => 0.0,
    }
}

fn fraction_to_nanos(digits: &str) -> i64 {
    // Only the first nine digits fit in nanosecond precision.
    let significant = &digits[..digits.len().min(9)];
    let value = significant.parse::<i64>().unwrap_or(0);
    value * 10_i64.pow(9 - significant.len() as u32)
}
