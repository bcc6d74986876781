//! Error types for progress stream parsing.

use thiserror::Error;

/// Errors raised while parsing the ffmpeg progress stream.
///
/// Any of these aborts the run: a present, non-`N/A` field that fails to
/// parse means the producer and the parser disagree about the format.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// A size token had an unparseable numeric part or an unknown unit.
    #[error("Malformed size token: {token}")]
    MalformedSize { token: String },

    /// A timestamp token did not match `[-]HH:MM:SS.ff`.
    #[error("Malformed time token: {token}")]
    MalformedTime { token: String },

    /// A numeric field (frame, fps, bitrate, speed) failed to parse.
    #[error("Malformed {field} value: {token}")]
    MalformedNumber { field: &'static str, token: String },

    /// The progress destination could not be opened.
    #[error("I/O error reading progress: {0}")]
    Io(#[from] std::io::Error),
}

impl ProgressError {
    pub(crate) fn malformed_number(field: &'static str, token: impl Into<String>) -> Self {
        Self::MalformedNumber {
            field,
            token: token.into(),
        }
    }
}
