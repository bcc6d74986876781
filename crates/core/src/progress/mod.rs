//! Progress stream parsing.
//!
//! ffmpeg's `-progress` output is a sequence of `key=value` lines flushed
//! in pages that end with `progress=continue` or `progress=end`:
//!
//! ```text
//! frame=150
//! fps=29.97
//! stream_0_0_q=28.0
//! bitrate=1200.5kbits/s
//! total_size=512
//! out_time_us=5000000
//! out_time_ms=5000000
//! out_time=00:00:05.000000
//! dup_frames=0
//! drop_frames=0
//! speed=1.50x
//! progress=continue
//! ```
//!
//! [`units`] parses individual tokens, [`parse_block`] turns one page into a
//! [`StatisticsSnapshot`], and [`ProgressReader`] tails the file and emits
//! run events.

mod error;
mod reader;
mod statistics;
pub mod units;
mod update;

pub use error::ProgressError;
pub use reader::{
    ProgressReader, ReadOutcome, RecordBlock, DEFAULT_BLOCK_LINES, DEFAULT_POLL_INTERVAL,
};
pub use statistics::{parse_block, StatisticsSnapshot, MIN_RECOGNIZED_FIELDS};
pub use units::{clock_to_seconds, parse_byte_size, parse_duration};
pub use update::ProgressUpdate;
