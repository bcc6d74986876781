//! Run coordination.
//!
//! A [`Transcoder`] probes the source, builds the command line, launches
//! ffmpeg with its progress redirected into a [`ScratchFile`], and runs a
//! [`ProgressReader`](crate::progress::ProgressReader) against that file
//! until both the process and the reader are done.
//!
//! # Example
//!
//! ```ignore
//! use ffwatch_core::{Config, Transcoder, TranscodeJob};
//!
//! let mut transcoder = Transcoder::new(Config::default());
//! transcoder.events_mut().on_progress(|update| async move {
//!     println!("{:.0}% ({} frames)", update.percent(), update.frame);
//! });
//!
//! let job = TranscodeJob::new("input.mp4", "output.mp4")
//!     .arg("vf", "scale=1920:1080")
//!     .arg("codec:a", "aac");
//! let report = transcoder.run(job).await?;
//! println!("Done in {:?}", report.elapsed);
//! ```

mod cancel;
mod command;
mod error;
mod scratch;
mod transcoder;
mod types;

pub use cancel::CancelToken;
pub use command::{build_command, with_progress_target, FfmpegArgs};
pub use error::RunError;
pub use scratch::ScratchFile;
pub use transcoder::Transcoder;
pub use types::{RunContext, RunReport, TranscodeJob};
