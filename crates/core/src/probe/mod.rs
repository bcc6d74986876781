//! Media probing.
//!
//! A run needs the source frame rate and total duration before any progress
//! can be turned into a completed fraction. [`MediaProber`] abstracts where
//! those come from; [`FfprobeProber`] asks the `ffprobe` binary.

mod error;
mod ffprobe;
mod traits;
mod types;

pub use error::ProbeError;
pub use ffprobe::FfprobeProber;
pub use traits::MediaProber;
pub use types::{MediaTiming, ProbeReport, StreamDescriptor, DURATION_KEY};
