pub mod config;
pub mod events;
pub mod probe;
pub mod progress;
pub mod runner;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, FfmpegConfig,
    ProgressConfig,
};
pub use events::{EventHandler, EventKind, EventRegistry, RunEvent};
pub use probe::{FfprobeProber, MediaProber, MediaTiming, ProbeError, ProbeReport};
pub use progress::{ProgressError, ProgressReader, ProgressUpdate, StatisticsSnapshot};
pub use runner::{CancelToken, FfmpegArgs, RunError, RunReport, TranscodeJob, Transcoder};
