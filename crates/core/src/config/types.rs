use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

/// External binaries and process supervision
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FfmpegConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Directory for per-run progress scratch files.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Kill the process after this many seconds. No deadline when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            scratch_dir: default_scratch_dir(),
            timeout_secs: None,
        }
    }
}

impl FfmpegConfig {
    /// Creates a config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the scratch directory.
    pub fn with_scratch_dir(mut self, scratch_dir: PathBuf) -> Self {
        self.scratch_dir = scratch_dir;
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Progress file polling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgressConfig {
    /// Delay between scans of the progress file, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Lines per progress record block.
    #[serde(default = "default_block_lines")]
    pub block_lines: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            block_lines: default_block_lines(),
        }
    }
}

impl ProgressConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_block_lines() -> usize {
    12
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ffmpeg.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffmpeg.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.ffmpeg.timeout_secs, None);
        assert_eq!(config.progress.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.progress.block_lines, 12);
    }

    #[test]
    fn test_config_builder() {
        let config = FfmpegConfig::with_paths(
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffprobe"),
        )
        .with_scratch_dir(PathBuf::from("/tmp/test"))
        .with_timeout(7200);

        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/test"));
        assert_eq!(config.timeout_secs, Some(7200));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.progress.poll_interval_ms,
            config.progress.poll_interval_ms
        );
        assert_eq!(parsed.ffmpeg.scratch_dir, config.ffmpeg.scratch_dir);
    }
}
