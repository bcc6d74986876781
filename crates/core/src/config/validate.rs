use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Binary paths are not empty
/// - Poll interval and block size are not 0
/// - Timeout, when set, is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.ffmpeg.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "ffmpeg.ffmpeg_path cannot be empty".to_string(),
        ));
    }

    if config.ffmpeg.ffprobe_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "ffmpeg.ffprobe_path cannot be empty".to_string(),
        ));
    }

    if config.ffmpeg.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "ffmpeg.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.progress.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "progress.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    if config.progress.block_lines == 0 {
        return Err(ConfigError::ValidationError(
            "progress.block_lines cannot be 0".to_string(),
        ));
    }

    Ok(())
}
