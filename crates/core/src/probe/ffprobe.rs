//! FFprobe-based prober implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use super::error::ProbeError;
use super::traits::MediaProber;
use super::types::{ProbeReport, StreamDescriptor, DURATION_KEY};

/// Prober backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    /// Creates a prober running the binary at `ffprobe_path`.
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Parses ffprobe JSON output (run with `-sexagesimal`) into a report.
    fn parse_probe_output(path: &Path, output: &str) -> Result<ProbeReport, ProbeError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: Option<String>,
            duration: Option<String>,
            #[serde(default)]
            tags: HashMap<String, String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            index: u32,
            codec_type: Option<String>,
            codec_name: Option<String>,
            r_frame_rate: Option<String>,
            avg_frame_rate: Option<String>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| ProbeError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let streams = probe
            .streams
            .into_iter()
            .map(|s| StreamDescriptor {
                index: s.index,
                codec_type: s.codec_type.unwrap_or_else(|| "unknown".to_string()),
                codec_name: s.codec_name,
                frame_rate: s
                    .r_frame_rate
                    .as_deref()
                    .and_then(parse_frame_rate)
                    .or_else(|| s.avg_frame_rate.as_deref().and_then(parse_frame_rate))
                    .unwrap_or(0.0),
            })
            .collect();

        let mut metadata = probe.format.tags;
        if let Some(duration) = probe.format.duration {
            metadata.insert(DURATION_KEY.to_string(), duration);
        }
        if let Some(format_name) = probe.format.format_name {
            metadata.insert("format_name".to_string(), format_name);
        }

        Ok(ProbeReport {
            path: path.to_path_buf(),
            streams,
            metadata,
        })
    }
}

/// Parses a frame rate like `24000/1001`, `30/1` or `25`.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    match raw.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f64>().ok()?;
            let den = den.parse::<f64>().ok()?;
            if den > 0.0 {
                Some(num / den)
            } else {
                None
            }
        }
        None => raw.parse::<f64>().ok(),
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError> {
        if !path.exists() {
            return Err(ProbeError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        debug!("Probing {:?} with {:?}", path, self.ffprobe_path);
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-sexagesimal",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProbeError::FfprobeNotFound {
                        path: self.ffprobe_path.clone(),
                    }
                } else {
                    ProbeError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ProbeError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let report = Self::parse_probe_output(path, &stdout)?;
        if report.streams.is_empty() {
            return Err(ProbeError::NoStreams {
                path: path.to_path_buf(),
            });
        }
        Ok(report)
    }

    async fn validate(&self) -> Result<(), ProbeError> {
        let result = Command::new(&self.ffprobe_path)
            .arg("-version")
            .output()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ProbeError::FfprobeNotFound {
                path: self.ffprobe_path.clone(),
            }),
            Err(e) => Err(ProbeError::Io(e)),
        }
    }
}
