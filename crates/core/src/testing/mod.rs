//! Testing utilities and mock implementations.
//!
//! The mocks here stand in for external tools so runs can be exercised
//! without ffprobe installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use ffwatch_core::testing::{fixtures, MockProber};
//!
//! let prober = MockProber::new();
//! prober
//!     .set_default_report(fixtures::probe_report("/in.mp4", 30.0, "0:00:10.000000"))
//!     .await;
//!
//! let transcoder = Transcoder::with_prober(config, prober);
//! ```

mod mock_prober;

pub use mock_prober::MockProber;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use crate::probe::{ProbeReport, StreamDescriptor, DURATION_KEY};

    /// Frame rate assumed by [`progress_page`] when deriving `out_time`.
    pub const PAGE_FRAME_RATE: u64 = 30;

    /// One full 12-line progress record, as ffmpeg writes it.
    pub fn progress_page(frame: u64, continuing: bool) -> String {
        let out_time_us = frame * 1_000_000 / PAGE_FRAME_RATE;
        let total_secs = out_time_us / 1_000_000;
        let micros = out_time_us % 1_000_000;

        let lines = [
            format!("frame={}", frame),
            "fps=30.00".to_string(),
            "stream_0_0_q=28.0".to_string(),
            "bitrate=1200.5kbits/s".to_string(),
            format!("total_size={}", frame * 48),
            format!("out_time_us={}", out_time_us),
            format!("out_time_ms={}", out_time_us),
            format!(
                "out_time={:02}:{:02}:{:02}.{:06}",
                total_secs / 3600,
                (total_secs / 60) % 60,
                total_secs % 60,
                micros
            ),
            "dup_frames=0".to_string(),
            "drop_frames=0".to_string(),
            "speed=1.50x".to_string(),
            format!("progress={}", if continuing { "continue" } else { "end" }),
        ];

        let mut page = lines.join("\n");
        page.push('\n');
        page
    }

    /// Probe report with a single video stream.
    pub fn probe_report(path: &str, frame_rate: f64, duration: &str) -> ProbeReport {
        let mut metadata = HashMap::new();
        metadata.insert(DURATION_KEY.to_string(), duration.to_string());
        metadata.insert("format_name".to_string(), "mov,mp4,m4a,3gp,3g2,mj2".to_string());

        ProbeReport {
            path: PathBuf::from(path),
            streams: vec![StreamDescriptor {
                index: 0,
                codec_type: "video".to_string(),
                codec_name: Some("h264".to_string()),
                frame_rate,
            }],
            metadata,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::progress::parse_block;
        use chrono::TimeDelta;

        #[test]
        fn test_progress_page_parses() {
            let page = progress_page(45, true);
            assert_eq!(page.lines().count(), 12);

            let joined = page.lines().collect::<Vec<_>>().join(" ");
            let snapshot = parse_block(&joined).unwrap().unwrap();
            assert_eq!(snapshot.frame, 45);
            assert_eq!(snapshot.out_time, TimeDelta::milliseconds(1500));
            assert_eq!(snapshot.size_bytes, 45 * 48 * 1024);
            assert!(snapshot.continuing);
        }
    }
}
