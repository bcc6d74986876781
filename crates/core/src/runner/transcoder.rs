//! FFmpeg run coordinator.

use chrono::Utc;
use std::future::pending;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::events::{EventRegistry, RunEvent};
use crate::probe::{FfprobeProber, MediaProber, MediaTiming};
use crate::progress::{ProgressReader, ReadOutcome};

use super::cancel::CancelToken;
use super::command::{build_command, with_progress_target};
use super::error::RunError;
use super::scratch::ScratchFile;
use super::types::{RunContext, RunReport, TranscodeJob};

/// Bytes of ffmpeg stderr kept for error reports.
const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// How long to wait for the stderr pipe to close after the process exited.
const STDERR_GRACE: Duration = Duration::from_secs(1);

/// Runs ffmpeg jobs and reports their progress through registered events.
pub struct Transcoder<P = FfprobeProber> {
    config: Config,
    prober: P,
    events: EventRegistry,
}

impl Transcoder<FfprobeProber> {
    /// Creates a transcoder probing with the configured ffprobe binary.
    pub fn new(config: Config) -> Self {
        let prober = FfprobeProber::new(config.ffmpeg.ffprobe_path.clone());
        Self::with_prober(config, prober)
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }
}

impl<P: MediaProber> Transcoder<P> {
    /// Creates a transcoder with a custom prober.
    pub fn with_prober(config: Config, prober: P) -> Self {
        Self {
            config,
            prober,
            events: EventRegistry::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    /// Handlers registered here apply to every subsequent run.
    pub fn events_mut(&mut self) -> &mut EventRegistry {
        &mut self.events
    }

    /// Validates that ffmpeg and the prober are usable and the scratch
    /// directory exists.
    pub async fn validate(&self) -> Result<(), RunError> {
        let ffmpeg_result = Command::new(&self.config.ffmpeg.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(RunError::FfmpegNotFound {
                    path: self.config.ffmpeg.ffmpeg_path.clone(),
                });
            }
            return Err(RunError::Io(e));
        }

        self.prober.validate().await?;

        let scratch_dir = &self.config.ffmpeg.scratch_dir;
        tokio::fs::create_dir_all(scratch_dir)
            .await
            .map_err(|e| RunError::resource(scratch_dir, e))?;

        Ok(())
    }

    /// Resolves the source timing and builds the command line.
    pub async fn prepare(&self, job: TranscodeJob) -> Result<RunContext, RunError> {
        debug!("Preparing run for {:?}", job.source);
        let report = self.prober.probe(&job.source).await?;
        let timing = MediaTiming::from_report(&report)?;
        debug!(
            frame_rate = timing.frame_rate,
            duration_secs = timing.duration_secs,
            "Resolved source timing"
        );

        let command = build_command(&job.source, &job.output, &job.args);
        debug!("Command built: {:?}", command);

        Ok(RunContext {
            source: job.source,
            output: job.output,
            args: job.args,
            command,
            timing,
            started_at: Utc::now(),
            started: Instant::now(),
            events: self.events.clone(),
        })
    }

    /// Runs `job` to completion.
    pub async fn run(&self, job: TranscodeJob) -> Result<RunReport, RunError> {
        self.run_with_cancel(job, &CancelToken::new()).await
    }

    /// Runs `job` until it completes, fails, or `cancel` fires.
    ///
    /// The scratch file is removed on every path out of this function.
    pub async fn run_with_cancel(
        &self,
        job: TranscodeJob,
        cancel: &CancelToken,
    ) -> Result<RunReport, RunError> {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let mut ctx = self.prepare(job).await?;
        let scratch = ScratchFile::create_in(&self.config.ffmpeg.scratch_dir)?;

        let result = self.execute(&mut ctx, &scratch, cancel).await;

        match (result, scratch.release()) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                warn!("Failed to release scratch file: {}", release_err);
                Err(e)
            }
        }
    }

    /// Launches ffmpeg and reads its progress until both are done.
    async fn execute(
        &self,
        ctx: &mut RunContext,
        scratch: &ScratchFile,
        cancel: &CancelToken,
    ) -> Result<RunReport, RunError> {
        let argv = with_progress_target(ctx.command.clone(), scratch.path());

        ctx.events
            .emit(RunEvent::Start {
                source: ctx.source.clone(),
                output: ctx.output.clone(),
            })
            .await;

        ctx.started_at = Utc::now();
        ctx.started = Instant::now();
        info!("Encoding started: {:?} -> {:?}", ctx.source, ctx.output);

        let mut child = Command::new(&self.config.ffmpeg.ffmpeg_path)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RunError::FfmpegNotFound {
                        path: self.config.ffmpeg.ffmpeg_path.clone(),
                    }
                } else {
                    RunError::Io(e)
                }
            })?;

        // Both pipes must be drained or ffmpeg blocks once they fill up.
        let stdout_task = child.stdout.take().map(|mut out| {
            tokio::spawn(async move { tokio::io::copy(&mut out, &mut tokio::io::sink()).await })
        });
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(collect_tail(err, STDERR_TAIL_BYTES)));

        let reader = ProgressReader::new(scratch.path(), ctx.timing, ctx.started, ctx.events.clone())
            .with_poll_interval(self.config.progress.poll_interval())
            .with_block_lines(self.config.progress.block_lines);

        let (exited_tx, exited_rx) = watch::channel(false);
        let (abort_tx, abort_rx) = watch::channel(false);

        let process = async {
            let status = self.supervise(&mut child, cancel, abort_rx).await;
            let _ = exited_tx.send(true);
            status
        };
        let reading = async {
            let outcome = reader.run(exited_rx, cancel).await;
            if outcome.is_err() {
                let _ = abort_tx.send(true);
            }
            outcome
        };

        let (status, outcome) = tokio::join!(process, reading);

        if let Some(handle) = stdout_task {
            handle.abort();
        }
        let stderr = match stderr_task {
            Some(handle) => timeout(STDERR_GRACE, handle)
                .await
                .ok()
                .and_then(Result::ok)
                .filter(|tail| !tail.is_empty()),
            None => None,
        };

        let outcome = outcome?;
        let status = status?;
        if !status.success() {
            warn!("FFmpeg exited with {}", status);
            return Err(RunError::process_failed(status.code(), stderr));
        }

        match outcome {
            ReadOutcome::Finished { elapsed, last } => Ok(RunReport {
                source: ctx.source.clone(),
                output: ctx.output.clone(),
                command: ctx.command.clone(),
                frames: last.frame,
                elapsed,
                started_at: ctx.started_at,
                last_snapshot: last,
            }),
            ReadOutcome::ProducerExited { last } => {
                warn!(
                    "FFmpeg exited without a terminal record (last frame: {:?})",
                    last.map(|s| s.frame)
                );
                Err(RunError::NoTerminalRecord)
            }
            ReadOutcome::Cancelled => Err(RunError::Cancelled),
        }
    }

    /// Waits for the process, killing it on cancel, reader failure or
    /// deadline.
    async fn supervise(
        &self,
        child: &mut Child,
        cancel: &CancelToken,
        mut abort: watch::Receiver<bool>,
    ) -> Result<ExitStatus, RunError> {
        let timeout_secs = self.config.ffmpeg.timeout_secs;
        let deadline = async {
            match timeout_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => pending::<()>().await,
            }
        };
        let aborted = async {
            let closed = abort.wait_for(|aborted| *aborted).await.is_err();
            if closed {
                pending::<()>().await;
            }
        };

        let failure = tokio::select! {
            status = child.wait() => {
                let status = status?;
                debug!("FFmpeg exited with {}", status);
                return Ok(status);
            }
            _ = cancel.cancelled() => {
                info!("Run cancelled, stopping ffmpeg");
                RunError::Cancelled
            }
            _ = aborted => {
                warn!("Progress stream failed, stopping ffmpeg");
                RunError::Cancelled
            }
            _ = deadline => {
                let timeout_secs = timeout_secs.unwrap_or_default();
                warn!("FFmpeg exceeded its {} second deadline", timeout_secs);
                RunError::Timeout { timeout_secs }
            }
        };

        if let Err(e) = child.kill().await {
            warn!("Failed to kill ffmpeg: {}", e);
        }
        Err(failure)
    }
}

/// Reads `stream` to its end, keeping only the last `limit` bytes.
async fn collect_tail<R: AsyncRead + Unpin>(mut stream: R, limit: usize) -> String {
    let mut chunk = [0u8; 4096];
    let mut tail: Vec<u8> = Vec::new();

    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > limit {
                    let excess = tail.len() - limit;
                    tail.drain(..excess);
                }
            }
        }
    }

    String::from_utf8_lossy(&tail).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FfmpegConfig;
    use crate::probe::ProbeError;
    use crate::testing::{fixtures, MockProber};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        Config {
            ffmpeg: FfmpegConfig::with_paths(
                PathBuf::from("/nonexistent/bin/ffmpeg"),
                PathBuf::from("/nonexistent/bin/ffprobe"),
            )
            .with_scratch_dir(dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    fn scratch_entries(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_prepare_resolves_timing_and_command() {
        let dir = TempDir::new().unwrap();
        let prober = MockProber::new();
        prober
            .set_default_report(fixtures::probe_report("/in.mp4", 30.0, "00:00:10.000"))
            .await;
        let transcoder = Transcoder::with_prober(config_in(&dir), prober);

        let job = TranscodeJob::new("/in.mp4", "/out.mp4").arg("crf", "23");
        let ctx = transcoder.prepare(job).await.unwrap();

        assert_eq!(ctx.timing.frame_rate, 30.0);
        assert_eq!(ctx.timing.duration_secs, 10.0);
        assert_eq!(
            ctx.command,
            vec!["-y", "-i", "/in.mp4", "-crf", "23", "/out.mp4"]
        );
        assert_eq!(transcoder.prober().probe_count().await, 1);
    }

    #[tokio::test]
    async fn test_probe_error_aborts_before_launch() {
        let dir = TempDir::new().unwrap();
        let prober = MockProber::new();
        prober
            .set_next_error(ProbeError::probe_failed("unreadable"))
            .await;

        let starts = Arc::new(AtomicUsize::new(0));
        let mut transcoder = Transcoder::with_prober(config_in(&dir), prober);
        let counter = Arc::clone(&starts);
        transcoder.events_mut().on_start(move |_, _| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let err = transcoder
            .run(TranscodeJob::new("/in.mp4", "/out.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Probe(ProbeError::ProbeFailed { .. })));
        assert_eq!(starts.load(Ordering::SeqCst), 0);
        assert_eq!(scratch_entries(&dir), 0);
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_releases_scratch() {
        let dir = TempDir::new().unwrap();
        let prober = MockProber::new();
        prober
            .set_default_report(fixtures::probe_report("/in.mp4", 25.0, "00:00:04.000"))
            .await;
        let transcoder = Transcoder::with_prober(config_in(&dir), prober);

        let err = transcoder
            .run(TranscodeJob::new("/in.mp4", "/out.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::FfmpegNotFound { .. }));
        assert_eq!(scratch_entries(&dir), 0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run() {
        let dir = TempDir::new().unwrap();
        let transcoder = Transcoder::with_prober(config_in(&dir), MockProber::new());
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = transcoder
            .run_with_cancel(TranscodeJob::new("/in.mp4", "/out.mp4"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Cancelled));
        assert_eq!(transcoder.prober().probe_count().await, 0);
    }

    #[tokio::test]
    async fn test_validate_missing_ffmpeg() {
        let dir = TempDir::new().unwrap();
        let transcoder = Transcoder::new(config_in(&dir));
        let err = transcoder.validate().await.unwrap_err();
        assert!(matches!(err, RunError::FfmpegNotFound { .. }));
    }

    #[tokio::test]
    async fn test_collect_tail_keeps_last_bytes() {
        let input: &[u8] = b"first line\nsecond line\nthird line\n";
        let tail = collect_tail(input, 11).await;
        assert_eq!(tail, "third line");
    }
}
