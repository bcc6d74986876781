//! Tails the progress file ffmpeg writes and turns it into events.
//!
//! Every polling cycle reopens the file and rescans it from the start. Lines
//! are grouped into fixed-size record blocks; the most recent block that
//! parses into a snapshot wins. A missing or truncated file just means there
//! is nothing to report this cycle.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::events::{EventRegistry, RunEvent};
use crate::probe::MediaTiming;
use crate::runner::CancelToken;

use super::error::ProgressError;
use super::statistics::{parse_block, StatisticsSnapshot};
use super::update::ProgressUpdate;

/// Number of lines ffmpeg writes per progress page.
pub const DEFAULT_BLOCK_LINES: usize = 12;

/// Delay between two scans of the progress file.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lines accumulated towards one progress record.
#[derive(Debug, Default, Clone)]
pub struct RecordBlock {
    lines: Vec<String>,
}

impl RecordBlock {
    pub fn push(&mut self, line: &str) {
        self.lines.push(line.trim().to_string());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// The lines joined by single spaces, as the statistics parser expects.
    pub fn joined(&self) -> String {
        self.lines.join(" ")
    }

    /// Whether the block carries an explicit `progress=` line.
    pub fn has_progress_marker(&self) -> bool {
        self.lines.iter().any(|line| {
            line.split_once('=')
                .is_some_and(|(key, _)| key.trim() == "progress")
        })
    }
}

/// How the reading loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// The terminal record was observed and the end event emitted.
    Finished {
        elapsed: Duration,
        last: StatisticsSnapshot,
    },
    /// The producer exited and a final scan found no terminal record.
    ProducerExited { last: Option<StatisticsSnapshot> },
    /// The run was cancelled.
    Cancelled,
}

/// Reads one run's progress file until the terminal record shows up.
#[derive(Debug)]
pub struct ProgressReader {
    path: PathBuf,
    timing: MediaTiming,
    started: Instant,
    poll_interval: Duration,
    block_lines: usize,
    events: EventRegistry,
}

impl ProgressReader {
    /// Creates a reader for `path`. `started` is the process launch instant.
    pub fn new(
        path: impl Into<PathBuf>,
        timing: MediaTiming,
        started: Instant,
        events: EventRegistry,
    ) -> Self {
        Self {
            path: path.into(),
            timing,
            started,
            poll_interval: DEFAULT_POLL_INTERVAL,
            block_lines: DEFAULT_BLOCK_LINES,
            events,
        }
    }

    /// Sets the delay between scans.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the number of lines per record block.
    pub fn with_block_lines(mut self, block_lines: usize) -> Self {
        self.block_lines = block_lines.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs the polling loop.
    ///
    /// Returns once the terminal record is seen, once `producer_exited`
    /// flips to `true` and one last scan finds no terminal record, or when
    /// `cancel` fires.
    pub async fn run(
        &self,
        mut producer_exited: watch::Receiver<bool>,
        cancel: &CancelToken,
    ) -> Result<ReadOutcome, ProgressError> {
        let mut last = None;
        let mut final_scan = *producer_exited.borrow();

        loop {
            if let Some(snapshot) = self.scan().await? {
                let elapsed = self.started.elapsed();
                let update = ProgressUpdate::compute(&snapshot, &self.timing, elapsed);
                debug!(
                    frame = update.frame,
                    fraction = update.fraction,
                    "Progress intercepted"
                );
                self.events.emit(RunEvent::Progress(update)).await;

                if snapshot.is_terminal() {
                    let elapsed = self.started.elapsed();
                    info!("Encoding completed in {:?}", elapsed);
                    self.events.emit(RunEvent::End { elapsed }).await;
                    return Ok(ReadOutcome::Finished {
                        elapsed,
                        last: snapshot,
                    });
                }
                last = Some(snapshot);
            }

            if final_scan {
                return Ok(ReadOutcome::ProducerExited { last });
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Progress reader cancelled");
                    return Ok(ReadOutcome::Cancelled);
                }
                _ = producer_exited.changed() => {
                    // Either the producer exited or its handle is gone; one
                    // more scan picks up anything written before exit.
                    final_scan = true;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Scans the file once and returns the snapshot of its latest block.
    pub async fn scan(&self) -> Result<Option<StatisticsSnapshot>, ProgressError> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Progress file {:?} not present yet", self.path);
                return Ok(None);
            }
            Err(e) => return Err(ProgressError::Io(e)),
        };

        let mut lines = BufReader::new(file).lines();
        let mut block = RecordBlock::default();
        let mut current = None;

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    block.push(&line);
                    if block.len() >= self.block_lines {
                        current = parse_block(&block.joined())?;
                        block.clear();
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Stopped reading {:?} mid-scan: {}", self.path, e);
                    break;
                }
            }
        }

        if !block.is_empty() {
            current = match parse_block(&block.joined())? {
                // A short block without its `progress=` line is still being
                // written, not a terminal record.
                Some(snapshot) if snapshot.is_terminal() && !block.has_progress_marker() => None,
                parsed => parsed,
            };
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::progress_page;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn timing() -> MediaTiming {
        MediaTiming {
            frame_rate: 30.0,
            duration_secs: 10.0,
        }
    }

    fn recording_registry() -> (EventRegistry, Arc<Mutex<Vec<RunEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = EventRegistry::new();
        for kind in [crate::events::EventKind::Progress, crate::events::EventKind::End] {
            let log = Arc::clone(&seen);
            registry.on(kind, move |event| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(event);
                }
            });
        }
        (registry, seen)
    }

    fn reader(path: &Path, events: EventRegistry) -> ProgressReader {
        ProgressReader::new(path, timing(), Instant::now(), events)
            .with_poll_interval(Duration::from_millis(20))
    }

    #[test]
    fn test_record_block_marker() {
        let mut block = RecordBlock::default();
        block.push("frame=1");
        assert!(!block.has_progress_marker());
        block.push("  progress=continue ");
        assert!(block.has_progress_marker());
        assert_eq!(block.joined(), "frame=1 progress=continue");
        block.clear();
        assert!(block.is_empty());
    }

    #[tokio::test]
    async fn test_scan_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let (events, _) = recording_registry();
        let reader = reader(&dir.path().join("absent.progress"), events);
        assert_eq!(reader.scan().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_takes_latest_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.progress");
        let content = format!("{}{}", progress_page(30, true), progress_page(150, true));
        std::fs::write(&path, content).unwrap();

        let (events, _) = recording_registry();
        let snapshot = reader(&path, events).scan().await.unwrap().unwrap();
        assert_eq!(snapshot.frame, 150);
        assert!(snapshot.continuing);
    }

    #[tokio::test]
    async fn test_scan_short_trailing_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.progress");
        let content = format!(
            "{}frame=200\nfps=30.0\nbitrate=500.0kbits/s\nspeed=1.0x\nprogress=end\n",
            progress_page(150, true)
        );
        std::fs::write(&path, content).unwrap();

        let (events, _) = recording_registry();
        let snapshot = reader(&path, events).scan().await.unwrap().unwrap();
        assert_eq!(snapshot.frame, 200);
        assert!(snapshot.is_terminal());
    }

    #[tokio::test]
    async fn test_scan_ignores_half_written_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.progress");
        let content = format!(
            "{}frame=200\nfps=30.0\nbitrate=500.0kbits/s\nspeed=1.0x\n",
            progress_page(150, true)
        );
        std::fs::write(&path, content).unwrap();

        let (events, _) = recording_registry();
        assert_eq!(reader(&path, events).scan().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_propagates_malformed_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.progress");
        let page = progress_page(10, true).replace("total_size=", "total_size=GB");
        std::fs::write(&path, page).unwrap();

        let (events, _) = recording_registry();
        let err = reader(&path, events).scan().await.unwrap_err();
        assert!(matches!(err, ProgressError::MalformedSize { .. }));
    }

    #[tokio::test]
    async fn test_run_emits_progress_then_single_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.progress");
        std::fs::write(&path, progress_page(150, true)).unwrap();

        let (events, seen) = recording_registry();
        let reader = reader(&path, events);
        let (_exit_tx, exit_rx) = watch::channel(false);
        let cancel = CancelToken::new();

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            let content = format!("{}{}", progress_page(150, true), progress_page(300, false));
            tokio::fs::write(&writer_path, content).await.unwrap();
        });

        let outcome = reader.run(exit_rx, &cancel).await.unwrap();
        writer.await.unwrap();

        match outcome {
            ReadOutcome::Finished { last, .. } => assert_eq!(last.frame, 300),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let seen = seen.lock().unwrap();
        let ends = seen.iter().filter(|e| matches!(e, RunEvent::End { .. })).count();
        assert_eq!(ends, 1);
        assert!(matches!(seen.last(), Some(RunEvent::End { .. })));

        let progress: Vec<_> = seen
            .iter()
            .filter_map(|e| match e {
                RunEvent::Progress(update) => Some(update.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(progress.first().map(|u| u.fraction), Some(0.5));
        let final_update = progress.last().unwrap();
        assert_eq!(final_update.fraction, 1.0);
        assert!(final_update.is_finished);
        assert!(progress.windows(2).all(|w| w[0].frame <= w[1].frame));
    }

    #[tokio::test]
    async fn test_run_waits_for_file_to_appear() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.progress");

        let (events, _) = recording_registry();
        let reader = reader(&path, events);
        let (_exit_tx, exit_rx) = watch::channel(false);
        let cancel = CancelToken::new();

        let writer_path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tokio::fs::write(&writer_path, progress_page(300, false)).await.unwrap();
        });

        let outcome = reader.run(exit_rx, &cancel).await.unwrap();
        assert!(matches!(outcome, ReadOutcome::Finished { .. }));
    }

    #[tokio::test]
    async fn test_run_survives_deleted_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.progress");
        std::fs::write(&path, progress_page(30, true)).unwrap();

        let (events, _) = recording_registry();
        let reader = reader(&path, events);
        let (_exit_tx, exit_rx) = watch::channel(false);
        let cancel = CancelToken::new();

        let writer_path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            tokio::fs::remove_file(&writer_path).await.unwrap();
            tokio::time::sleep(Duration::from_millis(60)).await;
            tokio::fs::write(&writer_path, "").await.unwrap();
            tokio::time::sleep(Duration::from_millis(40)).await;
            tokio::fs::write(&writer_path, progress_page(300, false)).await.unwrap();
        });

        let outcome = reader.run(exit_rx, &cancel).await.unwrap();
        assert!(matches!(outcome, ReadOutcome::Finished { .. }));
    }

    #[tokio::test]
    async fn test_run_stops_when_producer_exits_without_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.progress");
        std::fs::write(&path, progress_page(90, true)).unwrap();

        let (events, seen) = recording_registry();
        let reader = reader(&path, events);
        let (exit_tx, exit_rx) = watch::channel(false);
        let cancel = CancelToken::new();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = exit_tx.send(true);
        });

        let outcome = reader.run(exit_rx, &cancel).await.unwrap();
        match outcome {
            ReadOutcome::ProducerExited { last } => assert_eq!(last.map(|s| s.frame), Some(90)),
            other => panic!("unexpected outcome: {:?}", other),
        }
        let seen = seen.lock().unwrap();
        assert!(!seen.iter().any(|e| matches!(e, RunEvent::End { .. })));
    }

    #[tokio::test]
    async fn test_run_final_scan_catches_end_written_before_exit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.progress");

        let (events, _) = recording_registry();
        let reader = ProgressReader::new(&path, timing(), Instant::now(), events)
            .with_poll_interval(Duration::from_secs(60));
        let (exit_tx, exit_rx) = watch::channel(false);
        let cancel = CancelToken::new();

        let writer_path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            tokio::fs::write(&writer_path, progress_page(300, false)).await.unwrap();
            let _ = exit_tx.send(true);
        });

        let outcome = reader.run(exit_rx, &cancel).await.unwrap();
        assert!(matches!(outcome, ReadOutcome::Finished { .. }));
    }

    #[tokio::test]
    async fn test_run_cancelled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.progress");
        std::fs::write(&path, progress_page(10, true)).unwrap();

        let (events, _) = recording_registry();
        let reader = reader(&path, events);
        let (_exit_tx, exit_rx) = watch::channel(false);
        let cancel = CancelToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = reader.run(exit_rx, &cancel).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Cancelled);
    }
}
