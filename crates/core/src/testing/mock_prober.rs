//! Mock prober for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::probe::{MediaProber, ProbeError, ProbeReport};

use super::fixtures;

/// Mock implementation of the MediaProber trait.
///
/// Provides controllable behavior for testing:
/// - Record probed paths for assertions
/// - Return pre-configured reports per path
/// - Simulate failures
#[derive(Debug, Clone)]
pub struct MockProber {
    /// Paths probed so far, in call order.
    probed: Arc<RwLock<Vec<PathBuf>>>,
    /// Pre-configured reports by path.
    reports: Arc<RwLock<HashMap<PathBuf, ProbeReport>>>,
    /// Report for paths without a configured one.
    default_report: Arc<RwLock<Option<ProbeReport>>>,
    /// If set, the next probe will fail with this error.
    next_error: Arc<RwLock<Option<ProbeError>>>,
    /// If set, `validate` fails with this error.
    validate_error: Arc<RwLock<Option<ProbeError>>>,
}

impl Default for MockProber {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProber {
    /// Create a new mock prober.
    pub fn new() -> Self {
        Self {
            probed: Arc::new(RwLock::new(Vec::new())),
            reports: Arc::new(RwLock::new(HashMap::new())),
            default_report: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
            validate_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all probed paths.
    pub async fn probed_paths(&self) -> Vec<PathBuf> {
        self.probed.read().await.clone()
    }

    /// Get the number of probes performed.
    pub async fn probe_count(&self) -> usize {
        self.probed.read().await.len()
    }

    /// Set the report returned for a specific path.
    pub async fn set_report(&self, path: impl AsRef<Path>, report: ProbeReport) {
        self.reports
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), report);
    }

    /// Set the report returned for paths without a specific one.
    pub async fn set_default_report(&self, report: ProbeReport) {
        *self.default_report.write().await = Some(report);
    }

    /// Configure the next probe to fail with the given error.
    pub async fn set_next_error(&self, error: ProbeError) {
        *self.next_error.write().await = Some(error);
    }

    /// Configure `validate` to fail with the given error.
    pub async fn set_validate_error(&self, error: ProbeError) {
        *self.validate_error.write().await = Some(error);
    }
}

#[async_trait]
impl MediaProber for MockProber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError> {
        self.probed.write().await.push(path.to_path_buf());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        if let Some(report) = self.reports.read().await.get(path) {
            return Ok(report.clone());
        }

        if let Some(report) = self.default_report.read().await.as_ref() {
            let mut report = report.clone();
            report.path = path.to_path_buf();
            return Ok(report);
        }

        // 10 seconds at 30 fps.
        Ok(fixtures::probe_report(
            &path.to_string_lossy(),
            30.0,
            "0:00:10.000000",
        ))
    }

    async fn validate(&self) -> Result<(), ProbeError> {
        match self.validate_error.read().await.as_ref() {
            Some(ProbeError::FfprobeNotFound { path }) => {
                Err(ProbeError::FfprobeNotFound { path: path.clone() })
            }
            Some(other) => Err(ProbeError::probe_failed(other.to_string())),
            None => Ok(()),
        }
    }
}
