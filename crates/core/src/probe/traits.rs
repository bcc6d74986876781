//! Trait definitions for the probe module.

use async_trait::async_trait;
use std::path::Path;

use super::error::ProbeError;
use super::types::ProbeReport;

/// Something that can describe the streams and metadata of a media file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Returns the name of this prober implementation.
    fn name(&self) -> &str;

    /// Probes `path` and returns its stream list and metadata.
    async fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError>;

    /// Validates that the prober is properly configured and ready.
    async fn validate(&self) -> Result<(), ProbeError> {
        Ok(())
    }
}
