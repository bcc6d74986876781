//! The scratch file ffmpeg writes its progress records into.

use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::debug;

use super::error::RunError;

const SCRATCH_PREFIX: &str = "ffwatch_";
const SCRATCH_SUFFIX: &str = ".progress";

/// A uniquely named, empty file that is removed exactly once.
///
/// [`release`](Self::release) removes it and reports failures. If the value
/// is dropped without being released (a panic or a dropped run future), the
/// file is still removed, silently.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    guard: Option<TempPath>,
}

impl ScratchFile {
    /// Creates a new scratch file inside `dir`, creating `dir` if needed.
    pub fn create_in(dir: &Path) -> Result<Self, RunError> {
        std::fs::create_dir_all(dir).map_err(|e| RunError::resource(dir, e))?;

        let guard = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(SCRATCH_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| RunError::resource(dir, e))?
            .into_temp_path();
        let path = guard.to_path_buf();
        debug!("Created scratch file {:?}", path);

        Ok(Self {
            path,
            guard: Some(guard),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file. A file that is already gone counts as released.
    pub fn release(mut self) -> Result<(), RunError> {
        let Some(guard) = self.guard.take() else {
            return Ok(());
        };

        match guard.close() {
            Ok(()) => {
                debug!("Released scratch file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RunError::resource(&self.path, e)),
        }
    }
}
