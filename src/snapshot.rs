//! ==============================================================================
//! snapshot.rs - file-backed persistence for the reading store
//! ==============================================================================
//!
//! purpose:
//!     the store is persisted as one json array of readings, fully rewritten
//!     after every append and once more at shutdown. the in-memory store stays
//!     authoritative: a failed save is logged and the hub keeps running.
//!
//! atomicity:
//!     saves write and fsync `<file>.tmp` first, then rename it over the
//!     snapshot, so a crash mid-write leaves the previous snapshot intact.
//!     callers serialize saves (the hub holds the store lock through each
//!     one), so the tmp file has a single writer.
//!
//! ==============================================================================

use crate::domain::Reading;
use crate::error::HubError;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// read the last saved sequence
    ///
    /// a missing file is an empty store, not an error.
    pub fn load(&self) -> Result<Vec<Reading>, HubError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| self.io_error(e.into()))
    }

    /// load, degrading to an empty sequence on any failure
    pub fn load_or_empty(&self) -> Vec<Reading> {
        match self.load() {
            Ok(readings) => {
                tracing::info!(
                    "[SNAPSHOT] Loaded {} readings from {}",
                    readings.len(),
                    self.path.display()
                );
                readings
            }
            Err(e) => {
                tracing::error!("[SNAPSHOT] {} - starting with an empty store", e);
                Vec::new()
            }
        }
    }

    /// overwrite the snapshot with `readings`
    pub fn save(&self, readings: &[Reading]) -> Result<(), HubError> {
        let bytes = serde_json::to_vec_pretty(readings).map_err(|e| self.io_error(e.into()))?;
        self.write_atomic(&bytes)
    }

    /// tmp file is synced before the rename so the snapshot is never torn
    fn write_atomic(&self, bytes: &[u8]) -> Result<(), HubError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let tmp = self.tmp_path();
        write_file_sync(&tmp, bytes).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            self.io_error(e)
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            self.io_error(e)
        })
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> HubError {
        HubError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

fn write_file_sync(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut f = std::fs::File::create(path)?;
    f.write_all(data)?;
    f.sync_all()
}
