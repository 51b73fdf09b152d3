//! Durable JSON file holding the last committed reels dataset.
//!
//! Writes go to a uniquely named temp file in the target directory, are
//! fsynced, then renamed over the target. A reader therefore only ever sees
//! no file, the previous file, or the new file.

use crate::models::ReelsDataset;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Dataset path relative to the data root.
pub const REELS_RELATIVE_PATH: &str = "reelsvideo/reels.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Dataset as loaded from disk, with the file's modification time.
#[derive(Debug, Clone)]
pub struct StoredDataset {
    pub dataset: ReelsDataset,
    pub modified_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct ReelStore {
    path: PathBuf,
}

impl ReelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the conventional location under `data_dir`.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(REELS_RELATIVE_PATH))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the stored dataset.
    ///
    /// On failure the temp file is removed and the previous file (if any) is
    /// left as it was.
    pub async fn write_atomic(&self, dataset: &ReelsDataset) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(dataset)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &bytes)).await??;
        info!(
            "Persisted {} reels to {}",
            dataset.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read the stored dataset, `None` if nothing has been written yet.
    pub async fn read_if_exists(&self) -> Result<Option<ReelsDataset>, StoreError> {
        Ok(self.load().await?.map(|stored| stored.dataset))
    }

    /// Like [`read_if_exists`](Self::read_if_exists), plus the file mtime.
    pub async fn load(&self) -> Result<Option<StoredDataset>, StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || load_blocking(&path)).await?
    }
}

fn write_atomic_blocking(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    // Random suffix keeps concurrent writers apart; dropping the handle on any
    // early return deletes the temp file.
    let mut tmp = tempfile::Builder::new()
        .prefix(".reels-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    write_and_sync(&mut tmp, bytes)?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    // Make the rename itself durable; the data is already in place either way
    if let Err(e) = sync_dir(dir) {
        warn!("Could not fsync directory {}: {}", dir.display(), e);
    }

    debug!("Renamed temp file over {}", path.display());
    Ok(())
}

fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

fn write_and_sync(tmp: &mut NamedTempFile, bytes: &[u8]) -> io::Result<()> {
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()
}

fn load_blocking(path: &Path) -> Result<Option<StoredDataset>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let modified_at = fs::metadata(path)?.modified()?.into();

    let text = String::from_utf8(bytes)?;
    let dataset = serde_json::from_str(&text)?;

    Ok(Some(StoredDataset {
        dataset,
        modified_at,
    }))
}
