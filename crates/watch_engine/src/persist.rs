use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use watch_core::{StateStore, SyncState};
use watch_logging::{watch_info, watch_warn};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("state path has no file name: {0}")]
    InvalidPath(String),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file in
/// the same directory and renaming it over the target.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // The rename replaces any existing target in one step.
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// [`SyncState`] kept as one JSON document on disk.
pub struct FileStateStore {
    path: PathBuf,
    writer: AtomicFileWriter,
    filename: String,
    capacity: usize,
}

impl FileStateStore {
    /// `capacity` bounds the delivered identities kept across saves.
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Result<Self, PersistError> {
        let path = path.into();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .ok_or_else(|| PersistError::InvalidPath(path.display().to_string()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self {
            path,
            writer: AtomicFileWriter::new(dir),
            filename,
            capacity,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn seed(&self) -> SyncState {
        SyncState::with_capacity(self.capacity)
    }
}

impl StateStore for FileStateStore {
    type Error = PersistError;

    fn load(&self) -> SyncState {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                watch_info!("No state at {:?}; starting from seed", self.path);
                return self.seed();
            }
            Err(err) => {
                watch_warn!("Failed to read state from {:?}: {}", self.path, err);
                return self.seed();
            }
        };

        let mut state: SyncState = match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(err) => {
                watch_warn!("Ignoring corrupt state at {:?}: {}", self.path, err);
                return self.seed();
            }
        };
        state.delivered_ids.set_capacity(self.capacity);
        state
    }

    fn save(&self, state: &SyncState) -> Result<(), PersistError> {
        let mut bounded = state.clone();
        bounded.delivered_ids.set_capacity(self.capacity);
        let content = serde_json::to_string_pretty(&bounded)?;
        self.writer.write(&self.filename, &content)?;
        Ok(())
    }
}
