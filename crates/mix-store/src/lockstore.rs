use crate::StoreError;
use mix_schema::{parse_lock_str, LockConfigEntry, LockEntry, LockFile, PackageId};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// In-memory lock state mirrored to a single file on disk.
///
/// Every mutation is staged on a copy, written durably, and only then
/// installed as the in-memory state. If the write fails the in-memory state is
/// still the last state known to be on disk, and the error is returned as
/// [`StoreError::Persist`]. Callers hold `&mut self` for the whole
/// read-modify-persist cycle, so at most one mutation is in flight.
#[derive(Debug)]
pub struct LockStore {
    path: PathBuf,
    lock: LockFile,
}

impl LockStore {
    /// Load and validate the lock file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let lock = read_lock_file(&path)?;
        debug!("loaded {} lock entries from {}", lock.len(), path.display());
        Ok(Self { path, lock })
    }

    /// Write an empty lock file at `path` and open it.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let lock = LockFile::empty();
        write_lock_file(&path, &lock)?;
        Ok(Self { path, lock })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn lock(&self) -> &LockFile {
        &self.lock
    }

    /// Append the entry for a freshly installed package.
    pub fn record_install(&mut self, entry: LockEntry) -> Result<(), StoreError> {
        if self.lock.get(&entry.id).is_some() {
            return Err(StoreError::EntryExists(entry.id.into_inner()));
        }
        let mut staged = self.lock.clone();
        staged.packages.push(entry);
        self.commit(staged)
    }

    /// Delete the entry of a removed package, keeping the order of the others.
    pub fn record_remove(&mut self, id: &PackageId) -> Result<LockEntry, StoreError> {
        let idx = self.index_of(id)?;
        let mut staged = self.lock.clone();
        let removed = staged.packages.remove(idx);
        self.commit(staged)?;
        Ok(removed)
    }

    /// Replace the version and config record of an upgraded package in place.
    pub fn record_update(&mut self, entry: LockEntry) -> Result<(), StoreError> {
        let idx = self.index_of(&entry.id)?;
        let mut staged = self.lock.clone();
        staged.packages[idx] = entry;
        self.commit(staged)
    }

    /// Replace only the config record of a reconfigured package.
    pub fn record_config(
        &mut self,
        id: &PackageId,
        config: Vec<LockConfigEntry>,
    ) -> Result<(), StoreError> {
        let idx = self.index_of(id)?;
        let mut staged = self.lock.clone();
        staged.packages[idx].config = config;
        self.commit(staged)
    }

    fn index_of(&self, id: &PackageId) -> Result<usize, StoreError> {
        self.lock
            .position(id)
            .ok_or_else(|| StoreError::EntryNotFound(id.to_string()))
    }

    fn commit(&mut self, staged: LockFile) -> Result<(), StoreError> {
        write_lock_file(&self.path, &staged)?;
        self.lock = staged;
        Ok(())
    }
}

/// Read and validate a lock file.
pub fn read_lock_file(path: &Path) -> Result<LockFile, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::LockMissing(path.to_path_buf()));
        }
        Err(e) => return Err(StoreError::Io(e)),
    };
    parse_lock_str(&content).map_err(|source| StoreError::InvalidLock {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically replace the lock file: temp file in the same directory, fsync,
/// rename, then fsync the directory so the rename survives power loss.
pub fn write_lock_file(path: &Path, lock: &LockFile) -> Result<(), StoreError> {
    let content = lock.to_toml_string()?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let persist_err = |source: std::io::Error| StoreError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(persist_err)?;
    tmp.write_all(content.as_bytes()).map_err(persist_err)?;
    tmp.as_file().sync_all().map_err(persist_err)?;
    tmp.persist(path).map_err(|e| persist_err(e.error))?;
    crate::fsync_dir(dir).map_err(persist_err)?;

    debug!("persisted {} lock entries to {}", lock.len(), path.display());
    Ok(())
}
