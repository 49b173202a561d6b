//! Project layout and the lock store for mix.
//!
//! This crate owns everything mix writes to disk: `ProjectLayout` locates the
//! manifests, lock file, and sync guard of a project directory, and
//! `LockStore` keeps the in-memory lock state and its on-disk mirror in step,
//! persisting atomically after every individual mutation.

pub mod layout;
pub mod lockstore;

pub use layout::{ProjectLayout, IGNORED_PREFIX, MANIFEST_SUFFIX};
pub use lockstore::{read_lock_file, write_lock_file, LockStore};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fsync a directory to ensure that a preceding `rename()` is durable.
///
/// POSIX does not guarantee a rename is durable until the parent directory is
/// synced. On platforms where directories cannot be opened this is a no-op.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    #[cfg(unix)]
    {
        let f = std::fs::File::open(dir)?;
        f.sync_all()
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("lock file not found at {0} (run 'mix init' first)")]
    LockMissing(PathBuf),
    #[error("invalid lock file {path}: {source}")]
    InvalidLock {
        path: PathBuf,
        #[source]
        source: mix_schema::LockError,
    },
    #[error("failed to persist lock file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("lock serialization error: {0}")]
    Serialize(#[from] mix_schema::LockError),
    #[error("lock entry already exists: {0}")]
    EntryExists(String),
    #[error("lock entry not found: {0}")]
    EntryNotFound(String),
}
