use crate::StoreError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name suffix identifying manifest documents.
pub const MANIFEST_SUFFIX: &str = "mix.toml";
/// Manifests whose name starts with this prefix are ignored.
pub const IGNORED_PREFIX: char = '_';

const MANIFEST_FILE: &str = "mix.toml";
const LOCK_FILE: &str = "mix.lock";
const GUARD_FILE: &str = ".mix.guard";

/// Directory layout of a mix project.
///
/// All manifests live directly in the project root next to the single lock file.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The manifest created by `mix init`.
    #[inline]
    pub fn manifest_file(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// Lock target for the single-writer sync guard.
    #[inline]
    pub fn guard_file(&self) -> PathBuf {
        self.root.join(GUARD_FILE)
    }

    /// Manifest files in the project root, sorted by file name.
    ///
    /// A missing root yields an empty list.
    pub fn discover_manifests(&self) -> Result<Vec<PathBuf>, StoreError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if is_manifest_name(name) {
                found.push(entry.path());
            }
        }
        found.sort();
        debug!(
            "discovered {} manifest(s) in {}",
            found.len(),
            self.root.display()
        );
        Ok(found)
    }

    /// True if a manifest or the lock file already exists in the root.
    pub fn project_files_exist(&self) -> Result<bool, StoreError> {
        if self.lock_file().exists() {
            return Ok(true);
        }
        if !self.root.is_dir() {
            return Ok(false);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|n| n.ends_with(MANIFEST_SUFFIX))
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

fn is_manifest_name(name: &str) -> bool {
    name.ends_with(MANIFEST_SUFFIX) && !name.starts_with(IGNORED_PREFIX)
}
