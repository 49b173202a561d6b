use crate::manifest::ConfigKind;
use crate::types::{PackageId, Version};
use crate::validate::{validate_lock, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Current lock document format. Bumped on incompatible changes.
pub const LOCK_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid lock file: {0}")]
    Invalid(#[from] ValidationError),
    #[error("lock file serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Recorded fingerprint of one applied configuration surface.
///
/// `data` is a content digest for raw entries and the canonical serialization
/// for structured entries. The payload itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockConfigEntry {
    pub kind: ConfigKind,
    pub path: String,
    pub data: String,
}

/// Last-applied state of one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockEntry {
    pub id: PackageId,
    pub version: Version,
    pub config: Vec<LockConfigEntry>,
}

impl LockEntry {
    pub fn config_entry(&self, path: &str) -> Option<&LockConfigEntry> {
        self.config.iter().find(|e| e.path == path)
    }
}

/// The last-known-applied state of the machine, keyed by package id alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockFile {
    pub lock_version: u32,
    #[serde(rename = "package")]
    pub packages: Vec<LockEntry>,
}

impl Default for LockFile {
    fn default() -> Self {
        Self::empty()
    }
}

impl LockFile {
    /// Initial state for a fresh setup.
    pub fn empty() -> Self {
        Self {
            lock_version: LOCK_VERSION,
            packages: Vec::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&LockEntry> {
        self.packages.iter().find(|e| e.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.packages.iter().position(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn to_toml_string(&self) -> Result<String, LockError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

pub fn parse_lock_str(input: &str) -> Result<LockFile, LockError> {
    let doc: toml::Table = toml::from_str(input)?;
    Ok(validate_lock(&doc)?)
}
