//! Manifest and lock file schema for mix.
//!
//! This crate defines the data model layer: manifest documents (`Manifest`,
//! `ManifestGroup`, `Package`, `ConfigEntry`), the lock file (`LockFile`,
//! `LockEntry`), the schema validator that turns parsed TOML into those typed
//! values, and the deterministic fingerprints (`content_digest`,
//! `canonical_json`) used to record applied configuration.

pub mod fingerprint;
pub mod lock;
pub mod manifest;
pub mod types;
pub mod validate;

pub use fingerprint::{canonical_json, content_digest, is_content_digest};
pub use lock::{parse_lock_str, LockConfigEntry, LockEntry, LockError, LockFile, LOCK_VERSION};
pub use manifest::{
    parse_manifest_file, parse_manifest_str, ConfigData, ConfigEntry, ConfigKind, Manifest,
    ManifestDocument, ManifestError, ManifestGroup, Package,
};
pub use types::{GroupName, PackageId, Version};
pub use validate::{validate_lock, validate_manifest, ValidationError, ValidationReason};
