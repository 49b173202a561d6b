//! Shape validation for parsed manifest and lock documents.
//!
//! Documents are first parsed into a generic TOML table, then walked here into
//! strongly typed values. Every rejection carries the location of the offending
//! value (e.g. `default.packages[1].config[0].kind`) so the user can fix it
//! without guessing. Nothing downstream of this module re-checks shape.

use crate::fingerprint::is_content_digest;
use crate::lock::{LockConfigEntry, LockEntry, LockFile, LOCK_VERSION};
use crate::manifest::{ConfigData, ConfigEntry, ConfigKind, Manifest, ManifestGroup, Package};
use crate::types::{GroupName, PackageId, Version};
use std::collections::HashSet;
use thiserror::Error;
use toml::{Table, Value};

const PACKAGE_KEYS: &[&str] = &["id", "version", "config"];
const CONFIG_KEYS: &[&str] = &["kind", "path", "data"];
const GROUP_KEYS: &[&str] = &["packages"];
const LOCK_KEYS: &[&str] = &["lock_version", "package"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct ValidationError {
    pub path: String,
    pub reason: ValidationReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationReason {
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("must not be empty")]
    Empty,
    #[error("invalid kind '{0}', expected one of: raw, structured")]
    InvalidKind(String),
    #[error("duplicate config path '{0}'")]
    DuplicateConfigPath(String),
    #[error("duplicate package id '{0}'")]
    DuplicatePackageId(String),
    #[error("unsupported lock_version {found}, expected {expected}")]
    UnsupportedLockVersion { found: i64, expected: u32 },
    #[error("'{0}' is not a hex-encoded content digest")]
    InvalidDigest(String),
    #[error("non-finite float cannot be used as structured data")]
    NonFiniteFloat,
}

impl ValidationError {
    fn new(path: impl Into<String>, reason: ValidationReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }
}

fn field_path(parent: &str, key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    match (parent.is_empty(), bare) {
        (true, true) => key.to_owned(),
        (true, false) => format!("[{key:?}]"),
        (false, true) => format!("{parent}.{key}"),
        (false, false) => format!("{parent}[{key:?}]"),
    }
}

fn index_path(parent: &str, idx: usize) -> String {
    format!("{parent}[{idx}]")
}

fn expect_table<'a>(value: &'a Value, path: &str) -> Result<&'a Table, ValidationError> {
    value.as_table().ok_or_else(|| wrong_type("table", value, path))
}

fn expect_array<'a>(value: &'a Value, path: &str) -> Result<&'a [Value], ValidationError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| wrong_type("array", value, path))
}

fn wrong_type(expected: &'static str, value: &Value, path: &str) -> ValidationError {
    ValidationError::new(
        path,
        ValidationReason::WrongType {
            expected,
            found: value.type_str(),
        },
    )
}

fn reject_unknown_keys(table: &Table, allowed: &[&str], path: &str) -> Result<(), ValidationError> {
    match table.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(ValidationError::new(
            field_path(path, key),
            ValidationReason::UnknownField(key.clone()),
        )),
        None => Ok(()),
    }
}

fn required<'a>(
    table: &'a Table,
    key: &'static str,
    path: &str,
) -> Result<&'a Value, ValidationError> {
    table
        .get(key)
        .ok_or_else(|| ValidationError::new(path, ValidationReason::MissingField(key)))
}

fn required_string<'a>(
    table: &'a Table,
    key: &'static str,
    path: &str,
) -> Result<&'a str, ValidationError> {
    let value = required(table, key, path)?;
    let field = field_path(path, key);
    let s = value
        .as_str()
        .ok_or_else(|| wrong_type("string", value, &field))?;
    if s.trim().is_empty() {
        return Err(ValidationError::new(field, ValidationReason::Empty));
    }
    Ok(s)
}

fn required_kind(table: &Table, path: &str) -> Result<ConfigKind, ValidationError> {
    let raw = required_string(table, "kind", path)?;
    ConfigKind::parse(raw).ok_or_else(|| {
        ValidationError::new(
            field_path(path, "kind"),
            ValidationReason::InvalidKind(raw.to_owned()),
        )
    })
}

/// Validate a parsed manifest document and build the typed [`Manifest`].
pub fn validate_manifest(doc: &Table) -> Result<Manifest, ValidationError> {
    let mut groups = Vec::with_capacity(doc.len());
    for (name, value) in doc {
        let path = field_path("", name);
        if name.trim().is_empty() {
            return Err(ValidationError::new(path, ValidationReason::Empty));
        }
        let table = expect_table(value, &path)?;
        reject_unknown_keys(table, GROUP_KEYS, &path)?;

        let packages_path = field_path(&path, "packages");
        let items = expect_array(required(table, "packages", &path)?, &packages_path)?;
        let mut packages = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            packages.push(validate_package(item, &index_path(&packages_path, idx))?);
        }

        groups.push(ManifestGroup {
            name: GroupName::new(name.clone()),
            packages,
        });
    }
    Ok(Manifest { groups })
}

fn validate_package(value: &Value, path: &str) -> Result<Package, ValidationError> {
    let table = expect_table(value, path)?;
    reject_unknown_keys(table, PACKAGE_KEYS, path)?;

    let id = required_string(table, "id", path)?;
    let version = required_string(table, "version", path)?;

    let mut config = Vec::new();
    if let Some(value) = table.get("config") {
        let config_path = field_path(path, "config");
        let items = expect_array(value, &config_path)?;
        let mut seen = HashSet::with_capacity(items.len());
        config.reserve(items.len());
        for (idx, item) in items.iter().enumerate() {
            let entry_path = index_path(&config_path, idx);
            let entry = validate_config_entry(item, &entry_path)?;
            if !seen.insert(entry.path.clone()) {
                return Err(ValidationError::new(
                    field_path(&entry_path, "path"),
                    ValidationReason::DuplicateConfigPath(entry.path),
                ));
            }
            config.push(entry);
        }
    }

    Ok(Package {
        id: PackageId::new(id),
        version: Version::new(version),
        config,
    })
}

fn validate_config_entry(value: &Value, path: &str) -> Result<ConfigEntry, ValidationError> {
    let table = expect_table(value, path)?;
    reject_unknown_keys(table, CONFIG_KEYS, path)?;

    let kind = required_kind(table, path)?;
    let target = required_string(table, "path", path)?;
    let data_value = required(table, "data", path)?;
    let data_path = field_path(path, "data");

    let data = match kind {
        ConfigKind::Raw => {
            let s = data_value
                .as_str()
                .ok_or_else(|| wrong_type("string", data_value, &data_path))?;
            ConfigData::Raw(s.to_owned())
        }
        ConfigKind::Structured => ConfigData::Structured(toml_to_json(data_value, &data_path)?),
    };

    Ok(ConfigEntry {
        path: target.to_owned(),
        data,
    })
}

/// Convert a TOML value into the JSON value model used for structured config.
///
/// Datetimes become their RFC 3339 string form.
pub fn toml_to_json(value: &Value, path: &str) -> Result<serde_json::Value, ValidationError> {
    Ok(match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| ValidationError::new(path, ValidationReason::NonFiniteFloat))?,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                out.push(toml_to_json(item, &index_path(path, idx))?);
            }
            serde_json::Value::Array(out)
        }
        Value::Table(table) => {
            let mut out = serde_json::Map::new();
            for (key, item) in table {
                out.insert(key.clone(), toml_to_json(item, &field_path(path, key))?);
            }
            serde_json::Value::Object(out)
        }
    })
}

/// Validate a parsed lock document and build the typed [`LockFile`].
pub fn validate_lock(doc: &Table) -> Result<LockFile, ValidationError> {
    reject_unknown_keys(doc, LOCK_KEYS, "")?;

    let version_value = required(doc, "lock_version", "(root)")?;
    let found = version_value
        .as_integer()
        .ok_or_else(|| wrong_type("integer", version_value, "lock_version"))?;
    if found != i64::from(LOCK_VERSION) {
        return Err(ValidationError::new(
            "lock_version",
            ValidationReason::UnsupportedLockVersion {
                found,
                expected: LOCK_VERSION,
            },
        ));
    }

    let mut packages = Vec::new();
    if let Some(value) = doc.get("package") {
        let items = expect_array(value, "package")?;
        let mut seen = HashSet::with_capacity(items.len());
        packages.reserve(items.len());
        for (idx, item) in items.iter().enumerate() {
            let path = index_path("package", idx);
            let entry = validate_lock_entry(item, &path)?;
            if !seen.insert(entry.id.clone()) {
                return Err(ValidationError::new(
                    field_path(&path, "id"),
                    ValidationReason::DuplicatePackageId(entry.id.into_inner()),
                ));
            }
            packages.push(entry);
        }
    }

    Ok(LockFile {
        lock_version: LOCK_VERSION,
        packages,
    })
}

fn validate_lock_entry(value: &Value, path: &str) -> Result<LockEntry, ValidationError> {
    let table = expect_table(value, path)?;
    reject_unknown_keys(table, PACKAGE_KEYS, path)?;

    let id = required_string(table, "id", path)?;
    let version = required_string(table, "version", path)?;

    let mut config = Vec::new();
    if let Some(value) = table.get("config") {
        let config_path = field_path(path, "config");
        let items = expect_array(value, &config_path)?;
        let mut seen = HashSet::with_capacity(items.len());
        config.reserve(items.len());
        for (idx, item) in items.iter().enumerate() {
            let entry_path = index_path(&config_path, idx);
            let entry = validate_lock_config_entry(item, &entry_path)?;
            if !seen.insert(entry.path.clone()) {
                return Err(ValidationError::new(
                    field_path(&entry_path, "path"),
                    ValidationReason::DuplicateConfigPath(entry.path),
                ));
            }
            config.push(entry);
        }
    }

    Ok(LockEntry {
        id: PackageId::new(id),
        version: Version::new(version),
        config,
    })
}

fn validate_lock_config_entry(
    value: &Value,
    path: &str,
) -> Result<LockConfigEntry, ValidationError> {
    let table = expect_table(value, path)?;
    reject_unknown_keys(table, CONFIG_KEYS, path)?;

    let kind = required_kind(table, path)?;
    let target = required_string(table, "path", path)?;
    let data_value = required(table, "data", path)?;
    let data_path = field_path(path, "data");
    let data = data_value
        .as_str()
        .ok_or_else(|| wrong_type("string", data_value, &data_path))?;

    if kind == ConfigKind::Raw && !is_content_digest(data) {
        return Err(ValidationError::new(
            data_path,
            ValidationReason::InvalidDigest(data.to_owned()),
        ));
    }

    Ok(LockConfigEntry {
        kind,
        path: target.to_owned(),
        data: data.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_err(input: &str) -> ValidationError {
        let doc: Table = toml::from_str(input).unwrap();
        validate_manifest(&doc).unwrap_err()
    }

    fn lock_err(input: &str) -> ValidationError {
        let doc: Table = toml::from_str(input).unwrap();
        validate_lock(&doc).unwrap_err()
    }

    #[test]
    fn missing_version_reports_package_path() {
        let err = manifest_err(
            r#"
[default]
packages = [{ id = "a", version = "1" }, { id = "b" }]
"#,
        );
        assert_eq!(err.path, "default.packages[1]");
        assert_eq!(err.reason, ValidationReason::MissingField("version"));
        assert_eq!(
            err.to_string(),
            "default.packages[1]: missing required field 'version'"
        );
    }

    #[test]
    fn missing_id_rejected() {
        let err = manifest_err(
            r#"
[default]
packages = [{ version = "1" }]
"#,
        );
        assert_eq!(err.reason, ValidationReason::MissingField("id"));
    }

    #[test]
    fn invalid_kind_reports_entry_path() {
        let err = manifest_err(
            r#"
[[tools.packages]]
id = "a"
version = "1"
[[tools.packages.config]]
kind = "yaml"
path = "x"
data = "y"
"#,
        );
        assert_eq!(err.path, "tools.packages[0].config[0].kind");
        assert_eq!(err.reason, ValidationReason::InvalidKind("yaml".to_owned()));
    }

    #[test]
    fn top_level_scalar_rejected() {
        let err = manifest_err("default = 3\n");
        assert_eq!(err.path, "default");
        assert_eq!(
            err.reason,
            ValidationReason::WrongType {
                expected: "table",
                found: "integer"
            }
        );
    }

    #[test]
    fn unknown_group_key_rejected() {
        let err = manifest_err(
            r#"
[default]
packages = []
pkgs = []
"#,
        );
        assert_eq!(err.path, "default.pkgs");
        assert_eq!(err.reason, ValidationReason::UnknownField("pkgs".to_owned()));
    }

    #[test]
    fn group_without_packages_rejected() {
        let err = manifest_err("[default]\n");
        assert_eq!(err.reason, ValidationReason::MissingField("packages"));
    }

    #[test]
    fn raw_data_must_be_string() {
        let err = manifest_err(
            r#"
[[default.packages]]
id = "a"
version = "1"
[[default.packages.config]]
kind = "raw"
path = "x"
data = { a = 1 }
"#,
        );
        assert_eq!(err.path, "default.packages[0].config[0].data");
    }

    #[test]
    fn duplicate_config_path_rejected() {
        let err = manifest_err(
            r#"
[[default.packages]]
id = "a"
version = "1"
config = [
  { kind = "raw", path = "x", data = "1" },
  { kind = "raw", path = "x", data = "2" },
]
"#,
        );
        assert_eq!(err.path, "default.packages[0].config[1].path");
        assert_eq!(
            err.reason,
            ValidationReason::DuplicateConfigPath("x".to_owned())
        );
    }

    #[test]
    fn empty_id_rejected() {
        let err = manifest_err(
            r#"
[default]
packages = [{ id = "  ", version = "1" }]
"#,
        );
        assert_eq!(err.path, "default.packages[0].id");
        assert_eq!(err.reason, ValidationReason::Empty);
    }

    #[test]
    fn non_bare_group_names_are_quoted_in_paths() {
        let err = manifest_err(
            r#"
["my group"]
packages = [{ id = 1, version = "1" }]
"#,
        );
        assert_eq!(err.path, "[\"my group\"].packages[0].id");
    }

    #[test]
    fn structured_data_converts_nested_values() {
        let doc: Table = toml::from_str(
            r#"
[[default.packages]]
id = "a"
version = "1"
[[default.packages.config]]
kind = "structured"
path = "x.json"
data = { list = [1, 2.5, "s"], on = true, at = 1979-05-27T07:32:00Z }
"#,
        )
        .unwrap();
        let manifest = validate_manifest(&doc).unwrap();
        let ConfigData::Structured(value) = &manifest.groups[0].packages[0].config[0].data else {
            panic!("expected structured data");
        };
        assert_eq!(value["list"], serde_json::json!([1, 2.5, "s"]));
        assert_eq!(value["on"], serde_json::json!(true));
        assert_eq!(value["at"], serde_json::json!("1979-05-27T07:32:00Z"));
    }

    #[test]
    fn lock_requires_version() {
        let err = lock_err("package = []\n");
        assert_eq!(err.reason, ValidationReason::MissingField("lock_version"));
    }

    #[test]
    fn lock_rejects_future_version() {
        let err = lock_err("lock_version = 7\n");
        assert_eq!(err.path, "lock_version");
        assert_eq!(
            err.reason,
            ValidationReason::UnsupportedLockVersion {
                found: 7,
                expected: LOCK_VERSION
            }
        );
    }

    #[test]
    fn lock_rejects_duplicate_ids() {
        let err = lock_err(
            r#"
lock_version = 1
[[package]]
id = "git"
version = "1"
[[package]]
id = "git"
version = "2"
"#,
        );
        assert_eq!(err.path, "package[1].id");
        assert_eq!(
            err.reason,
            ValidationReason::DuplicatePackageId("git".to_owned())
        );
    }

    #[test]
    fn lock_raw_data_must_be_digest() {
        let err = lock_err(
            r#"
lock_version = 1
[[package]]
id = "git"
version = "1"
[[package.config]]
kind = "raw"
path = "~/.gitconfig"
data = "[user]"
"#,
        );
        assert_eq!(err.path, "package[0].config[0].data");
        assert!(matches!(err.reason, ValidationReason::InvalidDigest(_)));
    }

    #[test]
    fn lock_without_packages_is_empty() {
        let doc: Table = toml::from_str("lock_version = 1\n").unwrap();
        let lock = validate_lock(&doc).unwrap();
        assert!(lock.packages.is_empty());
    }

    #[test]
    fn lock_unknown_root_key_rejected() {
        let err = lock_err("lock_version = 1\nextra = true\n");
        assert_eq!(err.path, "extra");
    }
}
