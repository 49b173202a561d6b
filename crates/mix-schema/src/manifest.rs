use crate::types::{GroupName, PackageId, Version};
use crate::validate::{validate_manifest, ValidationError};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("invalid manifest: {0}")]
    Invalid(#[from] ValidationError),
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// How a configuration payload is tracked in the lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    /// Opaque text blob, recorded as a content digest.
    Raw,
    /// Structured value, recorded as its canonical serialization.
    Structured,
}

impl ConfigKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKind::Raw => "raw",
            ConfigKind::Structured => "structured",
        }
    }

    /// Parse the document spelling. `json` is accepted for `structured`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "raw" => Some(ConfigKind::Raw),
            "structured" | "json" => Some(ConfigKind::Structured),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum ConfigData {
    Raw(String),
    Structured(serde_json::Value),
}

impl ConfigData {
    pub fn kind(&self) -> ConfigKind {
        match self {
            ConfigData::Raw(_) => ConfigKind::Raw,
            ConfigData::Structured(_) => ConfigKind::Structured,
        }
    }
}

/// One configuration surface of a package (a file path or setting key).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigEntry {
    pub path: String,
    #[serde(flatten)]
    pub data: ConfigData,
}

impl ConfigEntry {
    pub fn raw(path: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: ConfigData::Raw(data.into()),
        }
    }

    pub fn structured(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            path: path.into(),
            data: ConfigData::Structured(value),
        }
    }

    pub fn kind(&self) -> ConfigKind {
        self.data.kind()
    }
}

/// A desired package: identity, exact version pin, and configuration payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    pub id: PackageId,
    pub version: Version,
    pub config: Vec<ConfigEntry>,
}

impl Package {
    pub fn new(id: impl Into<PackageId>, version: impl Into<Version>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            config: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, entry: ConfigEntry) -> Self {
        self.config.push(entry);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestGroup {
    pub name: GroupName,
    pub packages: Vec<Package>,
}

impl ManifestGroup {
    pub fn new(name: impl Into<GroupName>) -> Self {
        Self {
            name: name.into(),
            packages: Vec::new(),
        }
    }
}

/// Desired state: groups of packages, in document order.
///
/// Group names are unique; grouping has no meaning past merge, where every
/// package is addressed by id alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Manifest {
    pub groups: Vec<ManifestGroup>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// The manifest written by `mix init`: a single empty `default` group.
    pub fn starter() -> Self {
        Self {
            groups: vec![ManifestGroup::new("default")],
        }
    }

    pub fn group(&self, name: &str) -> Option<&ManifestGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Return the named group, appending an empty one if it does not exist yet.
    pub fn group_entry(&mut self, name: &GroupName) -> &mut ManifestGroup {
        let idx = match self.groups.iter().position(|g| g.name == *name) {
            Some(idx) => idx,
            None => {
                self.groups.push(ManifestGroup::new(name.clone()));
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx]
    }

    /// All packages across all groups, group order then list order.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.groups.iter().flat_map(|g| g.packages.iter())
    }

    pub fn package_count(&self) -> usize {
        self.groups.iter().map(|g| g.packages.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.package_count() == 0
    }

    /// Render the manifest back to its TOML document form.
    pub fn to_toml_string(&self) -> Result<String, ManifestError> {
        let mut doc = toml::Table::new();
        for group in &self.groups {
            let mut packages = Vec::with_capacity(group.packages.len());
            for pkg in &group.packages {
                packages.push(toml::Value::Table(package_table(pkg)?));
            }
            let mut table = toml::Table::new();
            table.insert("packages".to_owned(), toml::Value::Array(packages));
            doc.insert(group.name.to_string(), toml::Value::Table(table));
        }
        Ok(toml::to_string_pretty(&doc)?)
    }
}

fn package_table(pkg: &Package) -> Result<toml::Table, ManifestError> {
    let mut table = toml::Table::new();
    table.insert("id".to_owned(), toml::Value::String(pkg.id.to_string()));
    table.insert(
        "version".to_owned(),
        toml::Value::String(pkg.version.to_string()),
    );
    if !pkg.config.is_empty() {
        let mut entries = Vec::with_capacity(pkg.config.len());
        for entry in &pkg.config {
            let mut t = toml::Table::new();
            t.insert(
                "kind".to_owned(),
                toml::Value::String(entry.kind().as_str().to_owned()),
            );
            t.insert("path".to_owned(), toml::Value::String(entry.path.clone()));
            let data = match &entry.data {
                ConfigData::Raw(s) => toml::Value::String(s.clone()),
                ConfigData::Structured(v) => toml::Value::try_from(v)?,
            };
            t.insert("data".to_owned(), data);
            entries.push(toml::Value::Table(t));
        }
        table.insert("config".to_owned(), toml::Value::Array(entries));
    }
    Ok(table)
}

/// A validated manifest together with the file it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    pub source: String,
    pub manifest: Manifest,
}

impl ManifestDocument {
    pub fn new(source: impl Into<String>, manifest: Manifest) -> Self {
        Self {
            source: source.into(),
            manifest,
        }
    }
}

pub fn parse_manifest_str(input: &str) -> Result<Manifest, ManifestError> {
    let doc: toml::Table = toml::from_str(input)?;
    Ok(validate_manifest(&doc)?)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}
