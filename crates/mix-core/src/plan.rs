use crate::detect::package_reconfigured;
use mix_schema::{LockEntry, LockFile, Manifest, Package, PackageId, Version};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A package whose declared version differs from the recorded one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub package: Package,
    pub from_version: Version,
}

/// The four disjoint action sets needed to move the lock to the manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub install: Vec<Package>,
    pub remove: Vec<LockEntry>,
    pub update: Vec<Update>,
    pub reconfigure: Vec<Package>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.install.len() + self.remove.len() + self.update.len() + self.reconfigure.len()
    }

    /// All actions in execution order: installs, removes, updates, reconfigures.
    pub fn actions(&self) -> Vec<Action<'_>> {
        let mut actions = Vec::with_capacity(self.len());
        actions.extend(self.install.iter().map(Action::Install));
        actions.extend(self.remove.iter().map(Action::Remove));
        actions.extend(self.update.iter().map(Action::Update));
        actions.extend(self.reconfigure.iter().map(Action::Reconfigure));
        actions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Install,
    Remove,
    Update,
    Reconfigure,
}

impl ActionKind {
    /// Single-character marker used in progress output.
    pub fn symbol(self) -> char {
        match self {
            Self::Install => '+',
            Self::Remove => '-',
            Self::Update => '^',
            Self::Reconfigure => '~',
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Install => "install",
            Self::Remove => "remove",
            Self::Update => "update",
            Self::Reconfigure => "reconfigure",
        })
    }
}

/// One step of a plan, borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action<'a> {
    Install(&'a Package),
    Remove(&'a LockEntry),
    Update(&'a Update),
    Reconfigure(&'a Package),
}

impl Action<'_> {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Install(_) => ActionKind::Install,
            Self::Remove(_) => ActionKind::Remove,
            Self::Update(_) => ActionKind::Update,
            Self::Reconfigure(_) => ActionKind::Reconfigure,
        }
    }

    pub fn id(&self) -> &PackageId {
        match self {
            Self::Install(pkg) | Self::Reconfigure(pkg) => &pkg.id,
            Self::Remove(entry) => &entry.id,
            Self::Update(update) => &update.package.id,
        }
    }

    /// The version the action targets; for removals, the recorded one.
    pub fn version(&self) -> &Version {
        match self {
            Self::Install(pkg) | Self::Reconfigure(pkg) => &pkg.version,
            Self::Remove(entry) => &entry.version,
            Self::Update(update) => &update.package.version,
        }
    }
}

/// Diff the merged manifest against the lock.
///
/// Every manifest package lands in at most one of install, update, or
/// reconfigure; a version change takes precedence over config changes. Locked
/// packages the manifest no longer names are removed, in lock order.
pub fn diff(manifest: &Manifest, lock: &LockFile) -> Plan {
    let recorded: HashMap<&str, &LockEntry> = lock
        .packages
        .iter()
        .map(|entry| (entry.id.as_str(), entry))
        .collect();
    let desired: HashSet<&str> = manifest.packages().map(|p| p.id.as_str()).collect();

    let mut plan = Plan::default();
    for pkg in manifest.packages() {
        match recorded.get(pkg.id.as_str()) {
            None => plan.install.push(pkg.clone()),
            Some(entry) if entry.version != pkg.version => plan.update.push(Update {
                package: pkg.clone(),
                from_version: entry.version.clone(),
            }),
            Some(entry) if package_reconfigured(pkg, entry) => plan.reconfigure.push(pkg.clone()),
            Some(_) => {}
        }
    }
    plan.remove = lock
        .packages
        .iter()
        .filter(|entry| !desired.contains(entry.id.as_str()))
        .cloned()
        .collect();
    plan
}
