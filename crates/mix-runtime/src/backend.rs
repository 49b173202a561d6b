use crate::RuntimeError;
use mix_schema::{PackageId, Version};
use serde::Serialize;
use std::fmt;

/// The three operations mix asks of an external package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Install,
    Uninstall,
    Upgrade,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install => write!(f, "install"),
            Operation::Uninstall => write!(f, "uninstall"),
            Operation::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// Outcome of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandReport {
    /// Diagnostic text the command emitted even though it succeeded.
    pub diagnostics: Option<String>,
}

/// An external package manager.
///
/// Every call blocks until the underlying operation has finished; callers rely
/// on that to record the result before starting the next action.
pub trait PackageManager: Send + Sync {
    fn name(&self) -> &'static str;

    fn available(&self) -> bool;

    fn install(&self, id: &PackageId, version: &Version) -> Result<CommandReport, RuntimeError>;

    fn uninstall(&self, id: &PackageId, version: &Version)
        -> Result<CommandReport, RuntimeError>;

    fn upgrade(&self, id: &PackageId, version: &Version) -> Result<CommandReport, RuntimeError>;

    fn run(
        &self,
        op: Operation,
        id: &PackageId,
        version: &Version,
    ) -> Result<CommandReport, RuntimeError> {
        match op {
            Operation::Install => self.install(id, version),
            Operation::Uninstall => self.uninstall(id, version),
            Operation::Upgrade => self.upgrade(id, version),
        }
    }
}

pub fn select_backend(name: &str) -> Result<Box<dyn PackageManager>, RuntimeError> {
    match name {
        "winget" => Ok(Box::new(crate::winget::WingetBackend::new())),
        "mock" => Ok(Box::new(crate::mock::MockBackend::from_env())),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}
