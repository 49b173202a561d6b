use crate::backend::{CommandReport, Operation, PackageManager};
use crate::RuntimeError;
use mix_schema::{PackageId, Version};
use std::collections::HashSet;
use std::sync::Mutex;

/// Comma-separated package ids whose operations the mock backend fails.
pub const FAIL_ENV: &str = "MIX_MOCK_FAIL";

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub op: Operation,
    pub id: PackageId,
    pub version: Version,
}

/// In-memory package manager: records calls, never touches the system.
#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<MockCall>>,
    failing: HashSet<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every operation on the given package ids.
    #[must_use]
    pub fn with_failures<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Build a mock whose failing ids come from `MIX_MOCK_FAIL`.
    pub fn from_env() -> Self {
        let ids = std::env::var(FAIL_ENV).unwrap_or_default();
        Self::new().with_failures(
            ids.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect::<Vec<_>>(),
        )
    }

    /// Every invocation so far, in call order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn invoke(
        &self,
        op: Operation,
        id: &PackageId,
        version: &Version,
    ) -> Result<CommandReport, RuntimeError> {
        let mut calls = self
            .calls
            .lock()
            .map_err(|e| RuntimeError::Mock(format!("mutex poisoned: {e}")))?;
        calls.push(MockCall {
            op,
            id: id.clone(),
            version: version.clone(),
        });

        if self.failing.contains(id.as_str()) {
            return Err(RuntimeError::CommandFailed {
                command: format!("mock {op} {id}@{version}"),
                code: Some(1),
                diagnostics: format!("simulated {op} failure for {id}"),
            });
        }
        Ok(CommandReport::default())
    }
}

impl PackageManager for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn install(&self, id: &PackageId, version: &Version) -> Result<CommandReport, RuntimeError> {
        self.invoke(Operation::Install, id, version)
    }

    fn uninstall(&self, id: &PackageId, version: &Version) -> Result<CommandReport, RuntimeError> {
        self.invoke(Operation::Uninstall, id, version)
    }

    fn upgrade(&self, id: &PackageId, version: &Version) -> Result<CommandReport, RuntimeError> {
        self.invoke(Operation::Upgrade, id, version)
    }
}
