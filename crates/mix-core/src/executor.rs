use crate::concurrency::shutdown_requested;
use crate::plan::{Action, ActionKind, Plan};
use crate::CoreError;
use mix_runtime::{CommandReport, PackageManager, RuntimeError};
use mix_schema::{LockConfigEntry, LockEntry, PackageId, Version};
use mix_store::LockStore;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "error")]
pub enum ActionStatus {
    Succeeded,
    Failed(String),
    Skipped,
}

/// What happened to one planned action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    pub id: PackageId,
    pub version: Version,
    #[serde(flatten)]
    pub status: ActionStatus,
    /// Output of the package manager: its error text on failure, any warnings
    /// on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl ActionOutcome {
    fn new(action: &Action<'_>, status: ActionStatus, diagnostics: Option<String>) -> Self {
        Self {
            kind: action.kind(),
            id: action.id().clone(),
            version: action.version().clone(),
            status,
            diagnostics,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == ActionStatus::Succeeded
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub outcomes: Vec<ActionOutcome>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Succeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Skipped))
    }

    /// True when no action failed or was skipped.
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ActionStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&ActionStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Progress hooks called around every action.
pub trait ExecutionObserver {
    fn action_started(&mut self, _action: &Action<'_>) {}

    fn action_finished(&mut self, _outcome: &ActionOutcome) {}
}

pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}

/// Applies a plan one action at a time against a backend and a lock store.
pub struct Executor<'a> {
    backend: &'a dyn PackageManager,
    store: &'a mut LockStore,
}

impl<'a> Executor<'a> {
    pub fn new(backend: &'a dyn PackageManager, store: &'a mut LockStore) -> Self {
        Self { backend, store }
    }

    /// Run every action of `plan` in order.
    ///
    /// A failed package-manager call is reported and the run moves on; the
    /// lock keeps its previous entry for that package. A lock store error ends
    /// the run immediately. After an interrupt the remaining actions are
    /// reported as skipped.
    pub fn apply(
        &mut self,
        plan: &Plan,
        observer: &mut dyn ExecutionObserver,
    ) -> Result<ExecutionReport, CoreError> {
        let mut report = ExecutionReport::default();
        for action in plan.actions() {
            let outcome = if shutdown_requested() {
                ActionOutcome::new(&action, ActionStatus::Skipped, None)
            } else {
                observer.action_started(&action);
                self.execute(&action)?
            };
            observer.action_finished(&outcome);
            report.outcomes.push(outcome);
        }
        info!(
            "applied {} action(s): {} succeeded, {} failed, {} skipped",
            report.outcomes.len(),
            report.succeeded(),
            report.failed(),
            report.skipped()
        );
        Ok(report)
    }

    fn execute(&mut self, action: &Action<'_>) -> Result<ActionOutcome, CoreError> {
        let id = action.id();
        let version = action.version();
        info!("{} {id}@{version}", action.kind());

        let result = match action {
            Action::Install(pkg) => self.backend.install(&pkg.id, &pkg.version),
            Action::Remove(entry) => self.backend.uninstall(&entry.id, &entry.version),
            Action::Update(update) => self
                .backend
                .upgrade(&update.package.id, &update.package.version),
            Action::Reconfigure(_) => Ok(CommandReport::default()),
        };

        match result {
            Ok(report) => {
                self.record(action)?;
                info!("{} {id}@{version} succeeded", action.kind());
                if let Some(diag) = &report.diagnostics {
                    warn!("{id}@{version}: {diag}");
                }
                Ok(ActionOutcome::new(
                    action,
                    ActionStatus::Succeeded,
                    report.diagnostics,
                ))
            }
            Err(e) => {
                warn!("failed to {} {id}@{version}: {e}", action.kind());
                Ok(failed(action, &e))
            }
        }
    }

    fn record(&mut self, action: &Action<'_>) -> Result<(), CoreError> {
        match action {
            Action::Install(pkg) => self.store.record_install(LockEntry::record(pkg))?,
            Action::Remove(entry) => {
                self.store.record_remove(&entry.id)?;
            }
            Action::Update(update) => self
                .store
                .record_update(LockEntry::record(&update.package))?,
            Action::Reconfigure(pkg) => self.store.record_config(
                &pkg.id,
                pkg.config.iter().map(LockConfigEntry::record).collect(),
            )?,
        }
        Ok(())
    }
}

fn failed(action: &Action<'_>, err: &RuntimeError) -> ActionOutcome {
    ActionOutcome::new(
        action,
        ActionStatus::Failed(err.to_string()),
        err.diagnostics().map(str::to_owned),
    )
}
