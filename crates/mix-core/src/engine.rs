use crate::concurrency::ProjectLock;
use crate::config::Settings;
use crate::executor::{ExecutionObserver, ExecutionReport, Executor};
use crate::merge::merge;
use crate::plan::{diff, Plan};
use crate::CoreError;
use mix_runtime::{PackageManager, RuntimeError};
use mix_schema::{parse_manifest_file, LockFile, Manifest, ManifestDocument};
use mix_store::{LockStore, ProjectLayout};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Central orchestration engine for mix.
///
/// Owns the resolved settings, the project layout, and the package manager
/// backend, and exposes the init, plan, and sync operations.
pub struct Engine {
    settings: Settings,
    layout: ProjectLayout,
    backend: Box<dyn PackageManager>,
}

/// Files written by [`Engine::init`].
#[derive(Debug, Clone)]
pub struct InitResult {
    pub manifest_path: PathBuf,
    pub lock_path: PathBuf,
}

/// Everything [`Engine::plan`] computed, without side effects.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub documents: Vec<ManifestDocument>,
    pub manifest: Manifest,
    pub lock: LockFile,
    pub plan: Plan,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// Source names of the manifests that took part, in merge order.
    pub sources: Vec<String>,
    pub plan: Plan,
    /// `None` for dry runs and empty plans.
    pub report: Option<ExecutionReport>,
}

impl SyncResult {
    pub fn no_manifests(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Engine {
    pub fn new(settings: Settings, backend: Box<dyn PackageManager>) -> Self {
        let layout = ProjectLayout::new(settings.project_dir.clone());
        Self {
            settings,
            layout,
            backend,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn backend(&self) -> &dyn PackageManager {
        self.backend.as_ref()
    }

    /// Create the project directory with an empty manifest and an empty lock.
    ///
    /// Refuses to touch a directory that already holds a manifest or a lock.
    pub fn init(&self) -> Result<InitResult, CoreError> {
        if self.layout.project_files_exist()? {
            return Err(CoreError::AlreadyInitialized(self.layout.root().to_path_buf()));
        }
        info!("initializing mix project in {}", self.layout.root().display());
        self.layout.initialize()?;

        let manifest_path = self.layout.manifest_file();
        let content = Manifest::starter()
            .to_toml_string()
            .map_err(|error| CoreError::Manifest {
                file: display_name(&manifest_path),
                error,
            })?;
        std::fs::write(&manifest_path, content)?;

        let store = LockStore::create(self.layout.lock_file())?;
        Ok(InitResult {
            manifest_path,
            lock_path: store.path().to_path_buf(),
        })
    }

    /// Discover, read, and validate every manifest of the project.
    ///
    /// The first invalid file aborts loading.
    pub fn load_manifests(&self) -> Result<Vec<ManifestDocument>, CoreError> {
        let paths = self.layout.discover_manifests()?;
        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            let file = display_name(path);
            let manifest =
                parse_manifest_file(path).map_err(|error| CoreError::Manifest {
                    file: file.clone(),
                    error,
                })?;
            debug!("loaded {} package(s) from {file}", manifest.package_count());
            documents.push(ManifestDocument::new(file, manifest));
        }
        Ok(documents)
    }

    /// Compute the plan for the current project state.
    ///
    /// Returns `None` when the project has no manifest files.
    pub fn plan(&self) -> Result<Option<SyncPlan>, CoreError> {
        let documents = self.load_manifests()?;
        if documents.is_empty() {
            return Ok(None);
        }
        let manifest = merge(&documents)?;
        let lock = mix_store::read_lock_file(&self.layout.lock_file())?;
        let plan = diff(&manifest, &lock);
        Ok(Some(SyncPlan {
            documents,
            manifest,
            lock,
            plan,
        }))
    }

    /// Reconcile the machine with the manifests.
    ///
    /// Every manifest and the lock are validated, and duplicates rejected,
    /// before the first package manager call. Holds the project guard for the
    /// whole run, so a concurrent sync of the same project waits.
    pub fn sync(
        &self,
        options: SyncOptions,
        observer: &mut dyn ExecutionObserver,
    ) -> Result<SyncResult, CoreError> {
        if !self.layout.root().is_dir() {
            return Ok(SyncResult::default());
        }
        let _guard = ProjectLock::acquire(&self.layout.guard_file())?;

        let documents = self.load_manifests()?;
        if documents.is_empty() {
            return Ok(SyncResult::default());
        }
        let sources: Vec<String> = documents.iter().map(|d| d.source.clone()).collect();
        let manifest = merge(&documents)?;
        let mut store = LockStore::open(self.layout.lock_file())?;
        let plan = diff(&manifest, store.lock());
        info!(
            "plan: {} install, {} remove, {} update, {} reconfigure",
            plan.install.len(),
            plan.remove.len(),
            plan.update.len(),
            plan.reconfigure.len()
        );

        let report = if options.dry_run || plan.is_empty() {
            None
        } else {
            self.ensure_backend(&plan)?;
            Some(Executor::new(self.backend.as_ref(), &mut store).apply(&plan, observer)?)
        };
        Ok(SyncResult {
            sources,
            plan,
            report,
        })
    }

    /// Fail before the first action if the plan needs a package manager that
    /// cannot be run.
    fn ensure_backend(&self, plan: &Plan) -> Result<(), CoreError> {
        let needs_backend =
            !(plan.install.is_empty() && plan.remove.is_empty() && plan.update.is_empty());
        if needs_backend && !self.backend.available() {
            return Err(RuntimeError::BackendUnavailable(self.backend.name().to_owned()).into());
        }
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::NoopObserver;
    use mix_runtime::MockBackend;

    fn engine(dir: &Path) -> Engine {
        Engine::new(Settings::for_dir(dir, "mock"), Box::new(MockBackend::new()))
    }

    #[test]
    fn init_writes_starter_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        let result = engine(&root).init().unwrap();

        let manifest = std::fs::read_to_string(&result.manifest_path).unwrap();
        assert!(manifest.contains("[default]"));
        assert!(manifest.contains("packages = []"));
        assert!(mix_store::read_lock_file(&result.lock_path)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn init_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let eng = engine(dir.path());
        eng.init().unwrap();
        assert!(matches!(eng.init(), Err(CoreError::AlreadyInitialized(_))));
    }

    #[test]
    fn init_refuses_ignored_manifest_too() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("_off.mix.toml"), "").unwrap();
        assert!(engine(dir.path()).init().is_err());
        assert!(!dir.path().join("mix.lock").exists());
    }

    #[test]
    fn plan_without_manifests_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(engine(dir.path()).plan().unwrap().is_none());
    }

    #[test]
    fn sync_on_missing_directory_reports_no_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("absent");
        let result = engine(&root)
            .sync(SyncOptions::default(), &mut NoopObserver)
            .unwrap();
        assert!(result.no_manifests());
        assert!(!root.exists());
    }

    #[test]
    fn invalid_manifest_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let eng = engine(dir.path());
        eng.init().unwrap();
        std::fs::write(
            dir.path().join("bad.mix.toml"),
            "[g]\npackages = [{ id = \"x\" }]\n",
        )
        .unwrap();
        let err = eng.load_manifests().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("bad.mix.toml:"));
    }

    #[test]
    fn dry_run_leaves_lock_alone() {
        let dir = tempfile::tempdir().unwrap();
        let eng = engine(dir.path());
        eng.init().unwrap();
        std::fs::write(
            eng.layout().manifest_file(),
            "[default]\npackages = [{ id = \"git\", version = \"2.40\" }]\n",
        )
        .unwrap();

        let result = eng
            .sync(SyncOptions { dry_run: true }, &mut NoopObserver)
            .unwrap();
        assert_eq!(result.plan.install.len(), 1);
        assert!(result.report.is_none());
        assert!(mix_store::read_lock_file(&eng.layout().lock_file())
            .unwrap()
            .is_empty());
    }
}
