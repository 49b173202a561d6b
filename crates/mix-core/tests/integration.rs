use mix_core::{ActionKind, CoreError, Engine, MergeError, NoopObserver, Settings, SyncOptions};
use mix_runtime::{CommandReport, MockBackend, Operation, PackageManager, RuntimeError};
use mix_schema::{PackageId, Version};
use mix_store::{read_lock_file, StoreError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Lets a test keep a handle on the backend it gives the engine.
struct Shared<T>(Arc<T>);

impl<T: PackageManager> PackageManager for Shared<T> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn available(&self) -> bool {
        self.0.available()
    }

    fn install(&self, id: &PackageId, version: &Version) -> Result<CommandReport, RuntimeError> {
        self.0.install(id, version)
    }

    fn uninstall(&self, id: &PackageId, version: &Version) -> Result<CommandReport, RuntimeError> {
        self.0.uninstall(id, version)
    }

    fn upgrade(&self, id: &PackageId, version: &Version) -> Result<CommandReport, RuntimeError> {
        self.0.upgrade(id, version)
    }
}

fn project() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("mix");
    (dir, root)
}

fn engine_with<T: PackageManager + 'static>(root: &Path, backend: &Arc<T>) -> Engine {
    Engine::new(
        Settings::for_dir(root, "mock"),
        Box::new(Shared(Arc::clone(backend))),
    )
}

fn write_manifest(root: &Path, name: &str, body: &str) {
    std::fs::write(root.join(name), body).unwrap();
}

fn sync(engine: &Engine) -> mix_core::SyncResult {
    engine
        .sync(SyncOptions::default(), &mut NoopObserver)
        .unwrap()
}

fn locked(root: &Path) -> Vec<(String, String)> {
    read_lock_file(&root.join("mix.lock"))
        .unwrap()
        .packages
        .into_iter()
        .map(|e| (e.id.into_inner(), e.version.into_inner()))
        .collect()
}

fn pair(id: &str, version: &str) -> (String, String) {
    (id.to_owned(), version.to_owned())
}

#[test]
fn install_update_remove_lifecycle() {
    let (_dir, root) = project();
    let backend = Arc::new(MockBackend::new());
    let engine = engine_with(&root, &backend);
    engine.init().unwrap();

    write_manifest(
        &root,
        "mix.toml",
        "[tools]\npackages = [{ id = \"git\", version = \"2.40\" }]\n",
    );
    let result = sync(&engine);
    assert_eq!(result.plan.install.len(), 1);
    assert!(result.report.unwrap().is_success());
    assert_eq!(locked(&root), vec![pair("git", "2.40")]);

    write_manifest(
        &root,
        "mix.toml",
        "[tools]\npackages = [{ id = \"git\", version = \"2.41\" }]\n",
    );
    let result = sync(&engine);
    assert_eq!(result.plan.update.len(), 1);
    assert_eq!(result.plan.update[0].from_version, "2.40");
    assert_eq!(locked(&root), vec![pair("git", "2.41")]);

    write_manifest(&root, "mix.toml", "[tools]\npackages = []\n");
    let result = sync(&engine);
    assert_eq!(result.plan.remove.len(), 1);
    assert!(locked(&root).is_empty());

    let ops: Vec<(Operation, String)> = backend
        .calls()
        .into_iter()
        .map(|c| (c.op, c.version.into_inner()))
        .collect();
    assert_eq!(
        ops,
        vec![
            (Operation::Install, "2.40".to_owned()),
            (Operation::Upgrade, "2.41".to_owned()),
            (Operation::Uninstall, "2.41".to_owned()),
        ]
    );
}

#[test]
fn second_sync_is_a_no_op() {
    let (_dir, root) = project();
    let backend = Arc::new(MockBackend::new());
    let engine = engine_with(&root, &backend);
    engine.init().unwrap();
    write_manifest(
        &root,
        "mix.toml",
        r#"
[[default.packages]]
id = "git"
version = "2.40"
config = [
  { kind = "raw", path = "~/.gitconfig", data = "[user]\nname = me\n" },
  { kind = "structured", path = "~/.config/git.json", data = { color = true, pager = "less" } },
]

[[default.packages]]
id = "jq"
version = "1.7"
"#,
    );

    assert!(sync(&engine).report.unwrap().is_success());
    let calls_after_first = backend.calls().len();
    let lock_after_first = std::fs::read_to_string(root.join("mix.lock")).unwrap();

    let second = sync(&engine);
    assert!(second.plan.is_empty());
    assert!(second.report.is_none());
    assert_eq!(backend.calls().len(), calls_after_first);
    assert_eq!(
        std::fs::read_to_string(root.join("mix.lock")).unwrap(),
        lock_after_first
    );
}

#[test]
fn config_edit_reconfigures_without_backend_call() {
    let (_dir, root) = project();
    let backend = Arc::new(MockBackend::new());
    let engine = engine_with(&root, &backend);
    engine.init().unwrap();
    let body = |color: bool| {
        format!(
            "[[default.packages]]\nid = \"git\"\nversion = \"2.40\"\n\
             config = [{{ kind = \"structured\", path = \"/etc/git.json\", data = {{ color = {color} }} }}]\n"
        )
    };
    write_manifest(&root, "mix.toml", &body(true));
    sync(&engine);
    let calls = backend.calls().len();

    write_manifest(&root, "mix.toml", &body(false));
    let result = sync(&engine);
    assert_eq!(result.plan.reconfigure.len(), 1);
    let report = result.report.unwrap();
    assert_eq!(report.outcomes[0].kind, ActionKind::Reconfigure);
    assert_eq!(backend.calls().len(), calls);

    let lock = read_lock_file(&root.join("mix.lock")).unwrap();
    assert_eq!(lock.packages[0].config[0].data, r#"{"color":false}"#);
    assert!(sync(&engine).plan.is_empty());
}

#[test]
fn one_failure_does_not_stop_the_rest() {
    let (_dir, root) = project();
    let backend = Arc::new(MockBackend::new().with_failures(["Broken.Pkg"]));
    let engine = engine_with(&root, &backend);
    engine.init().unwrap();
    write_manifest(
        &root,
        "mix.toml",
        r#"
[default]
packages = [
  { id = "A", version = "1" },
  { id = "Broken.Pkg", version = "1" },
  { id = "C", version = "1" },
]
"#,
    );

    let report = sync(&engine).report.unwrap();
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(locked(&root), vec![pair("A", "1"), pair("C", "1")]);

    // The failed package stays pending and is retried on the next run.
    let retry = sync(&engine);
    assert_eq!(retry.plan.install.len(), 1);
    assert_eq!(retry.plan.install[0].id, "Broken.Pkg");
}

#[test]
fn duplicates_across_files_abort_before_any_action() {
    let (_dir, root) = project();
    let backend = Arc::new(MockBackend::new());
    let engine = engine_with(&root, &backend);
    engine.init().unwrap();
    write_manifest(
        &root,
        "mix.toml",
        "[tools]\npackages = [{ id = \"jq\", version = \"1.7\" }, { id = \"git\", version = \"2.40\" }]\n",
    );
    write_manifest(
        &root,
        "work.mix.toml",
        "[dev]\npackages = [{ id = \"curl\", version = \"8\" }, { id = \"git\", version = \"2.41\" }]\n",
    );
    let lock_before = std::fs::read_to_string(root.join("mix.lock")).unwrap();

    let err = engine
        .sync(SyncOptions::default(), &mut NoopObserver)
        .unwrap_err();
    match &err {
        CoreError::Merge(MergeError::DuplicateIdentity {
            id,
            first_group,
            second_group,
            ..
        }) => {
            assert_eq!(id, "git");
            assert_eq!(first_group, "tools");
            assert_eq!(second_group, "dev");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_validation());
    assert!(backend.calls().is_empty());
    assert_eq!(
        std::fs::read_to_string(root.join("mix.lock")).unwrap(),
        lock_before
    );
}

#[test]
fn underscored_manifests_are_ignored() {
    let (_dir, root) = project();
    let backend = Arc::new(MockBackend::new());
    let engine = engine_with(&root, &backend);
    engine.init().unwrap();
    write_manifest(
        &root,
        "_disabled.mix.toml",
        "[x]\npackages = [{ id = \"never\", version = \"1\" }]\n",
    );
    let result = sync(&engine);
    assert_eq!(result.sources, vec!["mix.toml"]);
    assert!(result.plan.is_empty());
}

#[test]
fn invalid_lock_fails_closed() {
    let (_dir, root) = project();
    let backend = Arc::new(MockBackend::new());
    let engine = engine_with(&root, &backend);
    engine.init().unwrap();
    write_manifest(
        &root,
        "mix.toml",
        "[default]\npackages = [{ id = \"git\", version = \"2.40\" }]\n",
    );
    std::fs::write(root.join("mix.lock"), "lock_version = 99\npackage = []\n").unwrap();

    let err = engine
        .sync(SyncOptions::default(), &mut NoopObserver)
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Store(StoreError::InvalidLock { .. })
    ));
    assert!(backend.calls().is_empty());
}

#[test]
fn missing_lock_is_a_store_error() {
    let (_dir, root) = project();
    std::fs::create_dir_all(&root).unwrap();
    write_manifest(
        &root,
        "mix.toml",
        "[default]\npackages = [{ id = \"git\", version = \"2.40\" }]\n",
    );
    let backend = Arc::new(MockBackend::new());
    let err = engine_with(&root, &backend)
        .sync(SyncOptions::default(), &mut NoopObserver)
        .unwrap_err();
    assert!(matches!(err, CoreError::Store(StoreError::LockMissing(_))));
}

/// Records how many lock entries are on disk at the moment of each call.
struct LockWatcher {
    lock_path: PathBuf,
    seen: Mutex<Vec<usize>>,
    fail: &'static str,
}

impl LockWatcher {
    fn observe(&self, id: &PackageId) -> Result<CommandReport, RuntimeError> {
        let entries = read_lock_file(&self.lock_path).map_or(0, |l| l.len());
        self.seen.lock().unwrap().push(entries);
        if id == self.fail {
            return Err(RuntimeError::Mock(format!("refusing {id}")));
        }
        Ok(CommandReport::default())
    }
}

impl PackageManager for LockWatcher {
    fn name(&self) -> &'static str {
        "watcher"
    }

    fn available(&self) -> bool {
        true
    }

    fn install(&self, id: &PackageId, _: &Version) -> Result<CommandReport, RuntimeError> {
        self.observe(id)
    }

    fn uninstall(&self, id: &PackageId, _: &Version) -> Result<CommandReport, RuntimeError> {
        self.observe(id)
    }

    fn upgrade(&self, id: &PackageId, _: &Version) -> Result<CommandReport, RuntimeError> {
        self.observe(id)
    }
}

#[test]
fn lock_is_persisted_after_every_action() {
    let (_dir, root) = project();
    let watcher = Arc::new(LockWatcher {
        lock_path: root.join("mix.lock"),
        seen: Mutex::new(Vec::new()),
        fail: "c",
    });
    let engine = engine_with(&root, &watcher);
    engine.init().unwrap();
    write_manifest(
        &root,
        "mix.toml",
        r#"
[default]
packages = [
  { id = "a", version = "1" },
  { id = "b", version = "1" },
  { id = "c", version = "1" },
  { id = "d", version = "1" },
]
"#,
    );

    let report = sync(&engine).report.unwrap();
    assert_eq!(report.failed(), 1);
    assert_eq!(*watcher.seen.lock().unwrap(), vec![0, 1, 2, 2]);
    assert_eq!(read_lock_file(&root.join("mix.lock")).unwrap().len(), 3);
}

#[test]
fn groups_are_irrelevant_after_merge() {
    let (_dir, root) = project();
    let backend = Arc::new(MockBackend::new());
    let engine = engine_with(&root, &backend);
    engine.init().unwrap();
    write_manifest(
        &root,
        "mix.toml",
        "[tools]\npackages = [{ id = \"git\", version = \"2.40\" }]\n",
    );
    sync(&engine);

    // Moving a package to another group in another file changes nothing.
    write_manifest(&root, "mix.toml", "[tools]\npackages = []\n");
    write_manifest(
        &root,
        "other.mix.toml",
        "[dev]\npackages = [{ id = \"git\", version = \"2.40\" }]\n",
    );
    assert!(sync(&engine).plan.is_empty());
}
