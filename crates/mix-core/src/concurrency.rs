use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Advisory lock on a project's guard file, held for the duration of a sync.
pub struct ProjectLock {
    guard_file: File,
}

impl ProjectLock {
    pub fn acquire(guard_path: &Path) -> Result<Self, CoreError> {
        let file = open_guard(guard_path)?;
        file.lock_exclusive()
            .map_err(|e| CoreError::Io(std::io::Error::new(std::io::ErrorKind::WouldBlock, e)))?;
        Ok(Self { guard_file: file })
    }

    pub fn try_acquire(guard_path: &Path) -> Result<Option<Self>, CoreError> {
        let file = open_guard(guard_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { guard_file: file })),
            Err(_) => Ok(None),
        }
    }
}

fn open_guard(guard_path: &Path) -> Result<File, CoreError> {
    if let Some(parent) = guard_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(guard_path)?)
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        let _ = self.guard_file.unlock();
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// First Ctrl-C lets the running action finish; a second one exits.
pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            std::process::exit(1);
        }
        SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        eprintln!("\ninterrupt received, finishing current action...");
    });
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
