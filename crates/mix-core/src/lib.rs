//! Reconciliation engine for mix.
//!
//! This crate ties together manifest loading, the lock store, and package
//! manager backends into the `Engine`. It merges manifest documents into one
//! desired state, diffs that state against the lock into a `Plan`, and applies
//! the plan one action at a time, committing the lock after every success.

pub mod concurrency;
pub mod config;
pub mod detect;
pub mod engine;
pub mod executor;
pub mod merge;
pub mod plan;

pub use concurrency::{install_signal_handler, shutdown_requested, ProjectLock};
pub use config::{expand_tilde, RuntimeMode, Settings};
pub use detect::{config_changed, package_reconfigured};
pub use engine::{Engine, InitResult, SyncOptions, SyncPlan, SyncResult};
pub use executor::{
    ActionOutcome, ActionStatus, ExecutionObserver, ExecutionReport, Executor, NoopObserver,
};
pub use merge::{merge, MergeError};
pub use plan::{diff, Action, ActionKind, Plan, Update};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{file}: {error}")]
    Manifest {
        file: String,
        #[source]
        error: mix_schema::ManifestError,
    },
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error("store error: {0}")]
    Store(#[from] mix_store::StoreError),
    #[error("runtime error: {0}")]
    Runtime(#[from] mix_runtime::RuntimeError),
    #[error("mix project already initialized in {}", .0.display())]
    AlreadyInitialized(PathBuf),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// True for errors caused by the contents of manifest or lock files.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Manifest { .. }
                | Self::Merge(_)
                | Self::Store(mix_store::StoreError::InvalidLock { .. })
        )
    }
}
