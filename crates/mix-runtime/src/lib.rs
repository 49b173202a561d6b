//! External package manager boundary for mix.
//!
//! This crate implements the execution layer: the pluggable `PackageManager`
//! trait with a `winget` backend that shells out and blocks until the command
//! exits, and an in-memory `mock` backend for tests and dry environments.

pub mod backend;
pub mod command;
pub mod mock;
pub mod winget;

pub use backend::{select_backend, CommandReport, Operation, PackageManager};
pub use mock::MockBackend;
pub use winget::WingetBackend;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' exited with {}{}", describe_code(.code), describe_diagnostics(.diagnostics))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        diagnostics: String,
    },
    #[error("mock backend: {0}")]
    Mock(String),
}

impl RuntimeError {
    /// Diagnostic text captured from the external command, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            RuntimeError::CommandFailed { diagnostics, .. } if !diagnostics.is_empty() => {
                Some(diagnostics)
            }
            _ => None,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (terminated by signal)".to_owned(),
    }
}

fn describe_diagnostics(diagnostics: &str) -> String {
    if diagnostics.is_empty() {
        String::new()
    } else {
        format!(": {diagnostics}")
    }
}
