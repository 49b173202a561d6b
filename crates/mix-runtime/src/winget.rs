use crate::backend::{CommandReport, Operation, PackageManager};
use crate::command::run_command;
use crate::RuntimeError;
use mix_schema::{PackageId, Version};
use std::process::{Command, Stdio};

const PROGRAM: &str = "winget";

/// Drives the Windows Package Manager CLI, one blocking process per operation.
pub struct WingetBackend {
    program: String,
}

impl Default for WingetBackend {
    fn default() -> Self {
        Self {
            program: PROGRAM.to_owned(),
        }
    }
}

impl WingetBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable, e.g. a full path to `winget.exe`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for one operation, pinned to the exact id and version.
    pub fn args(op: Operation, id: &PackageId, version: &Version) -> Vec<String> {
        let mut args = vec![
            op.to_string(),
            "--id".to_owned(),
            id.to_string(),
            "--version".to_owned(),
            version.to_string(),
            "--exact".to_owned(),
            "--silent".to_owned(),
        ];
        if op == Operation::Install {
            args.push("--force".to_owned());
        }
        args.push("--disable-interactivity".to_owned());
        args
    }
}

impl PackageManager for WingetBackend {
    fn name(&self) -> &'static str {
        "winget"
    }

    fn available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    fn install(&self, id: &PackageId, version: &Version) -> Result<CommandReport, RuntimeError> {
        run_command(&self.program, &Self::args(Operation::Install, id, version))
    }

    fn uninstall(&self, id: &PackageId, version: &Version) -> Result<CommandReport, RuntimeError> {
        run_command(&self.program, &Self::args(Operation::Uninstall, id, version))
    }

    fn upgrade(&self, id: &PackageId, version: &Version) -> Result<CommandReport, RuntimeError> {
        run_command(&self.program, &Self::args(Operation::Upgrade, id, version))
    }
}
