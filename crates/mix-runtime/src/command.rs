use crate::backend::CommandReport;
use crate::RuntimeError;
use std::process::{Command, Stdio};
use tracing::debug;

/// Run `program args...` to completion and classify the result.
///
/// Stdout and stderr are captured. A non-zero exit becomes
/// [`RuntimeError::CommandFailed`] with stderr (or stdout, if stderr is empty)
/// as the diagnostics; a zero exit returns any stderr output as diagnostics.
pub fn run_command(program: &str, args: &[String]) -> Result<CommandReport, RuntimeError> {
    let rendered = render(program, args);
    debug!("running: {rendered}");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| RuntimeError::Spawn {
            program: program.to_owned(),
            source,
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    if !stdout.is_empty() {
        debug!("{program} stdout: {stdout}");
    }

    if !output.status.success() {
        let diagnostics = if stderr.is_empty() { stdout } else { stderr };
        return Err(RuntimeError::CommandFailed {
            command: rendered,
            code: output.status.code(),
            diagnostics,
        });
    }

    Ok(CommandReport {
        diagnostics: (!stderr.is_empty()).then_some(stderr),
    })
}

fn render(program: &str, args: &[String]) -> String {
    let mut out = program.to_owned();
    for arg in args {
        out.push(' ');
        out.push_str(arg);
    }
    out
}
