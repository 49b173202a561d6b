pub mod completions;
pub mod init;
pub mod plan;
pub mod sync;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use mix_core::{ActionKind, CoreError, Plan};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;

/// A command error together with the process exit code it maps to.
#[derive(Debug)]
pub struct Failure {
    pub code: u8,
    pub message: String,
}

impl Failure {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<CoreError> for Failure {
    fn from(err: CoreError) -> Self {
        Self::new(exit_code(&err), err.to_string())
    }
}

pub fn exit_code(err: &CoreError) -> u8 {
    if err.is_validation() {
        EXIT_MANIFEST_ERROR
    } else if matches!(err, CoreError::Store(_)) {
        EXIT_STORE_ERROR
    } else {
        EXIT_FAILURE
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, Failure> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Failure::new(EXIT_FAILURE, format!("JSON serialization failed: {e}")))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Clear the spinner and leave a permanent success line on stdout.
pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    println!("{} {msg}", Style::new().green().apply_to("✓"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    println!("{} {msg}", Style::new().red().apply_to("✗"));
}

pub fn colorize_kind(kind: ActionKind) -> String {
    let label = format!("{} {kind}", kind.symbol());
    let style = match kind {
        ActionKind::Install => Style::new().green(),
        ActionKind::Remove => Style::new().red(),
        ActionKind::Update => Style::new().yellow(),
        ActionKind::Reconfigure => Style::new().cyan(),
    };
    style.apply_to(label).to_string()
}

/// One line per planned action, in execution order.
pub fn plan_lines(plan: &Plan) -> Vec<String> {
    let mut lines = Vec::with_capacity(plan.len());
    for pkg in &plan.install {
        lines.push(format!(
            "{} {}@{}",
            colorize_kind(ActionKind::Install),
            pkg.id,
            pkg.version
        ));
    }
    for entry in &plan.remove {
        lines.push(format!(
            "{} {}@{}",
            colorize_kind(ActionKind::Remove),
            entry.id,
            entry.version
        ));
    }
    for update in &plan.update {
        lines.push(format!(
            "{} {} {} -> {}",
            colorize_kind(ActionKind::Update),
            update.package.id,
            update.from_version,
            update.package.version
        ));
    }
    for pkg in &plan.reconfigure {
        lines.push(format!(
            "{} {}@{}",
            colorize_kind(ActionKind::Reconfigure),
            pkg.id,
            pkg.version
        ));
    }
    lines
}

pub const NO_MANIFESTS: &str = "No mix files found.";
pub const UP_TO_DATE: &str = "No changes detected. Everything is up to date.";
