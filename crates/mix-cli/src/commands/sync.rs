use super::{
    json_pretty, plan_lines, spin_fail, spin_ok, spinner, Failure, EXIT_FAILURE, EXIT_SUCCESS,
    NO_MANIFESTS, UP_TO_DATE,
};
use console::Style;
use indicatif::ProgressBar;
use mix_core::{
    Action, ActionOutcome, ActionStatus, Engine, ExecutionObserver, ExecutionReport, SyncOptions,
};

/// Prints one line per action as the executor reports it.
struct Progress {
    quiet: bool,
    current: Option<ProgressBar>,
}

impl Progress {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            current: None,
        }
    }
}

impl ExecutionObserver for Progress {
    fn action_started(&mut self, action: &Action<'_>) {
        if self.quiet {
            return;
        }
        self.current = Some(spinner(&format!(
            "{} {}@{}",
            action.kind(),
            action.id(),
            action.version()
        )));
    }

    fn action_finished(&mut self, outcome: &ActionOutcome) {
        if self.quiet {
            return;
        }
        let label = format!(
            "{} {} {}@{}",
            outcome.kind.symbol(),
            outcome.kind,
            outcome.id,
            outcome.version
        );
        let pb = self.current.take().unwrap_or_else(ProgressBar::hidden);
        match &outcome.status {
            ActionStatus::Succeeded => spin_ok(&pb, &label),
            ActionStatus::Failed(_) => spin_fail(&pb, &label),
            ActionStatus::Skipped => {
                pb.finish_and_clear();
                println!("  {label} (skipped)");
            }
        }
    }
}

pub fn run(engine: &Engine, dry_run: bool, json: bool) -> Result<u8, Failure> {
    let mut progress = Progress::new(json);
    let result = engine.sync(SyncOptions { dry_run }, &mut progress)?;

    let code = match &result.report {
        Some(report) if !report.is_success() => EXIT_FAILURE,
        _ => EXIT_SUCCESS,
    };

    if json {
        let payload = serde_json::json!({
            "manifests": result.sources,
            "dry_run": dry_run,
            "plan": result.plan,
            "report": result.report,
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(code);
    }

    if result.no_manifests() {
        println!("{NO_MANIFESTS}");
    } else if result.plan.is_empty() {
        println!("{UP_TO_DATE}");
    } else if dry_run {
        for line in plan_lines(&result.plan) {
            println!("{line}");
        }
        println!("dry run: {} action(s) not applied", result.plan.len());
    } else if let Some(report) = &result.report {
        print_failures(report);
        println!("{}", tally(report));
    }
    Ok(code)
}

fn print_failures(report: &ExecutionReport) {
    let header = Style::new().red().bold();
    for outcome in report.failures() {
        let ActionStatus::Failed(error) = &outcome.status else {
            continue;
        };
        eprintln!(
            "{} {} {}@{}: {error}",
            header.apply_to("failed:"),
            outcome.kind,
            outcome.id,
            outcome.version
        );
        if let Some(diag) = &outcome.diagnostics {
            for line in diag.lines() {
                eprintln!("    {line}");
            }
        }
    }
}

fn tally(report: &ExecutionReport) -> String {
    let mut out = format!("{} succeeded, {} failed", report.succeeded(), report.failed());
    if report.skipped() > 0 {
        out.push_str(&format!(", {} skipped", report.skipped()));
    }
    out
}
