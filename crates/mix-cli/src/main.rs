mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{Failure, EXIT_FAILURE};
use mix_core::{install_signal_handler, Engine, RuntimeMode, Settings};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "mix",
    version,
    about = "Declarative package reconciliation from manifest files"
)]
struct Cli {
    /// Project directory holding the manifests and the lock file.
    #[arg(long, global = true, env = "MIX_DIR")]
    dir: Option<String>,

    /// Where the project lives when --dir is not given: "dev" (current
    /// directory) or "installed" (~/.mix).
    #[arg(long, global = true, env = "MIX_MODE", default_value = "installed")]
    mode: RuntimeMode,

    /// Package manager backend ("winget" or "mock").
    #[arg(long, global = true, env = "MIX_BACKEND", default_value = "winget")]
    backend: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create an empty manifest and lock file in the project directory.
    Init,
    /// Bring installed packages in line with the manifests.
    Sync {
        /// Compute and print the plan without applying it.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Show what a sync would do.
    Plan,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("MIX_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(failure) => {
            eprintln!("error: {}", failure.message);
            ExitCode::from(failure.code)
        }
    }
}

fn run(cli: Cli) -> Result<u8, Failure> {
    let json_output = cli.json;
    let engine = || build_engine(cli.mode, cli.dir.as_deref(), &cli.backend);

    match cli.command {
        Commands::Init => commands::init::run(&engine()?, json_output),
        Commands::Sync { dry_run } => {
            let engine = engine()?;
            install_signal_handler();
            commands::sync::run(&engine, dry_run, json_output)
        }
        Commands::Plan => commands::plan::run(&engine()?, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    }
}

fn build_engine(mode: RuntimeMode, dir: Option<&str>, backend: &str) -> Result<Engine, Failure> {
    let settings = Settings::resolve(mode, dir, backend)?;
    let backend = mix_runtime::select_backend(&settings.backend)
        .map_err(|e| Failure::new(EXIT_FAILURE, e.to_string()))?;
    Ok(Engine::new(settings, backend))
}
