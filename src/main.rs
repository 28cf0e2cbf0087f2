use anyhow::{Context, Result};
use os_data_import::{
    cli::Cli,
    pipeline::run_import,
    ui::{ConsoleUi, SilentUi},
    ImportSummary,
};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(summary) => {
            println!("\n{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ImportSummary> {
    let quiet = cli.quiet;
    let job = cli.command.into_job().context("Invalid arguments")?;

    if let Ok(json) = serde_json::to_string(&job) {
        debug!("Import job: {}", json);
    }

    let summary = if quiet {
        run_import(&job, &mut SilentUi::new())
    } else {
        run_import(&job, &mut ConsoleUi::new())
    }
    .with_context(|| format!("{} import failed", job.kind()))?;

    Ok(summary)
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "os_data_import=debug"
    } else if quiet {
        "os_data_import=warn"
    } else {
        "os_data_import=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
