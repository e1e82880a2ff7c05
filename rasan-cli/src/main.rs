//! RASAN CLI entry point.

use clap::Parser;
use rasan_cli::{build_controller, execute, logging, render, Cli, CliConfig, CliResult};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    logging::init(config.log_filter.as_deref(), config.log_format)?;

    let controller = build_controller(&config)?;
    let result = execute(&controller, cli.command).await;

    let all = controller.reports();
    let reports = match &result {
        Ok(_) => render::reports(&all),
        Err(error) => render::reports_before_error(&all, &error.to_string()),
    };
    if !reports.is_empty() {
        eprint!("{}", reports);
    }
    print!("{}", result?);
    Ok(())
}
