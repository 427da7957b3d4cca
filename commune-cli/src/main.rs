//! Entry point for the `commune` binary.
//!
//! Initialises logging, parses arguments with clap, runs the selected command
//! and writes its summary to stdout. Failures are logged with the stable code
//! of the underlying library error and turned into a non-zero exit status.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use commune_cli::{
    cli::{Cli, CliError, render_summary, run_cli},
    logging::{self, LoggingError},
};
use commune_core::CancellationToken;
use tracing::{debug, error, field};

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let cancellation = CancellationToken::new();
    let summary = run_cli(cli, &cancellation).context("command failed")?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    render_summary(&summary, &mut writer).context("failed to write summary")?;
    writer.flush().context("failed to flush stdout")?;
    Ok(())
}

fn main() -> ExitCode {
    match logging::init_logging() {
        Ok(format) => debug!(?format, "logging initialised"),
        Err(err) => {
            report_logging_init_error(&err);
            return ExitCode::FAILURE;
        }
    }

    if let Err(err) = try_main() {
        let code = err.downcast_ref::<CliError>().and_then(CliError::code);
        error!(
            error = %format!("{err:#}"),
            code = code.map(field::display),
            "command execution failed"
        );
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
