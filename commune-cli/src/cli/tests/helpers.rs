//! Helpers shared across CLI tests.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use commune_core::CancellationToken;
use tempfile::TempDir;

use super::super::{Cli, CliError, ExecutionSummary, run_cli};

/// Two triangles with no relationship between them.
pub(super) const TWO_TRIANGLES: &str = "0 1\n1 2\n0 2\n3 4\n4 5\n3 5\n";

pub(super) fn temp_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

pub(super) fn create_edge_list(dir: &TempDir, name: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.path().join(name);
    let mut file = File::create(&path)?;
    file.write_all(contents.as_bytes())?;
    Ok(path)
}

pub(super) fn run(cli: Cli) -> Result<ExecutionSummary, CliError> {
    run_cli(cli, &CancellationToken::new())
}

pub(super) fn run_expecting_error(cli: Cli, panic_msg: &str) -> CliError {
    match run(cli) {
        Ok(_) => panic!("{panic_msg}"),
        Err(err) => err,
    }
}

pub(super) fn parse_args(args: &[&str]) -> Cli {
    use clap::Parser;

    match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => panic!("arguments {args:?} must parse: {err}"),
    }
}
