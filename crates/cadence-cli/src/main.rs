//! CLI entrypoint for the Cadence command bridge.
//!
//! The binary delegates to [`cadence_cli::run`], which loads configuration,
//! relays one command to the daemon and prints the result.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    cadence_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
