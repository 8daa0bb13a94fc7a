//! CLI argument definitions for the Cadence bridge client.

use clap::Parser;

/// Sends one command to the Cadence daemon and prints the result.
#[derive(Parser, Debug)]
#[command(name = "cadence", version)]
pub(crate) struct Cli {
    /// Command name (for example `get_session_info`).
    #[arg(value_name = "COMMAND")]
    pub(crate) command: String,
    /// Command parameters as a JSON object.
    #[arg(value_name = "PARAMS_JSON")]
    pub(crate) params: Option<String>,
    /// Overrides the receive deadline, in milliseconds.
    #[arg(long, value_name = "MILLISECONDS")]
    pub(crate) timeout_ms: Option<u64>,
    /// Uses the longer deadline for commands that mutate host state.
    #[arg(long)]
    pub(crate) mutating: bool,
}
