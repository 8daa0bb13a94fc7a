//! Client side of the Cadence command bridge.
//!
//! [`BridgeClient`] is the library surface used by tool-calling runtimes. The
//! `cadence` binary wraps it: it loads configuration, relays one command and
//! prints the pretty-printed JSON result, or the error on stderr.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use cadence_config::Config;
use cadence_protocol::Params;

mod cli;
pub mod client;
mod config;
mod errors;
mod transport;

use cli::Cli;
pub use client::{BridgeClient, ClientSettings};
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
pub use errors::ClientError;

/// CLI flags recognised by the configuration loader.
///
/// Keep in sync with the fields of `cadence_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--host",
    "--port",
    "--log-filter",
    "--log-format",
    "--routes-path",
    "--poll-interval-ms",
    "--shutdown-grace-ms",
    "--main-thread-timeout-ms",
    "--partial-frame-timeout-ms",
    "--max-message-bytes",
    "--connect-attempts",
    "--retry-delay-ms",
    "--receive-timeout-ms",
    "--mutating-timeout-ms",
    "--probe-command",
];

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let result = Cli::try_parse_from(prepare_cli_arguments(&args, &split))
        .map_err(AppError::CliUsage)
        .and_then(|cli| {
            loader
                .load(&split.config_arguments)
                .map(|config| (cli, config))
        })
        .and_then(|(cli, config)| relay(&cli, &config, stdout));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let program = args
        .first()
        .cloned()
        .unwrap_or_else(|| OsString::from("cadence"));
    std::iter::once(program)
        .chain(args.iter().skip(split.command_start).cloned())
        .collect()
}

fn relay<W: Write>(cli: &Cli, config: &Config, stdout: &mut W) -> Result<(), AppError> {
    init_logging(config);
    let params = parse_params(cli.params.as_deref())?;
    let settings = ClientSettings::from_config(config);
    let timeout = cli
        .timeout_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| settings.timeout_for(cli.mutating));

    let mut client = BridgeClient::new(config.endpoint(), settings);
    let result = client.call(&cli.command, params, timeout)?;
    client.disconnect();

    let rendered = serde_json::to_string_pretty(&result).map_err(AppError::Render)?;
    writeln!(stdout, "{rendered}").map_err(AppError::WriteOutput)
}

fn parse_params(raw: Option<&str>) -> Result<Params, AppError> {
    let Some(raw) = raw else {
        return Ok(Params::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(params)) => Ok(params),
        Ok(other) => Err(AppError::InvalidParams(format!("found {other}"))),
        Err(error) => Err(AppError::InvalidParams(error.to_string())),
    }
}

/// Installs a compact stderr subscriber; later calls keep the first one.
fn init_logging(config: &Config) {
    let Ok(filter) = EnvFilter::try_new(config.log_filter()) else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests;
