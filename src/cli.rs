// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::parse_duration;

/// Command-line arguments for `scriptvisor`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scriptvisor",
    version,
    about = "Run and supervise server install scripts from a catalog.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the script catalog (TOML).
    ///
    /// Default: `SCRIPTVISOR_CATALOG`, else `Scriptvisor.toml` in the current
    /// working directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub catalog: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCRIPTVISOR_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Disable coloured output.
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Interactive menu over the catalog.
    Menu,

    /// List catalog entries.
    List,

    /// Run one catalog entry and exit with its status.
    Run {
        /// Entry name (`[script.<name>]` or `[quick.<name>]`).
        name: String,

        /// Extra environment for this run; may be repeated.
        #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,

        /// Override the entry's timeout (e.g. `90s`, `15m`).
        #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
        timeout: Option<Duration>,

        /// Print the resolved command without running it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run an ad-hoc command under supervision.
    Exec {
        #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
        timeout: Option<Duration>,

        #[arg(long, value_name = "DIR")]
        cwd: Option<PathBuf>,

        #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,

        /// Display label; defaults to the command line.
        #[arg(long)]
        label: Option<String>,

        /// Program and arguments, after `--`.
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Print detected system facts.
    Facts,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
pub fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
