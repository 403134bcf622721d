// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `cachify`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cachify",
    version,
    about = "Compile bundle modules through an external compiler, with a content-hash cache.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Cachify.toml")]
    pub config: String,

    /// Output directory for transformed modules.
    #[arg(long, value_name = "DIR", default_value = "dist")]
    pub out: PathBuf,

    /// Keep running and rebuild modules when they change.
    #[arg(long)]
    pub watch: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CACHIFY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, list modules, but don't compile anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Modules to build. Default: every file under the basedir.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
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

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
