// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dedalus-cell`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dedalus-cell",
    version,
    about = "Run a %%dedalus notebook cell under MPI inside a micromamba environment.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the cell file. Reads the cell from stdin when omitted or `-`.
    ///
    /// The first line must be the annotation, e.g. `%%dedalus -np 4 --time`.
    #[arg(value_name = "CELL")]
    pub cell: Option<PathBuf>,

    /// Path to the config file (TOML).
    ///
    /// Default: `DedalusCell.toml` in the current working directory, falling
    /// back to built-in defaults when that file does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEDALUS_CELL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse the cell and print the launch command, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The cell file, or `None` when the cell comes from stdin.
    pub fn cell_path(&self) -> Option<&Path> {
        self.cell.as_deref().filter(|p| p.as_os_str() != "-")
    }
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
