// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod info;
pub mod logging;
pub mod magic;
pub mod session;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default};
use crate::errors::CellError;
use crate::exec::OutputSink;
use crate::magic::CellMagicRegistry;
use crate::session::{CellOutcome, DedalusMagic, MAGIC_NAME};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - cell magic registration (once, here)
/// - reading the cell from a file or stdin
/// - dispatch, with stdout as the output sink
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config = load_or_default(args.config.as_deref())?;
    let registry = build_registry(config, args.dry_run)?;
    let cell = read_cell(&args).await?;

    let mut stdout = tokio::io::stdout();
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    let outcome = dispatch_until(&registry, &cell, &mut stdout, interrupt).await?;
    debug!(?outcome, "cell finished");
    Ok(())
}

/// Dispatch `cell`, giving up when `interrupt` completes first.
///
/// Dropping the dispatch future kills the child (kill_on_drop) and removes
/// the script with its temp path. An interrupt is reported as
/// [`CellError::Interrupted`] so the process exits non-zero.
pub async fn dispatch_until<F>(
    registry: &CellMagicRegistry,
    cell: &str,
    sink: &mut OutputSink,
    interrupt: F,
) -> crate::errors::Result<CellOutcome>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        outcome = registry.dispatch(cell, sink) => outcome,
        () = interrupt => {
            warn!("interrupted; launched processes were stopped");
            Err(CellError::Interrupted)
        }
    }
}

/// Registry with the `%%dedalus` magic registered.
pub fn build_registry(config: ConfigFile, dry_run: bool) -> crate::errors::Result<CellMagicRegistry> {
    let mut registry = CellMagicRegistry::new();
    let magic = DedalusMagic::new(config).with_dry_run(dry_run);
    registry.register(MAGIC_NAME, Arc::new(magic))?;
    Ok(registry)
}

async fn read_cell(args: &CliArgs) -> Result<String> {
    match args.cell_path() {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading cell from {}", path.display())),
        None => {
            let mut cell = String::new();
            tokio::io::stdin()
                .read_to_string(&mut cell)
                .await
                .context("reading cell from stdin")?;
            Ok(cell)
        }
    }
}
