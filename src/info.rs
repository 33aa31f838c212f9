// src/info.rs

//! `--info` mode: run a small diagnostic script and describe the runtime.

use std::fmt;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::errors::{CellError, Result};
use crate::exec::OutputSink;
use crate::exec::command::CommandLine;
use crate::exec::environment::ProcessEnvironment;
use crate::exec::script::MaterializedScript;
use crate::types::MpiImplementation;

/// Summary printed after the diagnostic script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub env_name: String,
    pub micromamba: String,
    pub implementation: MpiImplementation,
    pub mpi_version: String,
    pub ranks: u32,
}

impl fmt::Display for RuntimeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "🔎 Dedalus runtime info")?;
        writeln!(f, "-----------------------")?;
        writeln!(f, "Environment        : {}", self.env_name)?;
        writeln!(f, "micromamba         : {}", self.micromamba)?;
        writeln!(
            f,
            "MPI implementation : {}",
            self.implementation.to_string().to_uppercase()
        )?;
        writeln!(f, "MPI version        : {}", self.mpi_version)?;
        writeln!(f, "MPI ranks (-np)    : {}", self.ranks)
    }
}

/// Run the diagnostic script to completion and copy its stdout, then its
/// stderr, to `sink`.
///
/// Unlike a normal cell this output is captured, not streamed; the script is
/// short-lived. `script` is removed before returning.
pub async fn run_info_script(
    command: &CommandLine,
    env: &ProcessEnvironment,
    script: MaterializedScript,
    sink: &mut OutputSink,
) -> Result<()> {
    let result = capture(command, env, sink).await;
    script.remove();
    result
}

async fn capture(
    command: &CommandLine,
    env: &ProcessEnvironment,
    sink: &mut OutputSink,
) -> Result<()> {
    info!(cmd = %command, "running runtime info script");

    let mut cmd = command.to_command(env);
    cmd.stdin(Stdio::null()).kill_on_drop(true);

    let output = cmd.output().await.map_err(|source| CellError::Launch {
        program: command.program.clone(),
        source,
    })?;

    sink.write_all(&output.stdout).await?;
    sink.write_all(&output.stderr).await?;
    sink.flush().await?;

    info!(exit_code = ?output.status.code(), "runtime info script exited");
    Ok(())
}
