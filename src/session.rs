// src/session.rs

//! The `%%dedalus` magic itself.
//!
//! One call to [`DedalusMagic::invoke`] is one cell run:
//! parse flags → build environment → probe → info report or
//! materialize + stream. Nothing is evaluated on our side; the cell body only
//! ever ends up inside the script file handed to the launcher.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::exec::command::{CommandBuilder, CommandLine};
use crate::exec::environment::ProcessEnvironment;
use crate::exec::probe::{ProbeOutcome, probe};
use crate::exec::script::{INFO_SCRIPT, MaterializedScript, render_wrapped};
use crate::exec::streamer::{ExecutionStreamer, StreamReport};
use crate::exec::OutputSink;
use crate::info::{RuntimeInfo, run_info_script};
use crate::magic::{CellMagic, RunConfiguration};
use crate::types::MpiImplementation;

/// Name the magic is registered under.
pub const MAGIC_NAME: &str = "dedalus";

/// Placeholder shown in dry-run commands instead of a real temp path.
const DRY_RUN_SCRIPT: &str = "<script>.py";

/// What a cell run ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellOutcome {
    /// The cell body ran to completion (whatever its exit code).
    Completed(StreamReport),
    /// `--info` printed a runtime report.
    Info(RuntimeInfo),
    /// Nothing was spawned; this is the command that would have run.
    DryRun(CommandLine),
}

/// The `%%dedalus` cell magic.
#[derive(Debug, Clone)]
pub struct DedalusMagic {
    config: Arc<ConfigFile>,
    dry_run: bool,
}

impl DedalusMagic {
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config: Arc::new(config),
            dry_run: false,
        }
    }

    /// Only print the launch command; spawn nothing, not even the probe.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Run one cell: `line` is the annotation's argument part, `body` the
    /// code below it.
    pub async fn invoke(
        &self,
        line: &str,
        body: &str,
        sink: &mut OutputSink,
    ) -> Result<CellOutcome> {
        // Bad flags stop here, before any process is spawned.
        let run = RunConfiguration::parse(line)?;
        let builder = CommandBuilder::from_config(&self.config);

        if self.dry_run {
            return self.print_dry_run(&run, &builder, sink).await;
        }

        let env = ProcessEnvironment::from_ambient(&self.config.env);
        let outcome = probe(&builder.probe_command(), &env, self.config.probe_timeout).await;
        let implementation = self.resolve_implementation(&outcome);

        info!(
            ranks = run.rank_count(),
            %implementation,
            info_mode = run.info_mode,
            time_mode = run.time_mode,
            "running dedalus cell"
        );

        if run.info_mode {
            let report = self
                .run_info(&run, &builder, &env, implementation, &outcome, sink)
                .await?;
            return Ok(CellOutcome::Info(report));
        }

        let script = MaterializedScript::write(
            &render_wrapped(body, run.time_mode),
            self.script_dir(),
        )?;
        let command = builder.launch_command(&run, implementation, script.path());

        let mut streamer = ExecutionStreamer::new();
        let report = streamer.run(&command, &env, script, sink).await?;
        Ok(CellOutcome::Completed(report))
    }

    /// Collapse the probe to one implementation.
    ///
    /// A pinned `mpi_implementation` wins. Otherwise anything but a positive
    /// detection means MPICH; a failed probe is logged so the fallback is
    /// visible.
    fn resolve_implementation(&self, outcome: &ProbeOutcome) -> MpiImplementation {
        let pinned = self.config.runtime.mpi_implementation.pinned();
        if let Some(err) = outcome.error() {
            if pinned.is_some() {
                warn!(error = %err, "MPI probe failed; version will be reported as unknown");
            } else {
                warn!(error = %err, "MPI probe failed; falling back to default launcher");
            }
        }
        pinned.unwrap_or_else(|| outcome.implementation_or_default())
    }

    async fn run_info(
        &self,
        run: &RunConfiguration,
        builder: &CommandBuilder,
        env: &ProcessEnvironment,
        implementation: MpiImplementation,
        outcome: &ProbeOutcome,
        sink: &mut OutputSink,
    ) -> Result<RuntimeInfo> {
        let script = MaterializedScript::write(INFO_SCRIPT, self.script_dir())?;
        let command = builder.launch_command(run, implementation, script.path());
        run_info_script(&command, env, script, sink).await?;

        let report = RuntimeInfo {
            env_name: self.config.runtime.env_name.clone(),
            micromamba: self.config.runtime.micromamba.clone(),
            implementation,
            mpi_version: outcome.version_or_unknown().to_string(),
            ranks: run.rank_count(),
        };
        sink.write_all(report.to_string().as_bytes()).await?;
        sink.flush().await?;
        Ok(report)
    }

    async fn print_dry_run(
        &self,
        run: &RunConfiguration,
        builder: &CommandBuilder,
        sink: &mut OutputSink,
    ) -> Result<CellOutcome> {
        let implementation = self
            .config
            .runtime
            .mpi_implementation
            .pinned()
            .unwrap_or_default();
        let command = builder.launch_command(run, implementation, Path::new(DRY_RUN_SCRIPT));

        sink.write_all(format!("{command}\n").as_bytes()).await?;
        sink.flush().await?;
        Ok(CellOutcome::DryRun(command))
    }

    fn script_dir(&self) -> Option<&Path> {
        self.config.runtime.script_dir.as_deref()
    }
}

impl CellMagic for DedalusMagic {
    fn run<'a>(
        &'a self,
        line: &'a str,
        body: &'a str,
        sink: &'a mut OutputSink,
    ) -> Pin<Box<dyn Future<Output = Result<CellOutcome>> + Send + 'a>> {
        Box::pin(self.invoke(line, body, sink))
    }
}
