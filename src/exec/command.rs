// src/exec/command.rs

//! Argument vectors for the probe and for launching a cell.
//!
//! Everything here is pure: the same config, run options and script path
//! always give the same vector.

use std::fmt;
use std::path::Path;

use tokio::process::Command;

use crate::config::{ConfigFile, LauncherSection};
use crate::exec::environment::ProcessEnvironment;
use crate::magic::RunConfiguration;
use crate::types::MpiImplementation;

/// A program plus its arguments, not yet spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Program followed by arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// A `tokio` command with exactly `env` as its environment.
    ///
    /// Stdio is left to the caller.
    pub fn to_command(&self, env: &ProcessEnvironment) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        env.apply(&mut cmd);
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// Builds commands that go through `micromamba run -n <env>`.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    micromamba: String,
    env_name: String,
    python: String,
    launchers: LauncherSection,
}

impl CommandBuilder {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            micromamba: cfg.runtime.micromamba.clone(),
            env_name: cfg.runtime.env_name.clone(),
            python: cfg.runtime.python.clone(),
            launchers: cfg.launcher.clone(),
        }
    }

    /// Launcher binary used for `implementation`.
    pub fn launcher(&self, implementation: MpiImplementation) -> &str {
        self.launchers.for_implementation(implementation)
    }

    fn in_env(&self, rest: impl IntoIterator<Item = String>) -> CommandLine {
        let args = ["run".to_string(), "-n".to_string(), self.env_name.clone()]
            .into_iter()
            .chain(rest);
        CommandLine::new(self.micromamba.clone(), args)
    }

    /// `<micromamba> run -n <env> mpiexec --version`.
    ///
    /// Both Open MPI and MPICH ship `mpiexec`, so the probe doesn't depend on
    /// what it is trying to find out.
    pub fn probe_command(&self) -> CommandLine {
        self.in_env(["mpiexec".to_string(), "--version".to_string()])
    }

    /// `<micromamba> run -n <env> <launcher> -n <ranks> <python> <script>`.
    pub fn launch_command(
        &self,
        run: &RunConfiguration,
        implementation: MpiImplementation,
        script: &Path,
    ) -> CommandLine {
        self.in_env([
            self.launcher(implementation).to_string(),
            "-n".to_string(),
            run.rank_count().to_string(),
            self.python.clone(),
            script.to_string_lossy().into_owned(),
        ])
    }
}
