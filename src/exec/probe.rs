// src/exec/probe.rs

//! MPI implementation detection.
//!
//! The probe runs `mpiexec --version` inside the environment and classifies
//! the banner. It never fails the invocation: every problem ends up in
//! [`ProbeOutcome::Failed`] and the caller decides what default to use.

use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::exec::command::CommandLine;
use crate::exec::environment::ProcessEnvironment;
use crate::types::MpiImplementation;

/// Version string reported when the probe produced nothing usable.
pub const UNKNOWN_VERSION: &str = "unknown";

static OPEN_MPI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)open[ -]mpi").expect("open mpi regex is valid"));

/// Why a probe could not classify anything.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("probe exited with {}", describe_exit(.code))]
    NonZeroExit { code: Option<i32> },

    #[error("waiting for probe failed: {0}")]
    Wait(#[source] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "a signal".to_string(),
    }
}

/// Result of a probe, kept three-way until the call site collapses it.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// The banner named a known implementation.
    Detected {
        implementation: MpiImplementation,
        banner: Option<String>,
    },
    /// The query ran fine but the banner matched nothing we know.
    NotDetected { banner: Option<String> },
    /// The query itself didn't work.
    Failed(ProbeError),
}

impl ProbeOutcome {
    /// Classify the combined stdout+stderr of a successful version query.
    pub fn from_output(text: &str) -> Self {
        // A blank first line counts as no banner, so the version reads "unknown".
        let banner = text
            .lines()
            .next()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        if OPEN_MPI.is_match(text) {
            ProbeOutcome::Detected {
                implementation: MpiImplementation::OpenMpi,
                banner,
            }
        } else {
            ProbeOutcome::NotDetected { banner }
        }
    }

    /// Detected implementation, or the MPICH default for everything else.
    pub fn implementation_or_default(&self) -> MpiImplementation {
        match self {
            ProbeOutcome::Detected { implementation, .. } => *implementation,
            ProbeOutcome::NotDetected { .. } | ProbeOutcome::Failed(_) => {
                MpiImplementation::default()
            }
        }
    }

    /// First line of the banner, or [`UNKNOWN_VERSION`].
    pub fn version_or_unknown(&self) -> &str {
        match self {
            ProbeOutcome::Detected { banner, .. } | ProbeOutcome::NotDetected { banner } => {
                banner.as_deref().unwrap_or(UNKNOWN_VERSION)
            }
            ProbeOutcome::Failed(_) => UNKNOWN_VERSION,
        }
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match self {
            ProbeOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Run `command` with `env`, giving up after `timeout`.
///
/// The child is killed if the timeout elapses.
pub async fn probe(
    command: &CommandLine,
    env: &ProcessEnvironment,
    timeout: Duration,
) -> ProbeOutcome {
    debug!(cmd = %command, ?timeout, "probing MPI implementation");

    let mut cmd = command.to_command(env);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            return ProbeOutcome::Failed(ProbeError::Spawn {
                program: command.program.clone(),
                source,
            });
        }
    };

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Err(_elapsed) => return ProbeOutcome::Failed(ProbeError::Timeout(timeout)),
        Ok(Err(e)) => return ProbeOutcome::Failed(ProbeError::Wait(e)),
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        return ProbeOutcome::Failed(ProbeError::NonZeroExit {
            code: output.status.code(),
        });
    }

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    let outcome = ProbeOutcome::from_output(&text);
    debug!(?outcome, "probe finished");
    outcome
}
