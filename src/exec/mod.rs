// src/exec/mod.rs

//! Process execution layer.
//!
//! Everything that touches child processes or the script file lives here.
//! All children are spawned with `tokio::process::Command`.
//!
//! - [`environment`] builds the immutable child environment.
//! - [`command`] builds the probe and launch argument vectors.
//! - [`probe`] detects the MPI implementation with a bounded version query.
//! - [`script`] wraps cell code and writes it to a temp file.
//! - [`streamer`] runs the launch command and relays its output line by line.

pub mod command;
pub mod environment;
pub mod probe;
pub mod script;
pub mod streamer;

use tokio::io::AsyncWrite;

/// Where user-visible output goes (stdout in the binary, a buffer in tests).
pub type OutputSink = dyn AsyncWrite + Unpin + Send;

pub use command::{CommandBuilder, CommandLine};
pub use environment::ProcessEnvironment;
pub use probe::{ProbeError, ProbeOutcome, probe};
pub use script::{MaterializedScript, render_wrapped};
pub use streamer::{ExecutionStreamer, StreamReport, StreamState};
