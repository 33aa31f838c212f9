// src/exec/streamer.rs

//! Running a launch command and relaying its output as it arrives.

use std::io;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{CellError, Result};
use crate::exec::OutputSink;
use crate::exec::command::CommandLine;
use crate::exec::environment::ProcessEnvironment;
use crate::exec::script::MaterializedScript;

/// Lifecycle of one streamed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    NotStarted,
    /// Child spawned, readers not attached yet.
    Running,
    /// Lines are being relayed.
    Streaming,
    /// Child exited (or never started) and the script is gone.
    Terminated,
}

/// What happened, for logging. The exit code is not interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamReport {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub lines: usize,
}

/// Spawns one command, forwards its combined stdout/stderr line by line in
/// the order the child wrote it, and removes the script afterwards.
#[derive(Debug)]
pub struct ExecutionStreamer {
    state: StreamState,
}

impl Default for ExecutionStreamer {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionStreamer {
    pub fn new() -> Self {
        Self {
            state: StreamState::NotStarted,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    fn transition(&mut self, next: StreamState) {
        debug!(from = ?self.state, to = ?next, "stream state");
        self.state = next;
    }

    /// Run `command`, writing each output line to `sink` as soon as it is
    /// read, then wait for the child.
    ///
    /// `script` is removed on every path out of this function. If the
    /// returned future is dropped early, the child is killed and the script
    /// is removed when its handle drops.
    pub async fn run(
        &mut self,
        command: &CommandLine,
        env: &ProcessEnvironment,
        script: MaterializedScript,
        sink: &mut OutputSink,
    ) -> Result<StreamReport> {
        let result = self.relay(command, env, sink).await;
        script.remove();
        self.transition(StreamState::Terminated);
        result
    }

    async fn relay(
        &mut self,
        command: &CommandLine,
        env: &ProcessEnvironment,
        sink: &mut OutputSink,
    ) -> Result<StreamReport> {
        info!(cmd = %command, "starting launch command");

        // stdout and stderr share one pipe so the child's write order is kept.
        let (reader, writer) = io::pipe()?;
        let mut cmd = command.to_command(env);
        cmd.stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer)
            .kill_on_drop(true);

        let spawned = cmd.spawn();
        // The command holds the parent's write ends; EOF needs them closed.
        drop(cmd);
        let mut child = spawned.map_err(|source| CellError::Launch {
            program: command.program.clone(),
            source,
        })?;
        self.transition(StreamState::Running);

        let (tx, mut rx) = mpsc::channel::<String>(256);
        spawn_line_reader(reader, tx)?;
        self.transition(StreamState::Streaming);

        let mut lines = 0usize;
        while let Some(line) = rx.recv().await {
            sink.write_all(line.as_bytes()).await?;
            sink.write_all(b"\n").await?;
            sink.flush().await?;
            lines += 1;
        }

        let status = child.wait().await?;
        let report = StreamReport {
            exit_code: status.code(),
            success: status.success(),
            lines,
        };

        if report.success {
            info!(exit_code = ?report.exit_code, lines, "launch command exited");
        } else {
            warn!(exit_code = ?report.exit_code, lines, "launch command exited unsuccessfully");
        }
        Ok(report)
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8.
fn finish_line(buf: &mut Vec<u8>) -> String {
    while matches!(buf.last(), Some(&(b'\n' | b'\r'))) {
        buf.pop();
    }
    String::from_utf8_lossy(buf).into_owned()
}

/// Forward lines from the merged output pipe into `tx` until EOF.
///
/// A final line without a trailing newline is still forwarded.
#[cfg(unix)]
fn spawn_line_reader(reader: io::PipeReader, tx: mpsc::Sender<String>) -> Result<()> {
    use std::os::fd::OwnedFd;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::unix::pipe;

    let receiver = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
    tokio::spawn(async move {
        let mut reader = BufReader::new(receiver);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(finish_line(&mut buf)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "output reader stopped");
                    break;
                }
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_line_reader(reader: io::PipeReader, tx: mpsc::Sender<String>) -> Result<()> {
    use std::io::BufRead;

    tokio::task::spawn_blocking(move || {
        let mut reader = io::BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.blocking_send(finish_line(&mut buf)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "output reader stopped");
                    break;
                }
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_terminators_are_stripped() {
        let mut crlf = b"progress 50%\r\n".to_vec();
        assert_eq!(finish_line(&mut crlf), "progress 50%");

        let mut bare = b"tail".to_vec();
        assert_eq!(finish_line(&mut bare), "tail");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut bytes = vec![b'o', b'k', 0xff, b'\n'];
        assert_eq!(finish_line(&mut bytes), "ok\u{fffd}");
    }
}
