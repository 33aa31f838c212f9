// tests/streaming.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout};

use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncWrite, BufReader};

use dedalus_cell::errors::CellError;
use dedalus_cell::exec::{
    CommandLine, ExecutionStreamer, MaterializedScript, ProcessEnvironment, StreamState,
};

fn env() -> ProcessEnvironment {
    ProcessEnvironment::from_ambient(&BTreeMap::new())
}

fn sh(script: &str) -> CommandLine {
    CommandLine::new("sh", ["-c", script])
}

#[tokio::test]
async fn relays_stdout_and_stderr_and_removes_script() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let script = MaterializedScript::write("print('x')\n", Some(dir.path())).unwrap();
    let path = script.path().to_path_buf();

    let cmd = sh("echo out-1; echo err-1 >&2; echo out-2; printf 'no-newline'");
    let mut out: Vec<u8> = Vec::new();
    let mut streamer = ExecutionStreamer::new();
    assert_eq!(streamer.state(), StreamState::NotStarted);

    let report = with_timeout(streamer.run(&cmd, &env(), script, &mut out))
        .await
        .unwrap();

    assert_eq!(streamer.state(), StreamState::Terminated);
    assert!(report.success);
    assert_eq!(report.lines, 4);
    assert!(!path.exists(), "script should be removed after the run");

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["out-1", "err-1", "out-2", "no-newline"]);
}

#[tokio::test]
async fn interleaved_streams_keep_write_order() {
    init_tracing();
    let cmd = sh("echo A; echo B >&2; echo C; echo D >&2; echo E");

    for _ in 0..20 {
        let script = MaterializedScript::write("", None).unwrap();
        let mut out: Vec<u8> = Vec::new();
        with_timeout(ExecutionStreamer::new().run(&cmd, &env(), script, &mut out))
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "A\nB\nC\nD\nE\n");
    }
}

#[tokio::test]
async fn stdout_order_is_preserved() {
    init_tracing();
    let script = MaterializedScript::write("", None).unwrap();
    let cmd = sh("for i in 1 2 3 4 5; do echo line-$i; done");
    let mut out: Vec<u8> = Vec::new();

    with_timeout(ExecutionStreamer::new().run(&cmd, &env(), script, &mut out))
        .await
        .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "line-1\nline-2\nline-3\nline-4\nline-5\n"
    );
}

#[tokio::test]
async fn child_sees_fixed_overrides() {
    init_tracing();
    let script = MaterializedScript::write("", None).unwrap();
    let cmd = sh("echo $OMP_NUM_THREADS $NUMEXPR_MAX_THREADS $OMPI_ALLOW_RUN_AS_ROOT");
    let mut out: Vec<u8> = Vec::new();

    with_timeout(ExecutionStreamer::new().run(&cmd, &env(), script, &mut out))
        .await
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "1 1 1\n");
}

#[tokio::test]
async fn non_zero_exit_is_reported_not_raised() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let script = MaterializedScript::write("", Some(dir.path())).unwrap();
    let path = script.path().to_path_buf();
    let mut out: Vec<u8> = Vec::new();

    let report = with_timeout(ExecutionStreamer::new().run(
        &sh("echo failing; exit 7"),
        &env(),
        script,
        &mut out,
    ))
    .await
    .unwrap();

    assert!(!report.success);
    assert_eq!(report.exit_code, Some(7));
    assert!(!path.exists());
}

#[tokio::test]
async fn launch_failure_still_removes_script() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let script = MaterializedScript::write("", Some(dir.path())).unwrap();
    let path = script.path().to_path_buf();
    let mut out: Vec<u8> = Vec::new();

    let mut streamer = ExecutionStreamer::new();
    let err = with_timeout(streamer.run(
        &CommandLine::new("/nonexistent/launcher", Vec::<String>::new()),
        &env(),
        script,
        &mut out,
    ))
    .await
    .unwrap_err();

    assert!(matches!(err, CellError::Launch { .. }), "{err:?}");
    assert_eq!(streamer.state(), StreamState::Terminated);
    assert!(!path.exists());
    assert!(out.is_empty());
}

/// Sink that rejects every write.
struct ClosedSink;

impl AsyncWrite for ClosedSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn sink_write_error_is_returned_and_script_removed() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let script = MaterializedScript::write("", Some(dir.path())).unwrap();
    let path = script.path().to_path_buf();

    let cmd = sh("echo hello; exec sleep 30");
    let mut sink = ClosedSink;
    let mut streamer = ExecutionStreamer::new();
    let err = with_timeout(streamer.run(&cmd, &env(), script, &mut sink))
        .await
        .unwrap_err();

    assert!(
        matches!(&err, CellError::IoError(e) if e.kind() == io::ErrorKind::BrokenPipe),
        "{err:?}"
    );
    assert_eq!(streamer.state(), StreamState::Terminated);
    assert!(!path.exists());
}

#[tokio::test]
async fn cancelled_run_removes_script() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let script = MaterializedScript::write("", Some(dir.path())).unwrap();
    let path = script.path().to_path_buf();
    let mut out: Vec<u8> = Vec::new();

    let cmd = sh("echo started; sleep 30");
    let env = env();
    let mut streamer = ExecutionStreamer::new();
    let run = streamer.run(&cmd, &env, script, &mut out);
    let timed_out = tokio::time::timeout(Duration::from_millis(300), run).await;

    assert!(timed_out.is_err(), "run should still be going");
    assert!(!path.exists(), "dropping the run must remove the script");
}

/// Lines must reach the sink while the child is still running.
#[tokio::test]
async fn output_is_forwarded_before_exit() {
    init_tracing();
    let script = MaterializedScript::write("", None).unwrap();
    let cmd = sh("echo first; sleep 1; echo second");

    let (mut writer, reader) = tokio::io::duplex(1024);
    let watcher = tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut seen = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            seen.push((line, Instant::now()));
        }
        seen
    });

    with_timeout(ExecutionStreamer::new().run(&cmd, &env(), script, &mut writer))
        .await
        .unwrap();
    let finished = Instant::now();
    drop(writer);

    let seen = watcher.await.unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "first");
    assert!(
        finished.duration_since(seen[0].1) >= Duration::from_millis(500),
        "first line arrived only at exit"
    );
}
