// tests/probe_process.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout, FakeMicromamba};

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use dedalus_cell::exec::probe::{probe, ProbeError, ProbeOutcome, UNKNOWN_VERSION};
use dedalus_cell::exec::{CommandLine, ProcessEnvironment};
use dedalus_cell::types::MpiImplementation;

fn env() -> ProcessEnvironment {
    ProcessEnvironment::from_ambient(&BTreeMap::new())
}

fn probe_cmd(micromamba: &std::path::Path) -> CommandLine {
    CommandLine::new(
        micromamba.to_string_lossy(),
        ["run", "-n", "dedalus", "mpiexec", "--version"],
    )
}

#[tokio::test]
async fn open_mpi_environment_is_detected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mm = FakeMicromamba::new()
        .banner("mpirun (Open MPI) 5.0.3")
        .install(dir.path());

    let outcome = with_timeout(probe(&probe_cmd(&mm), &env(), Duration::from_secs(5))).await;

    assert!(matches!(outcome, ProbeOutcome::Detected { .. }), "{outcome:?}");
    assert_eq!(outcome.implementation_or_default(), MpiImplementation::OpenMpi);
    assert_eq!(outcome.version_or_unknown(), "mpirun (Open MPI) 5.0.3");
}

#[tokio::test]
async fn mpich_environment_is_not_detected_but_keeps_banner() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mm = FakeMicromamba::new()
        .banner("HYDRA build details:")
        .install(dir.path());

    let outcome = with_timeout(probe(&probe_cmd(&mm), &env(), Duration::from_secs(5))).await;

    assert!(matches!(outcome, ProbeOutcome::NotDetected { .. }), "{outcome:?}");
    assert_eq!(outcome.implementation_or_default(), MpiImplementation::Mpich);
    assert_eq!(outcome.version_or_unknown(), "HYDRA build details:");
}

#[tokio::test]
async fn non_zero_exit_is_a_probe_failure() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mm = FakeMicromamba::new()
        .banner("mpirun (Open MPI) 5.0.3")
        .probe_exit(3)
        .install(dir.path());

    let outcome = with_timeout(probe(&probe_cmd(&mm), &env(), Duration::from_secs(5))).await;

    assert!(matches!(
        outcome,
        ProbeOutcome::Failed(ProbeError::NonZeroExit { code: Some(3) })
    ));
    assert_eq!(outcome.implementation_or_default(), MpiImplementation::Mpich);
    assert_eq!(outcome.version_or_unknown(), UNKNOWN_VERSION);
}

#[tokio::test]
async fn hanging_probe_times_out_quickly() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mm = FakeMicromamba::new().probe_sleep_secs(30).install(dir.path());

    let started = Instant::now();
    let outcome =
        with_timeout(probe(&probe_cmd(&mm), &env(), Duration::from_millis(200))).await;

    assert!(matches!(outcome, ProbeOutcome::Failed(ProbeError::Timeout(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.implementation_or_default(), MpiImplementation::Mpich);
}

#[tokio::test]
async fn missing_binary_is_a_spawn_failure() {
    init_tracing();
    let cmd = probe_cmd(std::path::Path::new("/nonexistent/bin/micromamba"));

    let outcome = with_timeout(probe(&cmd, &env(), Duration::from_secs(5))).await;

    match outcome {
        ProbeOutcome::Failed(ProbeError::Spawn { program, .. }) => {
            assert_eq!(program, "/nonexistent/bin/micromamba");
        }
        other => panic!("expected spawn failure, got {other:?}"),
    }
}
