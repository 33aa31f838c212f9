// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{MpiImplementation, MpiSelection};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [runtime]
/// micromamba = "/content/micromamba/bin/micromamba"
/// env_name = "dedalus"
/// probe_timeout = "5s"
/// mpi_implementation = "auto"
///
/// [launcher]
/// openmpi = "mpirun"
/// mpich = "mpiexec"
///
/// [env]
/// OMPI_MCA_btl = "^openib"
/// ```
///
/// All sections are optional and have reasonable defaults. This is the
/// unvalidated form; use `ConfigFile::try_from` to get a checked config.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Where micromamba lives and how to reach the Dedalus environment.
    #[serde(default)]
    pub runtime: RuntimeSection,

    /// Launcher binary per MPI implementation.
    #[serde(default)]
    pub launcher: LauncherSection,

    /// Extra variables for the child process, applied after the fixed
    /// MPI/threading overrides.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[runtime]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// Path of the micromamba binary used as the environment manager.
    #[serde(default = "default_micromamba")]
    pub micromamba: String,

    /// Name of the micromamba environment holding Dedalus + MPI.
    #[serde(default = "default_env_name")]
    pub env_name: String,

    /// Interpreter invoked by the MPI launcher on every rank.
    #[serde(default = "default_python")]
    pub python: String,

    /// Upper bound for the `mpiexec --version` probe, e.g. `"5s"`.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: String,

    /// `"auto"` (probe), `"openmpi"` or `"mpich"`.
    #[serde(default)]
    pub mpi_implementation: MpiSelection,

    /// Directory for materialized scripts; the OS temp dir when unset.
    #[serde(default)]
    pub script_dir: Option<PathBuf>,
}

fn default_micromamba() -> String {
    "/content/micromamba/bin/micromamba".to_string()
}

fn default_env_name() -> String {
    "dedalus".to_string()
}

fn default_python() -> String {
    "python".to_string()
}

fn default_probe_timeout() -> String {
    "5s".to_string()
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            micromamba: default_micromamba(),
            env_name: default_env_name(),
            python: default_python(),
            probe_timeout: default_probe_timeout(),
            mpi_implementation: MpiSelection::default(),
            script_dir: None,
        }
    }
}

/// `[launcher]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LauncherSection {
    #[serde(default = "default_openmpi_launcher")]
    pub openmpi: String,

    #[serde(default = "default_mpich_launcher")]
    pub mpich: String,
}

fn default_openmpi_launcher() -> String {
    "mpirun".to_string()
}

fn default_mpich_launcher() -> String {
    "mpiexec".to_string()
}

impl Default for LauncherSection {
    fn default() -> Self {
        Self {
            openmpi: default_openmpi_launcher(),
            mpich: default_mpich_launcher(),
        }
    }
}

impl LauncherSection {
    /// Launcher binary for the given implementation.
    pub fn for_implementation(&self, implementation: MpiImplementation) -> &str {
        match implementation {
            MpiImplementation::OpenMpi => &self.openmpi,
            MpiImplementation::Mpich => &self.mpich,
        }
    }
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// `ConfigFile::default()`, so `probe_timeout` is always a usable duration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runtime: RuntimeSection,
    pub launcher: LauncherSection,
    pub env: BTreeMap<String, String>,
    pub probe_timeout: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, probe_timeout: Duration) -> Self {
        Self {
            runtime: raw.runtime,
            launcher: raw.launcher,
            env: raw.env,
            probe_timeout,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default(), Duration::from_secs(5))
    }
}
