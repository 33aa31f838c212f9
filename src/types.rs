use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// The MPI flavour installed in the micromamba environment.
///
/// - `OpenMpi`: launched through `mpirun`.
/// - `Mpich`: launched through `mpiexec`. This is also what we assume when the
///   probe cannot tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MpiImplementation {
    OpenMpi,
    Mpich,
}

impl Default for MpiImplementation {
    fn default() -> Self {
        MpiImplementation::Mpich
    }
}

impl fmt::Display for MpiImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MpiImplementation::OpenMpi => f.write_str("openmpi"),
            MpiImplementation::Mpich => f.write_str("mpich"),
        }
    }
}

/// How the session chooses the MPI implementation.
///
/// `Auto` classifies the probe output; the other two pin the answer and only
/// use the probe for its version banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MpiSelection {
    Auto,
    OpenMpi,
    Mpich,
}

impl Default for MpiSelection {
    fn default() -> Self {
        MpiSelection::Auto
    }
}

impl MpiSelection {
    /// The pinned implementation, if any.
    pub fn pinned(self) -> Option<MpiImplementation> {
        match self {
            MpiSelection::Auto => None,
            MpiSelection::OpenMpi => Some(MpiImplementation::OpenMpi),
            MpiSelection::Mpich => Some(MpiImplementation::Mpich),
        }
    }
}

impl FromStr for MpiSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(MpiSelection::Auto),
            "openmpi" | "open-mpi" => Ok(MpiSelection::OpenMpi),
            "mpich" => Ok(MpiSelection::Mpich),
            other => Err(format!(
                "invalid mpi_implementation: {other} (expected \"auto\", \"openmpi\" or \"mpich\")"
            )),
        }
    }
}
