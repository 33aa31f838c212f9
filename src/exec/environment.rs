// src/exec/environment.rs

//! Environment handed to every child process.

use std::collections::BTreeMap;

use tokio::process::Command;

/// Variables forced on every child, after the ambient environment.
///
/// The Open MPI pair allows `mpirun` as root (notebook containers usually run
/// as root); the thread limits keep each rank single-threaded so ranks don't
/// oversubscribe the cores.
pub const FIXED_OVERRIDES: [(&str, &str); 4] = [
    ("OMPI_ALLOW_RUN_AS_ROOT", "1"),
    ("OMPI_ALLOW_RUN_AS_ROOT_CONFIRM", "1"),
    ("OMP_NUM_THREADS", "1"),
    ("NUMEXPR_MAX_THREADS", "1"),
];

/// Immutable snapshot of the child environment for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEnvironment {
    vars: BTreeMap<String, String>,
}

impl ProcessEnvironment {
    /// Current process environment + fixed overrides + `extra`.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_ambient(extra: &BTreeMap<String, String>) -> Self {
        let ambient = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::from_vars(ambient, extra)
    }

    /// Same layering as [`from_ambient`](Self::from_ambient), over an
    /// explicit base.
    pub fn from_vars<I>(base: I, extra: &BTreeMap<String, String>) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars: BTreeMap<String, String> = base.into_iter().collect();
        for (key, value) in FIXED_OVERRIDES {
            vars.insert(key.to_string(), value.to_string());
        }
        for (key, value) in extra {
            vars.insert(key.clone(), value.clone());
        }
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Replace `cmd`'s environment with exactly this one.
    pub(crate) fn apply(&self, cmd: &mut Command) {
        cmd.env_clear();
        cmd.envs(&self.vars);
    }
}
