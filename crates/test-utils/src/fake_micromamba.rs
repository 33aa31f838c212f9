//! A shell-script stand-in for `micromamba` (unix only).
//!
//! It understands the two shapes the crate produces:
//! - `run -n <env> mpiexec --version` → prints the configured banner.
//! - `run -n <env> <launcher> -n <ranks> <python> <script>` → prints what it
//!   was asked to do, a line on stderr, then the script itself.

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FakeMicromamba {
    banner: String,
    probe_exit: i32,
    probe_sleep_secs: u32,
    launch_exit: i32,
    launch_snippet: Option<String>,
    call_log: Option<PathBuf>,
}

impl Default for FakeMicromamba {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMicromamba {
    pub fn new() -> Self {
        Self {
            banner: "mpirun (Open MPI) 4.1.6".to_string(),
            probe_exit: 0,
            probe_sleep_secs: 0,
            launch_exit: 0,
            launch_snippet: None,
            call_log: None,
        }
    }

    /// First line printed by `mpiexec --version`. Must not contain `'`.
    pub fn banner(mut self, banner: &str) -> Self {
        assert!(!banner.contains('\''), "banner must not contain single quotes");
        self.banner = banner.to_string();
        self
    }

    pub fn probe_exit(mut self, code: i32) -> Self {
        self.probe_exit = code;
        self
    }

    /// Make the version query hang for `secs` before answering.
    pub fn probe_sleep_secs(mut self, secs: u32) -> Self {
        self.probe_sleep_secs = secs;
        self
    }

    pub fn launch_exit(mut self, code: i32) -> Self {
        self.launch_exit = code;
        self
    }

    /// Replace the default launch behaviour with a custom shell snippet.
    /// `$launcher`, `$ranks`, `$python` and `$script` are set.
    pub fn launch_snippet(mut self, snippet: &str) -> Self {
        self.launch_snippet = Some(snippet.to_string());
        self
    }

    /// Append the arguments of every invocation to `path`, one per line.
    pub fn call_log(mut self, path: &Path) -> Self {
        self.call_log = Some(path.to_path_buf());
        self
    }

    fn render(&self) -> String {
        let log = match &self.call_log {
            Some(path) => format!(r#"echo "$*" >> '{}'"#, path.display()),
            None => ":".to_string(),
        };
        let launch = self.launch_snippet.clone().unwrap_or_else(|| {
            [
                r#"echo "launcher=$launcher ranks=$ranks python=$python env=$env_name""#,
                r#"echo "script=$script""#,
                r#"echo "omp=$OMP_NUM_THREADS root=$OMPI_ALLOW_RUN_AS_ROOT""#,
                r#"echo "from-stderr" >&2"#,
                r#"cat "$script""#,
            ]
            .join("\n")
        });

        format!(
            r#"#!/bin/sh
{log}
if [ "$1" != "run" ] || [ "$2" != "-n" ]; then
    echo "fake micromamba: unexpected arguments: $*" >&2
    exit 64
fi
env_name="$3"
shift 3
launcher="$1"
shift
if [ "$1" = "--version" ]; then
    if [ {sleep} -gt 0 ]; then sleep {sleep}; fi
    printf '%s\n' '{banner}'
    exit {probe_exit}
fi
ranks="$2"
python="$3"
script="$4"
{launch}
exit {launch_exit}
"#,
            log = log,
            sleep = self.probe_sleep_secs,
            banner = self.banner,
            probe_exit = self.probe_exit,
            launch = launch,
            launch_exit = self.launch_exit,
        )
    }

    /// Write the fake as `<dir>/micromamba`, mark it executable and return
    /// its path.
    pub fn install(&self, dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("micromamba");
        fs::write(&path, self.render()).expect("writing fake micromamba");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("making fake micromamba executable");
        path
    }
}
