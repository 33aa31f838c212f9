// src/exec/script.rs

//! Turning cell code into a runnable MPI script on disk.
//!
//! Rendering ([`render_wrapped`]) is a pure text transformation; writing it
//! out ([`MaterializedScript::write`]) gives back a handle that owns the temp
//! file and deletes it when removed or dropped.

use std::io::Write;
use std::path::Path;

use tempfile::TempPath;
use tracing::{debug, warn};

use crate::errors::Result;

const INDENT: &str = "    ";

/// Prelude for `--time`: one barrier, then start the clock.
const TIMED_PRELUDE: &str = r#"from mpi4py import MPI
import time

_comm = MPI.COMM_WORLD
_rank = _comm.rank
_size = _comm.size

# synchronize before timing
_comm.Barrier()
_t0 = time.perf_counter()

"#;

const TIMED_HANDLER: &str = r#"except Exception:
    import traceback
    traceback.print_exc()
    _comm.Abort(1)
"#;

/// Epilogue for `--time`: one barrier, then report from rank 0 only.
const TIMED_EPILOGUE: &str = r#"
# synchronize after user code
_comm.Barrier()
_t1 = time.perf_counter()

if _rank == 0:
    print(f"⏱ Elapsed time: {_t1 - _t0:.6f} s")
"#;

const PLAIN_HANDLER: &str = r#"except Exception:
    import traceback
    from mpi4py import MPI
    traceback.print_exc()
    MPI.COMM_WORLD.Abort(1)
"#;

/// Diagnostic script used by `--info`; only rank 0 prints.
pub const INFO_SCRIPT: &str = r#"import dedalus.public as d3
from mpi4py import MPI
import sys, platform, os

comm = MPI.COMM_WORLD
if comm.rank == 0:
    print()
    print("🐍 Python          :", sys.version.split()[0])
    print("🌊 Dedalus         :", d3.__version__)
    print("💻 Platform        :", platform.platform())
    print("🧵 Running as root :", os.geteuid() == 0)
    print("⚡ MPI Size        :", comm.Get_size())
"#;

/// Remove the whitespace prefix shared by every non-blank line.
///
/// Whitespace-only lines become empty and don't take part in the margin.
/// Tabs and spaces are compared literally, so mixed indentation keeps
/// whatever isn't common.
pub fn dedent(code: &str) -> String {
    let margin = code
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(leading_whitespace)
        .reduce(common_prefix)
        .unwrap_or("");

    let mut out = String::with_capacity(code.len());
    for line in code.lines() {
        if !line.trim().is_empty() {
            out.push_str(&line[margin.len()..]);
        }
        out.push('\n');
    }
    out
}

fn leading_whitespace(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, c)| *c != ' ' && *c != '\t')
        .map_or(line.len(), |(i, _)| i);
    &line[..end]
}

fn common_prefix<'a>(a: &'a str, b: &'a str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}

/// Prefix every non-blank line with `prefix`.
pub fn indent(code: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(code.len() + prefix.len() * 8);
    for line in code.lines() {
        if !line.trim().is_empty() {
            out.push_str(prefix);
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Wrap `user_code` so a failure on any rank aborts all ranks.
///
/// With `time_mode`, a barrier is placed before and after the block and the
/// elapsed wall-clock time is printed by rank 0 only.
pub fn render_wrapped(user_code: &str, time_mode: bool) -> String {
    let mut body = indent(&dedent(user_code), INDENT);
    if body.trim().is_empty() {
        body = format!("{INDENT}pass\n");
    }

    let mut script = String::new();
    if time_mode {
        script.push_str(TIMED_PRELUDE);
    }
    script.push_str("try:\n");
    script.push_str(&body);
    if time_mode {
        script.push_str(TIMED_HANDLER);
        script.push_str(TIMED_EPILOGUE);
    } else {
        script.push_str(PLAIN_HANDLER);
    }
    script
}

/// A rendered script on disk, owned by exactly one invocation.
#[derive(Debug)]
pub struct MaterializedScript {
    path: TempPath,
}

impl MaterializedScript {
    /// Write `text` to a fresh `dedalus_*.py` file in `dir`, or in the OS
    /// temp dir when `dir` is `None`.
    pub fn write(text: &str, dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("dedalus_").suffix(".py");

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(text.as_bytes())?;
        file.flush()?;

        let path = file.into_temp_path();
        debug!(script = %path.display(), bytes = text.len(), "materialized script");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now. A failure is logged, never returned.
    pub fn remove(self) {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => debug!(script = %shown, "removed script"),
            Err(e) => warn!(script = %shown, error = %e, "failed to remove script"),
        }
    }
}
