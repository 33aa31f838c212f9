#![allow(dead_code, unused_imports)]

pub use dedalus_cell_test_utils::builders::ConfigFileBuilder;
#[cfg(unix)]
pub use dedalus_cell_test_utils::fake_micromamba::FakeMicromamba;
pub use dedalus_cell_test_utils::{init_tracing, with_timeout};

use std::path::Path;

/// Number of entries in `dir`.
pub fn entries_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
