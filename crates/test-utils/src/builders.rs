#![allow(dead_code)]

use std::path::Path;

use dedalus_cell::config::{ConfigFile, RawConfigFile};
use dedalus_cell::types::MpiSelection;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn micromamba(mut self, path: impl AsRef<Path>) -> Self {
        self.config.runtime.micromamba = path.as_ref().to_string_lossy().into_owned();
        self
    }

    pub fn env_name(mut self, name: &str) -> Self {
        self.config.runtime.env_name = name.to_string();
        self
    }

    pub fn probe_timeout(mut self, timeout: &str) -> Self {
        self.config.runtime.probe_timeout = timeout.to_string();
        self
    }

    pub fn mpi_implementation(mut self, selection: MpiSelection) -> Self {
        self.config.runtime.mpi_implementation = selection;
        self
    }

    pub fn script_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.runtime.script_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn launchers(mut self, openmpi: &str, mpich: &str) -> Self {
        self.config.launcher.openmpi = openmpi.to_string();
        self.config.launcher.mpich = mpich.to_string();
        self
    }

    pub fn env_var(mut self, key: &str, value: &str) -> Self {
        self.config.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
