// src/config/mod.rs

//! Configuration loading and validation for dedalus-cell.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate paths, launcher names, env names and durations (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, LauncherSection, RawConfigFile, RuntimeSection};
pub use validate::{parse_duration, validate_config};
