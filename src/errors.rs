// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CellError {
    #[error(
        "-np option requires an integer argument >= 1 (got {})",
        .found.as_deref().unwrap_or("nothing")
    )]
    InvalidRankCount { found: Option<String> },

    #[error("Malformed cell: {0}")]
    MalformedCell(String),

    #[error("Unknown cell magic: %%{0}")]
    UnknownMagic(String),

    #[error("Cell magic already registered: %%{0}")]
    DuplicateMagic(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("interrupted before the cell finished")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CellError>;
