// src/magic/mod.rs

//! Notebook-cell surface.
//!
//! - [`cell`] splits `%%name args\nbody` text.
//! - [`args`] turns the annotation line into a [`RunConfiguration`].
//! - [`registry`] holds explicitly registered [`CellMagic`] handlers and
//!   dispatches cells to them.

pub mod args;
pub mod cell;
pub mod registry;

pub use args::RunConfiguration;
pub use cell::{ParsedCell, split_cell};
pub use registry::{CellMagic, CellMagicRegistry};
