// src/magic/cell.rs

//! Splitting raw cell text into annotation and body.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{CellError, Result};

static ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^%%([A-Za-z_][A-Za-z0-9_]*)(?:[ \t]+(.*))?$")
        .expect("annotation regex is valid")
});

/// A cell split into its parts. Borrows from the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCell<'a> {
    /// Magic name without the `%%` prefix, e.g. `dedalus`.
    pub magic: &'a str,
    /// Everything after the name on the annotation line.
    pub line: &'a str,
    /// Code after the first newline (may be empty).
    pub body: &'a str,
}

/// Split `text` into `%%<magic> <line>` and the body that follows it.
pub fn split_cell(text: &str) -> Result<ParsedCell<'_>> {
    let (first, body) = match text.find('\n') {
        Some(idx) => (&text[..idx], &text[idx + 1..]),
        None => (text, ""),
    };
    let first = first.trim_end_matches('\r').trim_end();

    let caps = ANNOTATION.captures(first).ok_or_else(|| {
        CellError::MalformedCell(format!(
            "first line must look like `%%<magic> [args]`, got {first:?}"
        ))
    })?;

    let magic = caps.get(1).map_or("", |m| m.as_str());
    let line = caps.get(2).map_or("", |m| m.as_str());

    Ok(ParsedCell { magic, line, body })
}
