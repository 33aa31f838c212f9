// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CellError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CellError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let probe_timeout = validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw, probe_timeout))
    }
}

/// Check a raw config without converting it.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg).map(|_| ())
}

/// Run every check and return the parsed probe timeout.
fn validate_raw_config(cfg: &RawConfigFile) -> Result<Duration> {
    validate_runtime(cfg)?;
    validate_launchers(cfg)?;
    validate_env(cfg)?;
    validate_probe_timeout(&cfg.runtime.probe_timeout)
}

fn validate_runtime(cfg: &RawConfigFile) -> Result<()> {
    let rt = &cfg.runtime;
    if rt.micromamba.trim().is_empty() {
        return Err(CellError::ConfigError(
            "[runtime].micromamba must not be empty".to_string(),
        ));
    }
    if rt.env_name.trim().is_empty() {
        return Err(CellError::ConfigError(
            "[runtime].env_name must not be empty".to_string(),
        ));
    }
    if rt.python.trim().is_empty() {
        return Err(CellError::ConfigError(
            "[runtime].python must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_launchers(cfg: &RawConfigFile) -> Result<()> {
    for (key, value) in [
        ("openmpi", &cfg.launcher.openmpi),
        ("mpich", &cfg.launcher.mpich),
    ] {
        if value.trim().is_empty() {
            return Err(CellError::ConfigError(format!(
                "[launcher].{key} must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_env(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.env.keys() {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return Err(CellError::ConfigError(format!(
                "[env] has invalid variable name '{name}'"
            )));
        }
    }
    Ok(())
}

fn validate_probe_timeout(raw: &str) -> Result<Duration> {
    let timeout = parse_duration(raw).map_err(|e| {
        CellError::ConfigError(format!("[runtime].probe_timeout: {e}"))
    })?;
    if timeout.is_zero() {
        return Err(CellError::ConfigError(
            "[runtime].probe_timeout must be greater than zero".to_string(),
        ));
    }
    Ok(timeout)
}

/// Parse a duration like `"500ms"`, `"5s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
