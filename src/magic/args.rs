// src/magic/args.rs

//! Flags accepted on the `%%dedalus` annotation line.

use crate::errors::{CellError, Result};

/// Options parsed from the annotation line.
///
/// `rank_count` is always >= 1; a configuration that would violate this is
/// never constructed, so nothing downstream has to re-check it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfiguration {
    rank_count: u32,
    pub info_mode: bool,
    pub time_mode: bool,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            rank_count: 1,
            info_mode: false,
            time_mode: false,
        }
    }
}

impl RunConfiguration {
    /// Build a configuration directly, rejecting a zero rank count.
    pub fn new(rank_count: u32, info_mode: bool, time_mode: bool) -> Result<Self> {
        if rank_count == 0 {
            return Err(CellError::InvalidRankCount {
                found: Some("0".to_string()),
            });
        }
        Ok(Self {
            rank_count,
            info_mode,
            time_mode,
        })
    }

    /// Parse the argument part of an annotation line, e.g. `-np 4 --time`.
    ///
    /// `--info` and `--time` may appear anywhere. `-np` must be followed by
    /// a positive integer; it defaults to 1 when absent. Other tokens are
    /// ignored.
    pub fn parse(line: &str) -> Result<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        let info_mode = tokens.contains(&"--info");
        let time_mode = tokens.contains(&"--time");

        let rank_count = match tokens.iter().position(|t| *t == "-np") {
            None => 1,
            Some(idx) => {
                let value = tokens.get(idx + 1).copied();
                match value.map(str::parse::<u32>) {
                    Some(Ok(n)) if n >= 1 => n,
                    _ => {
                        return Err(CellError::InvalidRankCount {
                            found: value.map(str::to_string),
                        });
                    }
                }
            }
        };

        Ok(Self {
            rank_count,
            info_mode,
            time_mode,
        })
    }

    pub fn rank_count(&self) -> u32 {
        self.rank_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_line_defaults_to_one_rank() {
        let run = RunConfiguration::parse("").unwrap();
        assert_eq!(run, RunConfiguration::default());
    }

    #[test]
    fn flags_are_order_independent() {
        let run = RunConfiguration::parse("--time -np 8 --info").unwrap();
        assert_eq!(run.rank_count(), 8);
        assert!(run.time_mode);
        assert!(run.info_mode);
    }

    #[test]
    fn missing_rank_value_is_rejected() {
        let err = RunConfiguration::parse("--time -np").unwrap_err();
        assert!(matches!(err, CellError::InvalidRankCount { found: None }));
        assert!(err.to_string().contains("requires an integer argument"));
    }

    #[test]
    fn non_integer_and_non_positive_ranks_are_rejected() {
        for bad in ["four", "2.5", "0", "-3", "--time"] {
            let line = format!("-np {bad}");
            match RunConfiguration::parse(&line) {
                Err(CellError::InvalidRankCount { found }) => {
                    assert_eq!(found.as_deref(), Some(bad));
                }
                other => panic!("expected InvalidRankCount for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        let run = RunConfiguration::parse("--verbose -np 2").unwrap();
        assert_eq!(run.rank_count(), 2);
        assert!(!run.info_mode);
    }

    #[test]
    fn new_rejects_zero_ranks() {
        assert!(RunConfiguration::new(0, false, false).is_err());
        assert_eq!(RunConfiguration::new(3, false, true).unwrap().rank_count(), 3);
    }
}
